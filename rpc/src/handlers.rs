//! HTTP handlers and their request/response bodies.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use votegate_chain::Receipt;
use votegate_sessions::{option_id, HistoryEntry, SessionDraft, UserProfile, VoteReceipt, VoteRequest, VoteSession};
use votegate_types::{Identity, SessionId, Timestamp};

use crate::error::ApiError;
use crate::service::{ChainOutcome, VotingService};

pub type AppState = Arc<VotingService>;

// ── Sessions ─────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub include_private: Option<bool>,
    /// `type=all` is an alias for `include_private=true`.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl ListQuery {
    fn include_private(&self) -> bool {
        self.include_private.unwrap_or(false)
            || self.kind.as_deref().is_some_and(|k| k.eq_ignore_ascii_case("all"))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub min_votes: u64,
    /// RFC 3339.
    pub start_date: String,
    pub end_date: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub creator_address: String,
    #[serde(default)]
    pub allowlist: Option<Vec<String>>,
}

impl CreateSessionRequest {
    pub fn into_draft(self) -> Result<SessionDraft, ApiError> {
        let creator = Identity::parse(&self.creator_address)
            .map_err(|_| ApiError::Validation("missing address: creator_address".into()))?;
        let allowlist = self
            .allowlist
            .unwrap_or_default()
            .iter()
            .map(|raw| Identity::parse(raw))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SessionDraft {
            title: self.title,
            description: self.description,
            start_time: Timestamp::from_rfc3339(&self.start_date)?,
            end_time: Timestamp::from_rfc3339(&self.end_date)?,
            min_votes: self.min_votes,
            is_private: self.is_private,
            choices: self.options,
            creator,
            allowlist,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: SessionId,
    pub chain: ChainOutcome,
}

#[derive(Debug, Serialize)]
pub struct OptionView {
    pub option_id: String,
    pub title: String,
    pub vote_count: u64,
}

/// A session as shown to clients.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: SessionId,
    pub creator: Option<Identity>,
    pub title: String,
    pub description: String,
    pub start_date: String,
    pub end_date: String,
    pub min_votes: u64,
    pub is_private: bool,
    pub options: Vec<OptionView>,
    pub total_votes: u64,
    pub voter_count: usize,
    pub status: &'static str,
    /// Empty until the session has closed.
    pub winners: Vec<String>,
}

impl From<&VoteSession> for SessionView {
    fn from(s: &VoteSession) -> Self {
        Self {
            id: s.id.clone(),
            creator: s.creator.clone(),
            title: s.title.clone(),
            description: s.description.clone(),
            start_date: s.start_time.to_rfc3339(),
            end_date: s.end_time.to_rfc3339(),
            min_votes: s.min_votes,
            is_private: s.is_private,
            options: s
                .choices
                .iter()
                .enumerate()
                .map(|(i, c)| OptionView {
                    option_id: option_id(i),
                    title: c.title.clone(),
                    vote_count: c.vote_count,
                })
                .collect(),
            total_votes: s.total_votes,
            voter_count: s.voters.len(),
            status: s.status.as_str(),
            winners: if s.status.is_closed() {
                s.winners.clone()
            } else {
                Vec::new()
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionView>,
}

pub async fn list_sessions(
    State(service): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<SessionListResponse>, ApiError> {
    let Query(query) = query?;
    let sessions = service.list_sessions(query.include_private()).await;
    Ok(Json(SessionListResponse {
        sessions: sessions.iter().map(SessionView::from).collect(),
    }))
}

pub async fn get_session(
    State(service): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<SessionView>, ApiError> {
    let Path(id) = id?;
    let session = service.session(&SessionId::new(id)).await?;
    Ok(Json(SessionView::from(&session)))
}

pub async fn create_session(
    State(service): State<AppState>,
    body: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), ApiError> {
    let Json(body) = body?;
    let (session, chain) = service.create_session(body.into_draft()?).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: session.id,
            chain,
        }),
    ))
}

// ── Votes ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct VoteBody {
    #[serde(default)]
    pub user_address: String,
    pub selected_option_index: i64,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub session_id: SessionId,
    pub voter: Identity,
    pub choice_index: usize,
    pub option_id: String,
    pub total_votes: u64,
    pub status: &'static str,
    pub chain: ChainOutcome,
}

impl VoteResponse {
    fn new(receipt: VoteReceipt, chain: ChainOutcome) -> Self {
        Self {
            session_id: receipt.session_id,
            voter: receipt.voter,
            choice_index: receipt.choice_index,
            option_id: receipt.option_id,
            total_votes: receipt.total_votes,
            status: receipt.status.as_str(),
            chain,
        }
    }
}

pub async fn cast_vote(
    State(service): State<AppState>,
    id: Result<Path<String>, PathRejection>,
    body: Result<Json<VoteBody>, JsonRejection>,
) -> Result<Json<VoteResponse>, ApiError> {
    let Path(id) = id?;
    let Json(body) = body?;
    let voter = Identity::parse(&body.user_address)
        .map_err(|_| ApiError::Validation("missing address: user_address".into()))?;
    let request = VoteRequest {
        session_id: SessionId::new(id),
        voter,
        choice_index: body.selected_option_index,
    };
    let (receipt, chain) = service.cast_vote(request).await?;
    Ok(Json(VoteResponse::new(receipt, chain)))
}

// ── Users ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct HistoryView {
    pub session_id: SessionId,
    pub title: String,
    pub description: String,
    pub cast_at: Option<String>,
    pub option_id: String,
    pub option_text: String,
}

impl From<&HistoryEntry> for HistoryView {
    fn from(h: &HistoryEntry) -> Self {
        Self {
            session_id: h.session_id.clone(),
            title: h.title.clone(),
            description: h.description.clone(),
            cast_at: h.cast_at.map(|t| t.to_rfc3339()),
            option_id: h.option_id.clone(),
            option_text: h.option_text.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user_address: Identity,
    pub created_count: usize,
    pub participated_count: usize,
    pub sessions: Vec<SessionView>,
    pub history: Vec<HistoryView>,
}

impl From<UserProfile> for ProfileResponse {
    fn from(p: UserProfile) -> Self {
        Self {
            sessions: p.sessions.iter().map(SessionView::from).collect(),
            history: p.history.iter().map(HistoryView::from).collect(),
            user_address: p.identity,
            created_count: p.created_count,
            participated_count: p.participated_count,
        }
    }
}

pub async fn user_profile(
    State(service): State<AppState>,
    identity: Result<Path<String>, PathRejection>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let Path(identity) = identity?;
    let identity = Identity::parse(&identity)?;
    Ok(Json(service.user_profile(&identity).await.into()))
}

#[derive(Debug, Deserialize)]
pub struct ConnectWalletRequest {
    #[serde(default)]
    pub wallet_address: String,
}

#[derive(Debug, Serialize)]
pub struct ConnectWalletResponse {
    pub status: &'static str,
    pub user_id: Identity,
}

pub async fn connect_wallet(
    State(service): State<AppState>,
    body: Result<Json<ConnectWalletRequest>, JsonRejection>,
) -> Result<Json<ConnectWalletResponse>, ApiError> {
    let Json(body) = body?;
    let identity = Identity::parse(&body.wallet_address)
        .map_err(|_| ApiError::Validation("missing address: wallet_address".into()))?;
    service.connect_wallet(&identity).await?;
    Ok(Json(ConnectWalletResponse {
        status: "registered",
        user_id: identity,
    }))
}

// ── Staking ──────────────────────────────────────────────────────────────

/// Wei amounts exceed what JSON numbers carry safely, so strings are
/// accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WeiAmount {
    Number(u64),
    Text(String),
}

impl WeiAmount {
    fn value(&self) -> Result<u128, ApiError> {
        let amount = match self {
            Self::Number(n) => u128::from(*n),
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| ApiError::Validation(format!("amount_wei {s:?} is not an integer")))?,
        };
        if amount == 0 {
            return Err(ApiError::Validation("amount_wei must be positive".into()));
        }
        Ok(amount)
    }
}

#[derive(Debug, Deserialize)]
pub struct StakeRequest {
    pub amount_wei: WeiAmount,
    #[serde(default)]
    pub staker_address: String,
}

#[derive(Debug, Deserialize)]
pub struct StakerRequest {
    #[serde(default)]
    pub staker_address: String,
}

#[derive(Debug, Serialize)]
pub struct TxResponse {
    pub status: &'static str,
    pub tx_ref: String,
    pub block: u64,
}

impl From<Receipt> for TxResponse {
    fn from(r: Receipt) -> Self {
        Self {
            status: "confirmed",
            tx_ref: r.tx.to_string(),
            block: r.block,
        }
    }
}

fn staker(raw: &str) -> Result<Identity, ApiError> {
    Identity::parse(raw).map_err(|_| ApiError::Validation("missing address: staker_address".into()))
}

pub async fn stake(
    State(service): State<AppState>,
    body: Result<Json<StakeRequest>, JsonRejection>,
) -> Result<Json<TxResponse>, ApiError> {
    let Json(body) = body?;
    let who = staker(&body.staker_address)?;
    let receipt = service.stake(&who, body.amount_wei.value()?).await?;
    Ok(Json(receipt.into()))
}

pub async fn unstake(
    State(service): State<AppState>,
    body: Result<Json<StakerRequest>, JsonRejection>,
) -> Result<Json<TxResponse>, ApiError> {
    let Json(body) = body?;
    let receipt = service.unstake(&staker(&body.staker_address)?).await?;
    Ok(Json(receipt.into()))
}

pub async fn claim(
    State(service): State<AppState>,
    body: Result<Json<StakerRequest>, JsonRejection>,
) -> Result<Json<TxResponse>, ApiError> {
    let Json(body) = body?;
    let receipt = service.claim(&staker(&body.staker_address)?).await?;
    Ok(Json(receipt.into()))
}

// ── Node ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub sessions: usize,
}

pub async fn health(State(service): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        sessions: service.store().session_count().await,
    })
}

pub async fn metrics(State(service): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let body = service
        .metrics()
        .encode()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_all_includes_private_sessions() {
        let q: ListQuery = serde_json::from_str(r#"{"type":"all"}"#).unwrap();
        assert!(q.include_private());
        let q: ListQuery = serde_json::from_str(r#"{"include_private":true}"#).unwrap();
        assert!(q.include_private());
        assert!(!ListQuery::default().include_private());
    }

    #[test]
    fn wei_amounts_accept_strings_and_numbers() {
        let big: WeiAmount = serde_json::from_str(r#""1000000000000000000000""#).unwrap();
        assert_eq!(big.value().unwrap(), 1_000_000_000_000_000_000_000);
        let small: WeiAmount = serde_json::from_str("5").unwrap();
        assert_eq!(small.value().unwrap(), 5);
        assert!(WeiAmount::Text("0".into()).value().is_err());
        assert!(WeiAmount::Text("lots".into()).value().is_err());
    }

    #[test]
    fn draft_rejects_missing_creator_and_bad_dates() {
        let request = |creator: &str, start: &str| CreateSessionRequest {
            title: "t".into(),
            description: String::new(),
            is_private: false,
            min_votes: 0,
            start_date: start.into(),
            end_date: "2030-01-01T00:00:00Z".into(),
            options: vec!["a".into()],
            creator_address: creator.into(),
            allowlist: None,
        };
        assert!(matches!(
            request("", "2029-01-01T00:00:00Z").into_draft(),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            request("0xabc", "tomorrow").into_draft(),
            Err(ApiError::Validation(_))
        ));
        let draft = request("0xABC", "2029-01-01T00:00:00Z").into_draft().unwrap();
        assert_eq!(draft.creator.as_str(), "0xabc");
    }
}
