//! API error types and their HTTP mapping.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::warn;
use votegate_chain::{ChainError, ContractError};
use votegate_messages::PublishError;
use votegate_sessions::SessionError;
use votegate_types::VotegateError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    NotStarted(String),

    #[error("{0}")]
    AlreadyEnded(String),

    #[error("{0}")]
    InvalidOption(String),

    #[error("{0}")]
    AlreadyVoted(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("ledger call failed: {0}")]
    Chain(#[from] ChainError),

    #[error("event publish failed: {0}")]
    Publish(#[from] PublishError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Machine-readable code sent in the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::NotStarted(_) => "not_started",
            Self::AlreadyEnded(_) => "already_ended",
            Self::InvalidOption(_) => "invalid_option",
            Self::AlreadyVoted(_) => "already_voted",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Chain(ChainError::Contract(ContractError::NothingToClaim)) => "nothing_to_claim",
            Self::Chain(ChainError::Contract(ContractError::NothingStaked)) => "nothing_staked",
            Self::Chain(ChainError::Contract(ContractError::CooldownClaimNotReached)) => {
                "cooldown_not_reached"
            }
            Self::Chain(ChainError::Contract(ContractError::NotEnoughBalanceOnContract)) => {
                "insufficient_contract_balance"
            }
            Self::Chain(ChainError::InvalidRequest(_)) => "validation_error",
            Self::Chain(_) | Self::Publish(_) => "upstream_error",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidOption(_) | Self::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::NotStarted(_) | Self::AlreadyEnded(_) => StatusCode::FORBIDDEN,
            Self::AlreadyVoted(_) => StatusCode::CONFLICT,
            Self::Chain(e) => match e {
                ChainError::Contract(ContractError::NothingToClaim)
                | ChainError::Contract(ContractError::NothingStaked) => StatusCode::NOT_FOUND,
                ChainError::Contract(ContractError::CooldownClaimNotReached) => {
                    StatusCode::TOO_MANY_REQUESTS
                }
                ChainError::Contract(ContractError::NotEnoughBalanceOnContract) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                ChainError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Publish(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(code = self.code(), error = %self, "request failed");
        }
        let body = json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        let message = e.to_string();
        match e {
            SessionError::Validation(_) => Self::Validation(message),
            SessionError::NotFound(_) => Self::NotFound(message),
            SessionError::NotStarted(_) => Self::NotStarted(message),
            SessionError::AlreadyEnded(_) => Self::AlreadyEnded(message),
            SessionError::InvalidOption { .. } => Self::InvalidOption(message),
            SessionError::AlreadyVoted { .. } => Self::AlreadyVoted(message),
        }
    }
}

impl From<VotegateError> for ApiError {
    fn from(e: VotegateError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::InvalidRequest(e.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        Self::InvalidRequest(e.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(e: PathRejection) -> Self {
        Self::InvalidRequest(e.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use votegate_types::{Identity, SessionId};

    #[test]
    fn session_errors_keep_their_codes() {
        let id = SessionId::new("3");
        let cases = [
            (SessionError::Validation("x".into()), 400, "validation_error"),
            (SessionError::NotFound(id.clone()), 404, "not_found"),
            (SessionError::NotStarted(id.clone()), 403, "not_started"),
            (SessionError::AlreadyEnded(id.clone()), 403, "already_ended"),
            (
                SessionError::InvalidOption {
                    session: id.clone(),
                    index: 9,
                    options: 2,
                },
                400,
                "invalid_option",
            ),
            (
                SessionError::AlreadyVoted {
                    session: id,
                    voter: Identity::parse("0xa").unwrap(),
                },
                409,
                "already_voted",
            ),
        ];
        for (err, status, code) in cases {
            let api = ApiError::from(err);
            assert_eq!(api.status().as_u16(), status);
            assert_eq!(api.code(), code);
        }
    }

    #[test]
    fn contract_reverts_map_to_client_statuses() {
        let claim = ApiError::from(ChainError::Contract(ContractError::NothingToClaim));
        assert_eq!(claim.status(), StatusCode::NOT_FOUND);
        let cooldown = ApiError::from(ChainError::Contract(ContractError::CooldownClaimNotReached));
        assert_eq!(cooldown.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(cooldown.code(), "cooldown_not_reached");
        let down = ApiError::from(ChainError::Unavailable("rpc down".into()));
        assert_eq!(down.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(down.code(), "upstream_error");
        assert_eq!(
            ApiError::from(PublishError::Closed).status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
