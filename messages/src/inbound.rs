//! Indexer payloads and their conversion into read-model updates.
//!
//! Numbers from the indexer are loosely typed: `minVotes` has been seen both
//! as a JSON string and as a number, dates as fractional seconds or strings.
//! [`Loose`] absorbs that at the boundary.

use serde::Deserialize;
use votegate_sessions::{Choice, HistoryEntry, SessionDetail, SessionSummary};
use votegate_types::{Identity, SessionId, Timestamp};

use crate::error::CodecError;
use crate::topics::Topic;

/// A number that may arrive as a JSON number or a string.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Loose {
    Number(f64),
    Text(String),
}

impl Loose {
    fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) if n.is_finite() && *n >= 0.0 => Some(*n as u64),
            Self::Number(_) => None,
            Self::Text(s) if s.trim().is_empty() => Some(0),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            Self::Number(n) => Some(Timestamp::from_secs_f64(*n)),
            Self::Text(s) => match s.trim().parse::<f64>() {
                Ok(n) => Some(Timestamp::from_secs_f64(n)),
                Err(_) => Timestamp::from_rfc3339(s).ok(),
            },
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionListing {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date: Loose,
    pub end_date: Loose,
}

/// Payload of `all-votings-response`.
#[derive(Clone, Debug, Deserialize)]
pub struct AllSessionsResponse {
    #[serde(default)]
    pub votings: Vec<SessionListing>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionCount {
    #[serde(default)]
    pub option_id: Option<Loose>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub vote_count: u64,
}

/// Payload of `voting-response`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    #[serde(default)]
    pub voting_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub creator_id: String,
    #[serde(default)]
    pub min_votes: Option<Loose>,
    pub start_date: Loose,
    pub end_date: Loose,
    #[serde(default)]
    pub options: Vec<OptionCount>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    #[serde(default)]
    pub voting_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cast_at: Option<Loose>,
    #[serde(default)]
    pub option_id: Option<Loose>,
    #[serde(default)]
    pub option_text: String,
}

/// Payload of `vote-history-response`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub history: Vec<HistoryItem>,
}

fn timestamp(topic: Topic, field: &'static str, value: &Loose) -> Result<Timestamp, CodecError> {
    value.as_timestamp().ok_or_else(|| CodecError::InvalidField {
        topic: topic.to_string(),
        field,
        reason: format!("{value:?} is not a timestamp"),
    })
}

fn loose_text(value: &Option<Loose>) -> String {
    match value {
        Some(Loose::Text(s)) => s.clone(),
        Some(Loose::Number(n)) if n.fract() == 0.0 => format!("{}", *n as i64),
        Some(Loose::Number(n)) => n.to_string(),
        None => String::new(),
    }
}

impl AllSessionsResponse {
    pub fn into_summaries(self) -> Result<Vec<SessionSummary>, CodecError> {
        let topic = Topic::AllSessionsResponse;
        self.votings
            .into_iter()
            .map(|v| {
                Ok(SessionSummary {
                    id: SessionId::new(v.id),
                    title: v.title,
                    description: v.description,
                    start_time: timestamp(topic, "startDate", &v.start_date)?,
                    end_time: timestamp(topic, "endDate", &v.end_date)?,
                })
            })
            .collect()
    }
}

impl SessionResponse {
    pub fn into_detail(self) -> Result<SessionDetail, CodecError> {
        let topic = Topic::SessionResponse;
        let min_votes = match &self.min_votes {
            None => 0,
            Some(v) => v.as_u64().ok_or_else(|| CodecError::InvalidField {
                topic: topic.to_string(),
                field: "minVotes",
                reason: format!("{v:?} is not a count"),
            })?,
        };
        // The creator is informational; an unusable one is dropped rather
        // than failing the whole update.
        let creator = Identity::parse(&self.creator_id).ok();

        Ok(SessionDetail {
            id: SessionId::new(self.voting_id),
            title: self.title,
            description: self.description,
            creator,
            min_votes,
            start_time: timestamp(topic, "startDate", &self.start_date)?,
            end_time: timestamp(topic, "endDate", &self.end_date)?,
            choices: self
                .options
                .into_iter()
                .map(|o| Choice {
                    title: o.text,
                    vote_count: o.vote_count,
                })
                .collect(),
        })
    }
}

impl HistoryResponse {
    pub fn into_parts(self) -> Result<(Identity, Vec<HistoryEntry>), CodecError> {
        let identity = Identity::parse(&self.user_id).map_err(|e| CodecError::InvalidField {
            topic: Topic::HistoryResponse.to_string(),
            field: "userId",
            reason: e.to_string(),
        })?;
        let entries = self
            .history
            .into_iter()
            .map(|h| HistoryEntry {
                session_id: SessionId::new(h.voting_id),
                title: h.title,
                description: h.description,
                cast_at: h.cast_at.as_ref().and_then(Loose::as_timestamp),
                option_id: loose_text(&h.option_id),
                option_text: h.option_text,
            })
            .collect();
        Ok((identity, entries))
    }
}
