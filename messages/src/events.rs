//! Outbound domain events.
//!
//! Payloads keep the field names the downstream indexer consumes
//! (camelCase), so they are defined here rather than reusing core types.

use serde::{Deserialize, Serialize};
use votegate_sessions::{option_id, VoteReceipt, VoteSession};
use votegate_types::{Identity, SessionId, Timestamp};

use crate::error::CodecError;
use crate::topics::Topic;

/// An option as announced on session creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedOption {
    pub option_id: String,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreated {
    pub id: SessionId,
    pub title: String,
    pub description: String,
    pub creator_id: String,
    pub private: bool,
    pub min_votes: u64,
    pub start_date: String,
    pub end_date: String,
    pub options: Vec<CreatedOption>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteCast {
    pub voting_id: SessionId,
    pub voter_id: String,
    pub option_id: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub voting_id: SessionId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRequest {
    pub user_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub user_id: String,
}

/// A notification about a state change or a request to the indexer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomainEvent {
    SessionCreated(SessionCreated),
    VoteCast(VoteCast),
    SessionDetailRequested(SessionRequest),
    AllSessionsRequested,
    HistoryRequested(HistoryRequest),
    UserRegistered(UserRef),
}

impl DomainEvent {
    pub fn session_created(session: &VoteSession) -> Self {
        Self::SessionCreated(SessionCreated {
            id: session.id.clone(),
            title: session.title.clone(),
            description: session.description.clone(),
            creator_id: session
                .creator
                .as_ref()
                .map(|c| c.as_str().to_string())
                .unwrap_or_default(),
            private: session.is_private,
            min_votes: session.min_votes,
            start_date: session.start_time.to_rfc3339(),
            end_date: session.end_time.to_rfc3339(),
            options: session
                .choices
                .iter()
                .enumerate()
                .map(|(i, c)| CreatedOption {
                    option_id: option_id(i),
                    text: c.title.clone(),
                })
                .collect(),
        })
    }

    pub fn vote_cast(receipt: &VoteReceipt) -> Self {
        Self::VoteCast(VoteCast {
            voting_id: receipt.session_id.clone(),
            voter_id: receipt.voter.as_str().to_string(),
            option_id: receipt.choice_index as u64 + 1,
        })
    }

    pub fn detail_requested(id: &SessionId) -> Self {
        Self::SessionDetailRequested(SessionRequest {
            voting_id: id.clone(),
        })
    }

    pub fn history_requested(identity: &Identity) -> Self {
        Self::HistoryRequested(HistoryRequest {
            user_id: identity.as_str().to_string(),
        })
    }

    pub fn user_registered(identity: &Identity) -> Self {
        Self::UserRegistered(UserRef {
            user_id: identity.as_str().to_string(),
        })
    }

    pub fn topic(&self) -> Topic {
        match self {
            Self::SessionCreated(_) => Topic::SessionCreate,
            Self::VoteCast(_) => Topic::VoteCast,
            Self::SessionDetailRequested(_) => Topic::SessionRequest,
            Self::AllSessionsRequested => Topic::TriggerAllSessions,
            Self::HistoryRequested(_) => Topic::HistoryRequest,
            Self::UserRegistered(_) => Topic::UserRegistrations,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SessionCreated(_) => "VotingCreated",
            Self::VoteCast(_) => "VoteCast",
            Self::SessionDetailRequested(_) => "VotingDetailsRequested",
            Self::AllSessionsRequested => "AllVotingsTriggered",
            Self::HistoryRequested(_) => "VoteHistoryRequested",
            Self::UserRegistered(_) => "UserRegistered",
        }
    }

    /// Partitioning key: all events about one entity share a key.
    pub fn key(&self) -> Option<String> {
        match self {
            Self::SessionCreated(e) => Some(e.id.to_string()),
            Self::VoteCast(e) => Some(format!("{}-{}", e.voting_id, e.voter_id)),
            Self::SessionDetailRequested(e) => Some(e.voting_id.to_string()),
            Self::AllSessionsRequested => None,
            Self::HistoryRequested(e) => Some(e.user_id.clone()),
            Self::UserRegistered(e) => Some(e.user_id.clone()),
        }
    }

    fn payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Self::SessionCreated(e) => serde_json::to_value(e),
            Self::VoteCast(e) => serde_json::to_value(e),
            Self::SessionDetailRequested(e) => serde_json::to_value(e),
            Self::AllSessionsRequested => Ok(serde_json::json!({})),
            Self::HistoryRequested(e) => serde_json::to_value(e),
            Self::UserRegistered(e) => serde_json::to_value(e),
        }
    }
}

/// Wire form of a published event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub topic: Topic,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub event_type: String,
    pub data: serde_json::Value,
    pub timestamp: String,
}

impl Envelope {
    pub fn wrap(event: &DomainEvent, at: Timestamp) -> Result<Self, CodecError> {
        let data = event
            .payload()
            .map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok(Self {
            topic: event.topic(),
            key: event.key(),
            event_type: event.event_type().to_string(),
            data,
            timestamp: at.to_rfc3339(),
        })
    }

    pub fn to_json(&self) -> Result<String, CodecError> {
        serde_json::to_string(self).map_err(|e| CodecError::Encode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use votegate_sessions::{Choice, SessionStatus};

    fn session() -> VoteSession {
        let mut s = VoteSession::minimal(
            SessionId::new("12"),
            "Budget".into(),
            "Q3".into(),
            Timestamp::new(0),
            Timestamp::new(3600),
        );
        s.creator = Some(Identity::parse("0xAbc").unwrap());
        s.min_votes = 2;
        s.choices = vec![Choice::new("yes"), Choice::new("no")];
        s
    }

    #[test]
    fn session_created_payload_uses_indexer_field_names() {
        let env = Envelope::wrap(&DomainEvent::session_created(&session()), Timestamp::new(5)).unwrap();
        assert_eq!(env.topic, Topic::SessionCreate);
        assert_eq!(env.key.as_deref(), Some("12"));
        assert_eq!(env.event_type, "VotingCreated");
        assert_eq!(env.timestamp, "1970-01-01T00:00:05Z");
        assert_eq!(env.data["creatorId"], "0xabc");
        assert_eq!(env.data["minVotes"], 2);
        assert_eq!(env.data["endDate"], "1970-01-01T01:00:00Z");
        assert_eq!(env.data["options"][1]["optionId"], "2");
        assert_eq!(env.data["options"][1]["text"], "no");
    }

    #[test]
    fn vote_cast_is_keyed_by_session_and_voter() {
        let receipt = VoteReceipt {
            session_id: SessionId::new("12"),
            voter: Identity::parse("0xU1").unwrap(),
            choice_index: 0,
            option_id: "1".into(),
            total_votes: 1,
            status: SessionStatus::Active,
        };
        let event = DomainEvent::vote_cast(&receipt);
        assert_eq!(event.key().as_deref(), Some("12-0xu1"));
        let env = Envelope::wrap(&event, Timestamp::new(0)).unwrap();
        assert_eq!(env.data["optionId"], 1);
        assert_eq!(env.data["votingId"], "12");
    }

    #[test]
    fn trigger_has_no_key_and_empty_body() {
        let env = Envelope::wrap(&DomainEvent::AllSessionsRequested, Timestamp::new(0)).unwrap();
        assert_eq!(env.key, None);
        assert_eq!(env.data, serde_json::json!({}));
        let json = env.to_json().unwrap();
        assert!(json.contains("\"topic\":\"trigger-all-votings\""));
        assert!(!json.contains("\"key\""));
    }
}
