//! Topic names of the event stream.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CodecError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Topic {
    // Outbound
    SessionCreate,
    VoteCast,
    SessionRequest,
    TriggerAllSessions,
    HistoryRequest,
    UserRegistrations,

    // Inbound
    AllSessionsResponse,
    SessionResponse,
    HistoryResponse,
}

impl Topic {
    pub const OUTBOUND: [Topic; 6] = [
        Topic::SessionCreate,
        Topic::VoteCast,
        Topic::SessionRequest,
        Topic::TriggerAllSessions,
        Topic::HistoryRequest,
        Topic::UserRegistrations,
    ];

    pub const INBOUND: [Topic; 3] = [
        Topic::AllSessionsResponse,
        Topic::SessionResponse,
        Topic::HistoryResponse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionCreate => "voting-create",
            Self::VoteCast => "vote-cast",
            Self::SessionRequest => "voting-request",
            Self::TriggerAllSessions => "trigger-all-votings",
            Self::HistoryRequest => "vote-history-request",
            Self::UserRegistrations => "user-registrations",
            Self::AllSessionsResponse => "all-votings-response",
            Self::SessionResponse => "voting-response",
            Self::HistoryResponse => "vote-history-response",
        }
    }

    pub fn parse(name: &str) -> Result<Self, CodecError> {
        Self::OUTBOUND
            .iter()
            .chain(Self::INBOUND.iter())
            .copied()
            .find(|t| t.as_str() == name)
            .ok_or_else(|| CodecError::UnknownTopic(name.to_string()))
    }

    pub fn is_inbound(&self) -> bool {
        Self::INBOUND.contains(self)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Topic {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.as_str().to_string()
    }
}
