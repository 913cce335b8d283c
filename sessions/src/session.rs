//! Voting sessions and their lifecycle.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use votegate_types::{Identity, SessionId, Timestamp};

use crate::error::SessionError;

/// Lifecycle status of a session.
///
/// Derived from the clock and the vote counts, never set directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Voting window has not opened yet.
    Upcoming,
    /// Voting window is open.
    Active,
    /// Window closed with at least `min_votes` votes; winners are final.
    Finished,
    /// Window closed below the participation threshold.
    Rejected,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upcoming => "Upcoming",
            Self::Active => "Active",
            Self::Finished => "Finished",
            Self::Rejected => "Rejected",
        }
    }

    /// Whether the voting window has closed.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Finished | Self::Rejected)
    }
}

/// One selectable option of a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub title: String,
    pub vote_count: u64,
}

impl Choice {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            vote_count: 0,
        }
    }
}

/// A recorded vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterRecord {
    pub has_voted: bool,
    pub choice_index: usize,
}

/// A voting session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoteSession {
    pub id: SessionId,
    /// Sessions materialized from an indexer summary may not know their
    /// creator until the detail arrives.
    pub creator: Option<Identity>,
    pub title: String,
    pub description: String,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub min_votes: u64,
    pub is_private: bool,
    pub choices: Vec<Choice>,
    /// Authoritative record of who voted, keyed by normalized identity.
    pub voters: BTreeMap<Identity, VoterRecord>,
    /// Always equal to the sum of `choices[*].vote_count`.
    pub total_votes: u64,
    pub status: SessionStatus,
    /// Titles of the leading choices; only meaningful once closed.
    pub winners: Vec<String>,
}

impl VoteSession {
    /// A minimal record for a session known only by its summary fields.
    pub fn minimal(
        id: SessionId,
        title: String,
        description: String,
        start_time: Timestamp,
        end_time: Timestamp,
    ) -> Self {
        Self {
            id,
            creator: None,
            title,
            description,
            start_time,
            end_time,
            min_votes: 0,
            is_private: false,
            choices: Vec::new(),
            voters: BTreeMap::new(),
            total_votes: 0,
            status: SessionStatus::Upcoming,
            winners: Vec::new(),
        }
    }

    /// Whether `identity` has a recorded vote here.
    pub fn has_voted(&self, identity: &Identity) -> bool {
        self.voters.get(identity).is_some_and(|v| v.has_voted)
    }

    /// Sum of all choice counters.
    pub fn counted_votes(&self) -> u64 {
        self.choices.iter().map(|c| c.vote_count).sum()
    }
}

/// Everything needed to create a session.
#[derive(Clone, Debug)]
pub struct SessionDraft {
    pub title: String,
    pub description: String,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub min_votes: u64,
    pub is_private: bool,
    pub choices: Vec<String>,
    pub creator: Identity,
    /// Identities the ledger contract should let vote; forwarded to the
    /// ledger only, the local store does not enforce it.
    pub allowlist: Vec<Identity>,
}

impl SessionDraft {
    /// Check the draft before anything is stored.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.start_time > self.end_time {
            return Err(SessionError::Validation(format!(
                "start time {} is after end time {}",
                self.start_time.to_rfc3339(),
                self.end_time.to_rfc3339()
            )));
        }
        if self.title.trim().is_empty() {
            return Err(SessionError::Validation("title must not be empty".into()));
        }
        if self.choices.is_empty() {
            return Err(SessionError::Validation(
                "a session needs at least one option".into(),
            ));
        }
        if self.choices.iter().any(|c| c.trim().is_empty()) {
            return Err(SessionError::Validation("options must not be empty".into()));
        }
        Ok(())
    }
}

/// How a new session gets its id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdAssignment {
    /// Generate the next `local-<n>` id.
    Local,
    /// Use the id the ledger confirmed for this session.
    Confirmed(SessionId),
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn identity(raw: &str) -> Identity {
        Identity::parse(raw).expect("valid identity")
    }

    pub fn draft(choices: &[&str], start: u64, end: u64, min_votes: u64) -> SessionDraft {
        SessionDraft {
            title: "Lunch".into(),
            description: "Where do we eat".into(),
            start_time: Timestamp::new(start),
            end_time: Timestamp::new(end),
            min_votes,
            is_private: false,
            choices: choices.iter().map(|c| c.to_string()).collect(),
            creator: identity("0xCreator"),
            allowlist: Vec::new(),
        }
    }
}
