//! Per-identity activity, vote history and profiles.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use votegate_types::{Identity, SessionId, Timestamp};

use crate::session::VoteSession;

/// What the store remembers about an identity beyond the session table.
///
/// Participation is not stored here: it is derived from the sessions'
/// `voters` maps, which are the single source of truth for who voted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserActivity {
    pub created_sessions: BTreeSet<SessionId>,
}

/// One entry of a user's vote history as reported by the indexer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub session_id: SessionId,
    pub title: String,
    pub description: String,
    pub cast_at: Option<Timestamp>,
    pub option_id: String,
    pub option_text: String,
}

/// Aggregated view of one identity.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UserProfile {
    pub identity: Identity,
    pub created_count: usize,
    pub participated_count: usize,
    /// Sessions the identity created or voted in, deduplicated, by id.
    pub sessions: Vec<VoteSession>,
    pub history: Vec<HistoryEntry>,
}
