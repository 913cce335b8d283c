//! The shared session store.

use std::sync::Arc;
use tokio::sync::Mutex;
use votegate_types::{Clock, Identity, SessionId, Timestamp};

use crate::activity::UserProfile;
use crate::error::SessionError;
use crate::session::{IdAssignment, SessionDraft, VoteSession};
use crate::sync::{ReadModelUpdate, SnapshotPolicy, SyncOutcome};
use crate::tables::SessionTables;
use crate::vote::{VoteReceipt, VoteRequest};

/// Session state shared by request handlers, the status scheduler and the
/// read-model consumer.
///
/// Every operation takes the one lock for its whole duration, so
/// check-then-act sequences such as the vote protocol are atomic and
/// readers never observe a half-applied update. The lock is never held
/// across I/O.
pub struct SessionStore {
    tables: Mutex<SessionTables>,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: Mutex::new(SessionTables::new()),
            clock,
        }
    }

    /// Current time as seen by the store.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub async fn create_session(
        &self,
        draft: SessionDraft,
        ids: IdAssignment,
    ) -> Result<VoteSession, SessionError> {
        let now = self.now();
        self.tables.lock().await.create_session(draft, ids, now)
    }

    pub async fn get_session(&self, id: &SessionId) -> Result<VoteSession, SessionError> {
        let now = self.now();
        self.tables.lock().await.get_session(id, now)
    }

    pub async fn list_sessions(&self, include_private: bool) -> Vec<VoteSession> {
        let now = self.now();
        self.tables.lock().await.list_sessions(include_private, now)
    }

    pub async fn user_profile(&self, identity: &Identity) -> UserProfile {
        let now = self.now();
        self.tables.lock().await.user_profile(identity, now)
    }

    pub async fn cast_vote(&self, request: &VoteRequest) -> Result<VoteReceipt, SessionError> {
        let now = self.now();
        self.tables.lock().await.cast_vote(request, now)
    }

    /// Recompute every session's status. Returns `(sessions, changed)`.
    pub async fn refresh_all(&self) -> (usize, usize) {
        let now = self.now();
        let mut tables = self.tables.lock().await;
        let changed = tables.refresh_all(now);
        (tables.len(), changed)
    }

    /// Merge one read-model update as a single locked operation.
    pub async fn apply_update(
        &self,
        update: ReadModelUpdate,
        policy: SnapshotPolicy,
    ) -> Result<SyncOutcome, SessionError> {
        let now = self.now();
        let mut tables = self.tables.lock().await;
        match update {
            ReadModelUpdate::AllSessions(summaries) => {
                Ok(tables.apply_snapshot(summaries, policy, now))
            }
            ReadModelUpdate::SessionDetail(detail) => tables.apply_detail(detail, now),
            ReadModelUpdate::UserHistory { identity, entries } => {
                Ok(tables.apply_history(identity, entries))
            }
        }
    }

    pub async fn session_count(&self) -> usize {
        self.tables.lock().await.len()
    }
}
