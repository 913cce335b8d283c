//! Read-model synchronization.
//!
//! The indexing service reports its own view of sessions asynchronously.
//! Three kinds of update are merged into the tables, each as one locked
//! operation:
//!
//! - **All-sessions snapshot**: the indexer's list of sessions. Under
//!   [`SnapshotPolicy::Preserve`] only descriptive fields and timing are
//!   taken; local votes, counters and sessions the indexer has not seen yet
//!   survive. [`SnapshotPolicy::Replace`] makes the indexer authoritative and
//!   rebuilds the table from minimal records, discarding local votes.
//! - **Session detail**: one session including option counts; overwrites
//!   the local counters, leaves `voters` alone.
//! - **User history**: replaces the history list of one identity.
//!
//! Callers may wait for a specific session detail through
//! [`DetailWaiters`]; waiters are notified after the store lock is released.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use votegate_types::{Identity, SessionId, Timestamp};

use crate::activity::HistoryEntry;
use crate::error::SessionError;
use crate::session::{Choice, VoteSession};
use crate::store::SessionStore;
use crate::tables::SessionTables;

/// How an all-sessions snapshot is merged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotPolicy {
    /// Merge by id, keep local votes and locally-known sessions.
    #[default]
    Preserve,
    /// Rebuild the table from the snapshot, dropping local vote state.
    Replace,
}

/// Summary fields of a session, as listed by the indexer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: SessionId,
    pub title: String,
    pub description: String,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
}

/// Full view of one session, as reported by the indexer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionDetail {
    pub id: SessionId,
    pub title: String,
    pub description: String,
    pub creator: Option<Identity>,
    pub min_votes: u64,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub choices: Vec<Choice>,
}

/// An inbound read-model update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadModelUpdate {
    AllSessions(Vec<SessionSummary>),
    SessionDetail(SessionDetail),
    UserHistory {
        identity: Identity,
        entries: Vec<HistoryEntry>,
    },
}

impl ReadModelUpdate {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AllSessions(_) => "all_sessions",
            Self::SessionDetail(_) => "session_detail",
            Self::UserHistory { .. } => "user_history",
        }
    }
}

/// What a merge did.
#[derive(Clone, Debug, PartialEq)]
pub enum SyncOutcome {
    Snapshot {
        added: usize,
        updated: usize,
        removed: usize,
    },
    Detail {
        session: VoteSession,
        created: bool,
    },
    History {
        identity: Identity,
        entries: usize,
    },
}

impl SessionTables {
    /// Merge an all-sessions snapshot.
    pub fn apply_snapshot(
        &mut self,
        summaries: Vec<SessionSummary>,
        policy: SnapshotPolicy,
        now: Timestamp,
    ) -> SyncOutcome {
        let summaries =
            dedup_summaries(summaries.into_iter().filter(|s| !s.id.is_empty()).collect());

        let outcome = match policy {
            SnapshotPolicy::Replace => {
                let previous = std::mem::take(&mut self.sessions);
                let mut added = 0;
                let mut updated = 0;
                for summary in summaries {
                    if previous.contains_key(&summary.id) {
                        updated += 1;
                    } else {
                        added += 1;
                    }
                    let session = VoteSession::minimal(
                        summary.id,
                        summary.title,
                        summary.description,
                        summary.start_time,
                        summary.end_time,
                    );
                    self.sessions.insert(session.id.clone(), session);
                }
                let removed = previous
                    .keys()
                    .filter(|id| !self.sessions.contains_key(*id))
                    .count();
                SyncOutcome::Snapshot {
                    added,
                    updated,
                    removed,
                }
            }
            SnapshotPolicy::Preserve => {
                let mut added = 0;
                let mut updated = 0;
                for summary in summaries {
                    match self.sessions.get_mut(&summary.id) {
                        Some(existing) => {
                            existing.title = summary.title;
                            existing.description = summary.description;
                            existing.start_time = summary.start_time;
                            existing.end_time = summary.end_time;
                            updated += 1;
                        }
                        None => {
                            let session = VoteSession::minimal(
                                summary.id,
                                summary.title,
                                summary.description,
                                summary.start_time,
                                summary.end_time,
                            );
                            self.sessions.insert(session.id.clone(), session);
                            added += 1;
                        }
                    }
                }
                SyncOutcome::Snapshot {
                    added,
                    updated,
                    removed: 0,
                }
            }
        };

        self.refresh_all(now);
        outcome
    }

    /// Upsert one session from its detail.
    pub fn apply_detail(
        &mut self,
        detail: SessionDetail,
        now: Timestamp,
    ) -> Result<SyncOutcome, SessionError> {
        if detail.id.is_empty() {
            return Err(SessionError::Validation(
                "session detail without an id".into(),
            ));
        }

        let created = !self.sessions.contains_key(&detail.id);
        let session = self.sessions.entry(detail.id.clone()).or_insert_with(|| {
            VoteSession::minimal(
                detail.id.clone(),
                String::new(),
                String::new(),
                detail.start_time,
                detail.end_time,
            )
        });

        session.title = detail.title;
        session.description = detail.description;
        if detail.creator.is_some() {
            session.creator = detail.creator;
        }
        session.min_votes = detail.min_votes;
        session.start_time = detail.start_time;
        session.end_time = detail.end_time;
        session.choices = detail.choices;
        session.total_votes = session.counted_votes();
        session.refresh_status(now);

        Ok(SyncOutcome::Detail {
            session: session.clone(),
            created,
        })
    }

    /// Replace the stored history of one identity.
    pub fn apply_history(&mut self, identity: Identity, entries: Vec<HistoryEntry>) -> SyncOutcome {
        let count = entries.len();
        self.history.insert(identity.clone(), entries);
        SyncOutcome::History {
            identity,
            entries: count,
        }
    }
}

struct Waiter {
    token: u64,
    tx: oneshot::Sender<VoteSession>,
}

/// Callers waiting for a particular session detail to arrive.
#[derive(Default)]
pub struct DetailWaiters {
    waiters: Mutex<HashMap<SessionId, Vec<Waiter>>>,
    next_token: AtomicU64,
}

impl DetailWaiters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in the next detail for `id`.
    pub fn register(self: &Arc<Self>, id: SessionId) -> DetailWait {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.lock().entry(id.clone()).or_default().push(Waiter { token, tx });
        DetailWait {
            id,
            token,
            rx: Some(rx),
            waiters: Arc::clone(self),
        }
    }

    /// Hand `session` to everyone waiting for it. Returns how many waiters
    /// received it.
    pub fn deliver(&self, session: &VoteSession) -> usize {
        let waiting = self.lock().remove(&session.id).unwrap_or_default();
        waiting
            .into_iter()
            .filter_map(|w| w.tx.send(session.clone()).ok())
            .count()
    }

    /// Number of registrations still pending.
    pub fn pending(&self) -> usize {
        self.lock().values().map(Vec::len).sum()
    }

    fn cancel(&self, id: &SessionId, token: u64) {
        let mut waiters = self.lock();
        if let Some(list) = waiters.get_mut(id) {
            list.retain(|w| w.token != token);
            if list.is_empty() {
                waiters.remove(id);
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, Vec<Waiter>>> {
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A pending registration. Dropping it withdraws the registration.
pub struct DetailWait {
    id: SessionId,
    token: u64,
    rx: Option<oneshot::Receiver<VoteSession>>,
    waiters: Arc<DetailWaiters>,
}

impl DetailWait {
    /// Wait at most `timeout` for the detail.
    pub async fn wait(mut self, timeout: Duration) -> Option<VoteSession> {
        let rx = self.rx.take()?;
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(session)) => Some(session),
            Ok(Err(_)) => None,
            Err(_) => {
                debug!(session_id = %self.id, "timed out waiting for session detail");
                None
            }
        }
    }
}

impl Drop for DetailWait {
    fn drop(&mut self) {
        self.waiters.cancel(&self.id, self.token);
    }
}

/// Applies read-model updates to the store.
pub struct ReadModelSync {
    store: Arc<SessionStore>,
    waiters: Arc<DetailWaiters>,
    policy: SnapshotPolicy,
}

impl ReadModelSync {
    pub fn new(store: Arc<SessionStore>, waiters: Arc<DetailWaiters>, policy: SnapshotPolicy) -> Self {
        Self {
            store,
            waiters,
            policy,
        }
    }

    pub fn policy(&self) -> SnapshotPolicy {
        self.policy
    }

    pub fn waiters(&self) -> &Arc<DetailWaiters> {
        &self.waiters
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Merge one update, then notify detail waiters.
    pub async fn apply(&self, update: ReadModelUpdate) -> Result<SyncOutcome, SessionError> {
        let kind = update.kind();
        let outcome = self.store.apply_update(update, self.policy).await?;

        match &outcome {
            SyncOutcome::Snapshot {
                added,
                updated,
                removed,
            } => {
                if *removed > 0 {
                    warn!(
                        removed,
                        "snapshot replaced the session table; local sessions were dropped"
                    );
                }
                info!(added, updated, removed, policy = ?self.policy, "session snapshot merged");
            }
            SyncOutcome::Detail { session, created } => {
                let delivered = self.waiters.deliver(session);
                debug!(
                    session_id = %session.id,
                    created,
                    delivered,
                    total_votes = session.total_votes,
                    "session detail merged"
                );
            }
            SyncOutcome::History { identity, entries } => {
                debug!(identity = %identity, entries, "user history replaced");
            }
        }
        debug!(kind, "read-model update applied");
        Ok(outcome)
    }
}

/// Group summaries by id, keeping the last occurrence.
fn dedup_summaries(summaries: Vec<SessionSummary>) -> Vec<SessionSummary> {
    let mut by_id: BTreeMap<SessionId, SessionSummary> = BTreeMap::new();
    for summary in summaries {
        by_id.insert(summary.id.clone(), summary);
    }
    by_id.into_values().collect()
}
