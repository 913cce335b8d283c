//! In-memory voting sessions.
//!
//! The store keeps sessions, per-identity activity and vote history behind
//! one lock. Around it sit the vote submission protocol, a periodic status
//! sweep and the merge of read-model updates reported by the indexer.
//!
//! - [`SessionTables`] implements every rule synchronously against an
//!   explicit `now`.
//! - [`SessionStore`] shares the tables across tasks and supplies the clock.
//! - [`StatusScheduler`] keeps statuses current for sessions nobody reads.
//! - [`ReadModelSync`] merges indexer updates and wakes detail waiters.

pub mod activity;
pub mod error;
pub mod scheduler;
pub mod session;
pub mod status;
pub mod store;
pub mod sync;
pub mod tables;
pub mod vote;

pub use activity::{HistoryEntry, UserActivity, UserProfile};
pub use error::SessionError;
pub use scheduler::{StatusScheduler, SweepObserver, SweepReport};
pub use session::{Choice, IdAssignment, SessionDraft, SessionStatus, VoteSession, VoterRecord};
pub use status::{compute_winners, derive_status};
pub use store::SessionStore;
pub use sync::{
    DetailWait, DetailWaiters, ReadModelSync, ReadModelUpdate, SessionDetail, SessionSummary,
    SnapshotPolicy, SyncOutcome,
};
pub use tables::SessionTables;
pub use vote::{option_id, VoteReceipt, VoteRequest};
