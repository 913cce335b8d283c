use thiserror::Error;
use votegate_types::{Identity, SessionId, VotegateError};

/// Failures of session-store operations.
///
/// Every variant is rejected before any mutation takes place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("session {0} not found")]
    NotFound(SessionId),

    #[error("session {0} has not started yet")]
    NotStarted(SessionId),

    #[error("session {0} has already ended")]
    AlreadyEnded(SessionId),

    #[error("option {index} is not valid for session {session} ({options} options)")]
    InvalidOption {
        session: SessionId,
        index: i64,
        options: usize,
    },

    #[error("{voter} has already voted in session {session}")]
    AlreadyVoted { session: SessionId, voter: Identity },
}

impl From<VotegateError> for SessionError {
    fn from(e: VotegateError) -> Self {
        SessionError::Validation(e.to_string())
    }
}
