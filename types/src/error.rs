//! Errors raised while constructing shared types from untrusted input.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VotegateError {
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
