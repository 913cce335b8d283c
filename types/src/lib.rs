//! Fundamental types for the votegate gateway.
//!
//! This crate defines the types shared across every other crate in the
//! workspace: timestamps and the clock abstraction, voter identities,
//! session ids and ledger transaction references.

pub mod error;
pub mod identity;
pub mod ids;
pub mod time;

pub use error::VotegateError;
pub use identity::Identity;
pub use ids::{SessionId, TxRef};
pub use time::{Clock, SystemClock, Timestamp};
