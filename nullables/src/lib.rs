//! Nullable infrastructure for deterministic testing.
//!
//! The gateway's external dependencies (clock, ledger, event publisher) sit
//! behind traits. This crate provides implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Record what was asked of them
//! - Never touch the network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod ledger;
pub mod publisher;

pub use clock::NullClock;
pub use ledger::{LedgerCall, NullLedger};
pub use publisher::NullPublisher;
