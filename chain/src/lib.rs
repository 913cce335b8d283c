//! The ledger boundary.
//!
//! Sessions, votes and stakes may be mirrored on a voting/staking contract.
//! The gateway only sees the [`LedgerClient`] trait; [`SimulatedLedger`]
//! is the in-process implementation used when no chain is wired.

pub mod client;
pub mod confirm;
pub mod error;
pub mod simulated;

pub use client::{LedgerClient, Receipt, ReceiptStatus, SessionSubmission, SubmittedSession};
pub use confirm::wait_for_confirmation;
pub use error::{ChainError, ContractError};
pub use simulated::SimulatedLedger;
