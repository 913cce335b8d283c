//! HTTP API of the voting gateway.
//!
//! Routes:
//! - `GET /sessions`, `GET /sessions/{id}`, `POST /sessions`
//! - `POST /sessions/{id}/votes`
//! - `POST /users/{identity}/profile`, `POST /wallets/connect`
//! - `POST /staking/{stake,unstake,claim}`
//! - `GET /health`, `GET /metrics`
//!
//! Errors are JSON bodies `{"error": code, "message": text}` with a status
//! derived from the error kind.

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod server;
pub mod service;

pub use error::ApiError;
pub use metrics::GatewayMetrics;
pub use server::{router, RpcServer};
pub use service::{ChainOutcome, ServiceSettings, VotingService};
