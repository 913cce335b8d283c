//! The voting gateway.
//!
//! Wires one [`SessionStore`](votegate_sessions::SessionStore) to:
//! - the HTTP API (`votegate-rpc`)
//! - the periodic status sweep
//! - the read-model consumer fed by the indexer over the WebSocket bridge
//! - the ledger client and the event publisher
//!
//! and owns configuration, logging setup, metrics and graceful shutdown.

pub mod config;
pub mod consumer;
pub mod error;
pub mod gateway;
pub mod shutdown;

pub use config::{Environment, GatewayConfig};
pub use consumer::SyncConsumer;
pub use error::GatewayError;
pub use gateway::Gateway;
pub use shutdown::{ShutdownController, ShutdownReason};
pub use votegate_rpc::GatewayMetrics;
pub use votegate_utils::{init_logging, LogFormat};
