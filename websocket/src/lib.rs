//! WebSocket bridge for the event stream.
//!
//! Outbound, every [`DomainEvent`](votegate_messages::DomainEvent) is
//! broadcast on its topic to subscribed clients. Inbound, the indexer pushes
//! read-model updates which are queued for the read-model consumer.
//!
//! Client protocol (JSON text frames):
//! - `{"action":"subscribe","topic":"vote-cast","filter":{"keys":["7"]}}`
//! - `{"action":"unsubscribe","topic":"vote-cast"}`
//! - `{"action":"ping"}`
//! - `{"action":"update","topic":"voting-response","payload":…}`

pub mod error;
pub mod publisher;
pub mod server;
pub mod subscriptions;

pub use error::WsError;
pub use publisher::WsPublisher;
pub use server::{router, WebSocketServer, WsState};
pub use subscriptions::{ClientMessage, ClientSubscriptions, ServerMessage, SubscriptionFilter};
