//! Event-stream messages for the votegate gateway.
//!
//! Outbound: [`DomainEvent`]s wrapped in an [`Envelope`] and handed to an
//! [`EventPublisher`]. Inbound: indexer payloads decoded by
//! [`decode_update`] into core read-model updates.

pub mod codec;
pub mod error;
pub mod events;
pub mod inbound;
pub mod publisher;
pub mod topics;

pub use codec::{decode_update, decode_update_value};
pub use error::{CodecError, PublishError};
pub use events::{
    CreatedOption, DomainEvent, Envelope, HistoryRequest, SessionCreated, SessionRequest, UserRef,
    VoteCast,
};
pub use publisher::{EventPublisher, TracingPublisher};
pub use topics::Topic;
