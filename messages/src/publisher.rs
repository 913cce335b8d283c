//! The outbound broker boundary.

use tracing::debug;
use votegate_types::Timestamp;

use crate::error::PublishError;
use crate::events::{DomainEvent, Envelope};

/// Hands domain events to the broker.
///
/// Called only after the store lock is released; failures are reported to
/// the caller, who decides whether they matter.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: &DomainEvent) -> Result<(), PublishError>;
}

/// Publisher that only logs events. Used when no stream transport is
/// enabled.
#[derive(Debug, Default)]
pub struct TracingPublisher;

impl EventPublisher for TracingPublisher {
    fn publish(&self, event: &DomainEvent) -> Result<(), PublishError> {
        let envelope = Envelope::wrap(event, Timestamp::now())?;
        debug!(
            topic = %envelope.topic,
            key = envelope.key.as_deref().unwrap_or(""),
            event_type = %envelope.event_type,
            "domain event (no transport)"
        );
        Ok(())
    }
}
