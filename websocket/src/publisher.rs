use std::sync::Arc;
use tracing::trace;
use votegate_messages::{DomainEvent, Envelope, EventPublisher, PublishError};
use votegate_types::Clock;

use crate::server::WsState;

/// Publishes domain events to WebSocket subscribers.
pub struct WsPublisher {
    state: Arc<WsState>,
    clock: Arc<dyn Clock>,
}

impl WsPublisher {
    pub fn new(state: Arc<WsState>, clock: Arc<dyn Clock>) -> Self {
        Self { state, clock }
    }
}

impl EventPublisher for WsPublisher {
    fn publish(&self, event: &DomainEvent) -> Result<(), PublishError> {
        let envelope = Envelope::wrap(event, self.clock.now())?;
        let receivers = self.state.publish_envelope(&envelope)?;
        trace!(topic = %envelope.topic, receivers, "event published");
        Ok(())
    }
}
