//! Nullable publisher: record events without sending them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use votegate_messages::{DomainEvent, EventPublisher, PublishError};

/// A publisher that records events instead of sending them.
#[derive(Debug, Default)]
pub struct NullPublisher {
    published: Mutex<Vec<DomainEvent>>,
    failing: AtomicBool,
}

impl NullPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following publish fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All events published so far (for assertions).
    pub fn published(&self) -> Vec<DomainEvent> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Clear recorded events.
    pub fn reset(&self) {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl EventPublisher for NullPublisher {
    fn publish(&self, event: &DomainEvent) -> Result<(), PublishError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PublishError::Transport("null publisher set to fail".into()));
        }
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_until_set_failing() {
        let publisher = NullPublisher::new();
        publisher.publish(&DomainEvent::AllSessionsRequested).unwrap();
        publisher.set_failing(true);
        assert!(publisher.publish(&DomainEvent::AllSessionsRequested).is_err());
        assert_eq!(publisher.published(), vec![DomainEvent::AllSessionsRequested]);
        publisher.reset();
        assert!(publisher.published().is_empty());
    }
}
