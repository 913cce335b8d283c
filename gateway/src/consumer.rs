//! The read-model consumer task.

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use votegate_rpc::GatewayMetrics;
use votegate_sessions::{ReadModelSync, ReadModelUpdate};

/// Drains the inbound update queue into [`ReadModelSync`], one update at a
/// time. Each update is merged as a single locked operation, so shutdown
/// never leaves one half-applied.
pub struct SyncConsumer {
    sync: ReadModelSync,
    metrics: Arc<GatewayMetrics>,
}

impl SyncConsumer {
    pub fn new(sync: ReadModelSync, metrics: Arc<GatewayMetrics>) -> Self {
        Self { sync, metrics }
    }

    /// Apply one update. Returns whether it was merged.
    pub async fn handle(&self, update: ReadModelUpdate) -> bool {
        let kind = update.kind();
        match self.sync.apply(update).await {
            Ok(_) => {
                self.metrics.sync_updates.inc();
                self.metrics
                    .session_count
                    .set(self.sync.store().session_count().await as i64);
                true
            }
            Err(e) => {
                warn!(kind, error = %e, "read-model update ignored");
                false
            }
        }
    }

    pub fn spawn(
        self,
        mut updates: mpsc::Receiver<ReadModelUpdate>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        info!("read-model consumer shutting down");
                        break;
                    }
                    update = updates.recv() => match update {
                        Some(update) => {
                            self.handle(update).await;
                        }
                        None => {
                            info!("read-model update queue closed");
                            break;
                        }
                    },
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use votegate_nullables::NullClock;
    use votegate_sessions::{DetailWaiters, SessionDetail, SessionStore, SnapshotPolicy};
    use votegate_types::{SessionId, Timestamp};

    fn consumer() -> (SyncConsumer, Arc<SessionStore>, Arc<GatewayMetrics>) {
        let store = Arc::new(SessionStore::new(Arc::new(NullClock::new(50))));
        let metrics = Arc::new(GatewayMetrics::new());
        let sync = ReadModelSync::new(
            store.clone(),
            Arc::new(DetailWaiters::new()),
            SnapshotPolicy::Preserve,
        );
        (SyncConsumer::new(sync, metrics.clone()), store, metrics)
    }

    fn detail(id: &str) -> ReadModelUpdate {
        ReadModelUpdate::SessionDetail(SessionDetail {
            id: SessionId::new(id),
            title: "t".into(),
            description: String::new(),
            creator: None,
            min_votes: 0,
            start_time: Timestamp::new(0),
            end_time: Timestamp::new(100),
            choices: Vec::new(),
        })
    }

    #[tokio::test]
    async fn counts_merged_updates_only() {
        let (consumer, store, metrics) = consumer();
        assert!(consumer.handle(detail("1")).await);
        assert!(!consumer.handle(detail("")).await);
        assert_eq!(metrics.sync_updates.get(), 1);
        assert_eq!(metrics.session_count.get(), 1);
        assert_eq!(store.session_count().await, 1);
    }

    #[tokio::test]
    async fn task_drains_queue_and_stops_on_shutdown() {
        let (consumer, store, _metrics) = consumer();
        let (tx, rx) = mpsc::channel(4);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = consumer.spawn(rx, shutdown_rx);

        tx.send(detail("7")).await.unwrap();
        for _ in 0..50 {
            if store.session_count().await == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(store.get_session(&SessionId::new("7")).await.is_ok());

        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
