//! Graceful shutdown controller.
//!
//! Listens for SIGINT/SIGTERM and broadcasts a shutdown signal to every
//! background task via a `tokio::sync::broadcast` channel.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Why shutdown was triggered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownReason {
    Interrupt,
    Terminate,
    Requested,
}

/// Coordinates graceful shutdown across the gateway's tasks.
///
/// Tasks call [`subscribe`](Self::subscribe) to get a receiver, then
/// `select!` on it alongside their main loop. When shutdown is triggered
/// (by OS signal or programmatically) every receiver is notified.
pub struct ShutdownController {
    tx: broadcast::Sender<()>,
    triggered: AtomicBool,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            triggered: AtomicBool::new(false),
        }
    }

    /// Get a receiver that will be notified on shutdown.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger shutdown. Returns how many receivers were notified.
    pub fn shutdown(&self) -> usize {
        self.triggered.store(true, Ordering::SeqCst);
        self.tx.send(()).unwrap_or(0)
    }

    pub fn is_shutdown(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Wait for SIGTERM, SIGINT or a programmatic shutdown, then notify
    /// every subscriber.
    pub async fn wait_for_signal(&self) -> ShutdownReason {
        let mut requested = self.subscribe();
        if self.is_shutdown() {
            return ShutdownReason::Requested;
        }

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        let reason = tokio::select! {
            _ = signal::ctrl_c() => {
                info!("received SIGINT, shutting down");
                ShutdownReason::Interrupt
            }
            _ = terminate => {
                info!("received SIGTERM, shutting down");
                ShutdownReason::Terminate
            }
            _ = requested.recv() => ShutdownReason::Requested,
        };

        if reason != ShutdownReason::Requested {
            self.shutdown();
        }
        reason
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn programmatic_shutdown_notifies_subscribers() {
        let controller = ShutdownController::new();
        let mut rx = controller.subscribe();
        assert!(!controller.is_shutdown());
        assert_eq!(controller.shutdown(), 1);
        assert!(rx.recv().await.is_ok());
        assert!(controller.is_shutdown());
    }

    #[tokio::test]
    async fn multiple_subscribers_all_notified() {
        let controller = ShutdownController::new();
        let mut rx1 = controller.subscribe();
        let mut rx2 = controller.subscribe();
        controller.shutdown();
        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }

    #[tokio::test]
    async fn signal_wait_ends_on_programmatic_shutdown() {
        let controller = Arc::new(ShutdownController::new());
        let waiter = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.wait_for_signal().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        controller.shutdown();
        let reason = tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reason, ShutdownReason::Requested);
    }
}
