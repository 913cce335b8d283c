//! Periodic status sweep.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::store::SessionStore;

/// Result of one sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SweepReport {
    pub sessions: usize,
    pub changed: usize,
    pub elapsed: Duration,
}

/// Callback invoked after each sweep.
pub type SweepObserver = Arc<dyn Fn(&SweepReport) + Send + Sync>;

/// Recomputes every session's status on a fixed interval so that sessions
/// nobody reads still move through their lifecycle.
pub struct StatusScheduler {
    store: Arc<SessionStore>,
    period: Duration,
    observer: Option<SweepObserver>,
}

impl StatusScheduler {
    pub fn new(store: Arc<SessionStore>, period: Duration) -> Self {
        Self {
            store,
            period,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: SweepObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Run one sweep immediately.
    pub async fn sweep(&self) -> SweepReport {
        let started = Instant::now();
        let (sessions, changed) = self.store.refresh_all().await;
        let report = SweepReport {
            sessions,
            changed,
            elapsed: started.elapsed(),
        };
        if let Some(observer) = &self.observer {
            observer(&report);
        }
        report
    }

    /// Sweep every period until `shutdown_rx` fires.
    pub fn spawn(self, mut shutdown_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        tracing::info!("status scheduler shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        let report = self.sweep().await;
                        if report.changed > 0 {
                            tracing::info!(
                                sessions = report.sessions,
                                changed = report.changed,
                                "status sweep updated sessions"
                            );
                        } else {
                            tracing::trace!(sessions = report.sessions, "status sweep");
                        }
                    }
                }
            }
        })
    }
}
