//! Gateway assembly and lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use votegate_chain::LedgerClient;
use votegate_messages::{EventPublisher, TracingPublisher};
use votegate_rpc::{GatewayMetrics, RpcServer, VotingService};
use votegate_sessions::{
    DetailWaiters, ReadModelSync, ReadModelUpdate, SessionStore, StatusScheduler, SweepObserver,
    SweepReport,
};
use votegate_types::Clock;
use votegate_utils::format_duration;
use votegate_websocket::{WebSocketServer, WsPublisher, WsState};

use crate::config::GatewayConfig;
use crate::consumer::SyncConsumer;
use crate::error::GatewayError;
use crate::shutdown::ShutdownController;

/// The running gateway: one session store shared by the HTTP API, the
/// status scheduler and the read-model consumer.
pub struct Gateway {
    config: GatewayConfig,
    store: Arc<SessionStore>,
    service: Arc<VotingService>,
    ws_state: Arc<WsState>,
    waiters: Arc<DetailWaiters>,
    metrics: Arc<GatewayMetrics>,
    /// Taken by `start`.
    updates_rx: Option<mpsc::Receiver<ReadModelUpdate>>,
    pub shutdown: Arc<ShutdownController>,
    task_handles: Vec<JoinHandle<()>>,
    http_addr: Option<SocketAddr>,
    websocket_addr: Option<SocketAddr>,
}

impl Gateway {
    /// Assemble the gateway. Nothing runs until [`start`](Self::start).
    ///
    /// Events go to WebSocket subscribers when the bridge is enabled and
    /// are only logged otherwise.
    pub fn new(
        config: GatewayConfig,
        clock: Arc<dyn Clock>,
        ledger: Arc<dyn LedgerClient>,
    ) -> Result<Self, GatewayError> {
        config.validate()?;

        let store = Arc::new(SessionStore::new(clock.clone()));
        let (ws_state, updates_rx) = WsState::new(config.event_channel_capacity);
        let ws_state = Arc::new(ws_state);
        let publisher: Arc<dyn EventPublisher> = if config.enable_websocket {
            Arc::new(WsPublisher::new(ws_state.clone(), clock))
        } else {
            Arc::new(TracingPublisher)
        };
        let waiters = Arc::new(DetailWaiters::new());
        let metrics = Arc::new(GatewayMetrics::new());
        let service = Arc::new(VotingService::new(
            store.clone(),
            ledger,
            publisher,
            waiters.clone(),
            metrics.clone(),
            config.service_settings(),
        ));

        Ok(Self {
            config,
            store,
            service,
            ws_state,
            waiters,
            metrics,
            updates_rx: Some(updates_rx),
            shutdown: Arc::new(ShutdownController::new()),
            task_handles: Vec::new(),
            http_addr: None,
            websocket_addr: None,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn service(&self) -> &Arc<VotingService> {
        &self.service
    }

    pub fn metrics(&self) -> &Arc<GatewayMetrics> {
        &self.metrics
    }

    pub fn ws_state(&self) -> &Arc<WsState> {
        &self.ws_state
    }

    /// Address the HTTP API is bound to, once started.
    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.http_addr
    }

    pub fn websocket_addr(&self) -> Option<SocketAddr> {
        self.websocket_addr
    }

    /// Bind the listeners and spawn every background task.
    ///
    /// Listeners are bound before anything is spawned, so a port conflict
    /// fails startup cleanly.
    pub async fn start(&mut self) -> Result<(), GatewayError> {
        let updates = self.updates_rx.take().ok_or(GatewayError::AlreadyStarted)?;

        let http = RpcServer::bind(self.config.http_addr(), self.service.clone()).await?;
        self.http_addr = Some(http.local_addr()?);
        let websocket = if self.config.enable_websocket {
            let server = WebSocketServer::bind(self.config.websocket_addr(), self.ws_state.clone()).await?;
            self.websocket_addr = Some(server.local_addr()?);
            Some(server)
        } else {
            None
        };

        // ── Status scheduler ────────────────────────────────────────────
        let metrics = self.metrics.clone();
        let observer: SweepObserver = Arc::new(move |report: &SweepReport| {
            metrics
                .status_sweep_ms
                .observe(report.elapsed.as_secs_f64() * 1000.0);
            metrics.session_count.set(report.sessions as i64);
        });
        let scheduler = StatusScheduler::new(self.store.clone(), self.config.status_refresh())
            .with_observer(observer);
        self.task_handles
            .push(scheduler.spawn(self.shutdown.subscribe()));

        // ── Read-model consumer ─────────────────────────────────────────
        let sync = ReadModelSync::new(
            self.store.clone(),
            self.waiters.clone(),
            self.config.snapshot_policy,
        );
        self.task_handles.push(
            SyncConsumer::new(sync, self.metrics.clone()).spawn(updates, self.shutdown.subscribe()),
        );

        // ── HTTP API ────────────────────────────────────────────────────
        let shutdown_rx = self.shutdown.subscribe();
        self.task_handles.push(tokio::spawn(async move {
            if let Err(e) = http.run(shutdown_rx).await {
                error!(error = %e, "HTTP API failed");
            }
        }));

        // ── WebSocket bridge (optional) ─────────────────────────────────
        if let Some(server) = websocket {
            let shutdown_rx = self.shutdown.subscribe();
            self.task_handles.push(tokio::spawn(async move {
                if let Err(e) = server.run(shutdown_rx).await {
                    error!(error = %e, "WebSocket server failed");
                }
            }));
        }

        info!(
            env = %self.config.env,
            http = ?self.http_addr,
            websocket = ?self.websocket_addr,
            status_refresh = %format_duration(self.config.status_refresh()),
            snapshot_policy = ?self.config.snapshot_policy,
            "gateway started"
        );
        Ok(())
    }

    /// Signal every task and wait for them, up to the configured timeout.
    pub async fn stop(&mut self) -> Result<(), GatewayError> {
        info!("gateway stopping");
        self.shutdown.shutdown();

        let handles: Vec<JoinHandle<()>> = self.task_handles.drain(..).collect();
        let tasks = handles.len();
        let wait_all = async {
            for handle in handles {
                if let Err(e) = handle.await {
                    warn!(error = %e, "background task ended abnormally");
                }
            }
        };

        let timeout = self.config.shutdown_timeout();
        if tokio::time::timeout(timeout, wait_all).await.is_err() {
            warn!(
                timeout = %format_duration(timeout),
                "shutdown timeout, some tasks may still be running"
            );
            return Err(GatewayError::ShutdownTimeout(timeout));
        }

        info!(tasks, "gateway stopped");
        Ok(())
    }
}
