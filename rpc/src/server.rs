//! Axum-based HTTP server.

use axum::http::{header::CONTENT_TYPE, Method};
use axum::routing::{get, post};
use axum::Router;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers;
use crate::service::VotingService;

/// A bound HTTP server.
pub struct RpcServer {
    listener: TcpListener,
    service: Arc<VotingService>,
}

impl RpcServer {
    /// Bind `addr`; port 0 picks a free port.
    pub async fn bind(addr: SocketAddr, service: Arc<VotingService>) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, service })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve the API until `shutdown_rx` fires. In-flight requests are
    /// allowed to finish.
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> io::Result<()> {
        info!(addr = ?self.listener.local_addr().ok(), "HTTP API listening");
        axum::serve(self.listener, router(self.service))
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;
        info!("HTTP API stopped");
        Ok(())
    }
}

/// All routes, with CORS open to the web front end.
pub fn router(service: Arc<VotingService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route(
            "/sessions",
            get(handlers::list_sessions).post(handlers::create_session),
        )
        .route("/sessions/:id", get(handlers::get_session))
        .route("/sessions/:id/votes", post(handlers::cast_vote))
        .route("/users/:identity/profile", post(handlers::user_profile))
        .route("/wallets/connect", post(handlers::connect_wallet))
        .route("/staking/stake", post(handlers::stake))
        .route("/staking/unstake", post(handlers::unstake))
        .route("/staking/claim", post(handlers::claim))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(service)
}
