//! HTTP server for the rating API, health probes and Prometheus metrics
//!
//! Routes are served with Axum; shutdown is driven through a broadcast
//! channel so the binary can stop the server from its signal handler.

use crate::http::handlers::{
    alive_handler, create_session_handler, faction_detail_handler, factions_handler,
    get_scores_handler, health_handler, history_handler, metrics_handler, ready_handler,
    root_handler, stats_handler, submit_scores_handler,
};
use crate::service::app::AppState;
use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Server bind configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to
    pub port: u16,
    /// Host to bind to (typically "0.0.0.0" for all interfaces)
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
        }
    }
}

/// Build the router serving every endpoint over the given state
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/factions", get(factions_handler))
        .route("/sessions", post(create_session_handler))
        .route(
            "/users/{user_id}/scores",
            get(get_scores_handler).put(submit_scores_handler),
        )
        .route("/users/{user_id}/history", get(history_handler))
        .route("/stats", get(stats_handler))
        .route("/stats/{faction}", get(faction_detail_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/alive", get(alive_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// HTTP server exposing the rating service
pub struct RatingServer {
    config: ServerConfig,
    state: Arc<AppState>,
    shutdown_tx: broadcast::Sender<()>,
}

impl RatingServer {
    pub fn new(config: ServerConfig, state: Arc<AppState>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            state,
            shutdown_tx,
        }
    }

    /// Bind and serve until `stop` is called
    pub async fn start(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .context("Invalid HTTP server address")?;

        let app = self.create_router();
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind HTTP server to {}", addr))?;

        info!("HTTP server listening on http://{}", addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("HTTP server shutdown signal received");
            })
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }

    fn create_router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Signal the serving task to shut down gracefully
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping HTTP server...");

        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("Failed to send shutdown signal to HTTP server: {}", e);
        }

        Ok(())
    }
}
