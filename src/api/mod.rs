//! HTTP API layer - axum router, shared state and server loop.
//!
//! Handlers translate requests into calls on [`crate::core`] and wrap every answer in
//! the [`response::ApiResponse`] envelope.

/// Request handlers for the scheduler and audit endpoints
pub mod handlers;
/// Response envelope and error-to-status mapping
pub mod response;

use crate::{config::SchedulerConfig, errors::Result};
use axum::{
    Router,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

/// Shared data available to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection for all database operations
    pub database: DatabaseConnection,
    /// Scheduler settings
    pub scheduler: Arc<SchedulerConfig>,
}

impl AppState {
    /// Creates a new `AppState` from a connection and scheduler settings.
    #[must_use]
    pub fn new(database: DatabaseConnection, scheduler: SchedulerConfig) -> Self {
        Self {
            database,
            scheduler: Arc::new(scheduler),
        }
    }
}

/// Builds the API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/assignments/scheduler/trigger",
            post(handlers::manual_trigger),
        )
        .route(
            "/api/assignments/scheduler/auto-close",
            post(handlers::auto_close),
        )
        .route("/api/assignments/scheduler/status", get(handlers::status))
        .route("/api/assignments/scheduler/stats", get(handlers::stats))
        .route(
            "/api/assignments/logs/:assignment_id",
            get(handlers::assignment_logs),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serves the API on `addr` until Ctrl-C is received.
pub async fn run_server(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .inspect_err(|e| error!(addr = %addr, error = %e, "Failed to bind API server"))?;
    info!(addr = %addr, "Starting API server");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
