//! HTTP/SSE gateway for the drafting pipeline.
//!
//! Every route delegates to one shared `PipelineEngine`; sessions live in the
//! engine's stores, so the gateway itself holds no per-session state.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | /health | Health check |
//! | POST | /api/generate | Start or resubmit a session (SSE) |
//! | POST | /api/resume | Resume a session paused for review (SSE) |
//! | GET | /api/sessions/{id} | Latest checkpoint |
//! | GET | /api/download/{id} | Rendered document |
//!
//! # Usage
//!
//! ```bash
//! docflow-cli --server --port 4001
//! ```
//!
//! # Feature Flag
//!
//! This module is only available when the `server` feature is enabled.

mod handlers;
pub mod types;

pub use handlers::{error_response, AppState};
pub use types::{ErrorResponse, HealthResponse, SessionResponse};

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::pipeline::PipelineEngine;

/// Start the HTTP server.
///
/// # Arguments
///
/// * `port` - Port to listen on. Use 0 for a random available port.
/// * `engine` - Engine shared by all requests
///
/// # Returns
///
/// The bound address (useful when port=0) and a cancellation token that
/// triggers graceful shutdown.
pub async fn start_server(
    port: u16,
    engine: Arc<PipelineEngine>,
) -> anyhow::Result<(SocketAddr, CancellationToken)> {
    let (state, shutdown_token) = AppState::new(engine);

    let app = create_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("HTTP server listening on {}", actual_addr);

    let server_shutdown = shutdown_token.clone();
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(server_shutdown.cancelled_owned())
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_token))
}

/// Create the router with all routes configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/generate", post(handlers::generate))
        .route("/api/resume", post(handlers::resume))
        .route("/api/sessions/{session_id}", get(handlers::get_session))
        .route("/api/download/{session_id}", get(handlers::download))
        .with_state(state)
}
