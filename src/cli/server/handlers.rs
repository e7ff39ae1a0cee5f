//! HTTP request handlers for the docflow gateway.
//!
//! Generate and resume stream pipeline events as SSE; the remaining
//! endpoints read the session's checkpoint or rendered artifact.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
    response::{IntoResponse, Response},
    Json,
};
use futures::stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use super::types::*;
use crate::error::DocflowError;
use crate::pipeline::{event_stream, PipelineEngine, PipelineEvent, RunHandle};

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Application state shared across all handlers
pub struct AppState {
    pub engine: Arc<PipelineEngine>,
    /// Shutdown token for graceful server shutdown
    pub shutdown_token: CancellationToken,
}

impl AppState {
    pub fn new(engine: Arc<PipelineEngine>) -> (Arc<Self>, CancellationToken) {
        let shutdown_token = CancellationToken::new();
        let state = Arc::new(Self {
            engine,
            shutdown_token: shutdown_token.clone(),
        });
        (state, shutdown_token)
    }
}

/// Map an engine error onto a status code and JSON body.
pub fn error_response(err: DocflowError) -> ApiError {
    let status = match err {
        DocflowError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        DocflowError::SessionBusy(_) | DocflowError::NotAwaitingReview(_) => StatusCode::CONFLICT,
        DocflowError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    } else {
        tracing::debug!("Request rejected: {}", err);
    }
    (status, Json(ErrorResponse::from(&err)))
}

fn to_sse_event(event: &PipelineEvent) -> Event {
    let data = serde_json::to_string(&event.payload()).unwrap_or_else(|_| "{}".to_string());
    Event::default().event(event.tag()).data(data)
}

fn sse_response(handle: RunHandle) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = event_stream(handle.events).map(|event| Ok(to_sse_event(&event)));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Health check endpoint.
///
/// # Example Response
///
/// ```json
/// {
///   "status": "ok",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Start or resubmit a session and stream its events.
///
/// # Request Body
///
/// ```json
/// {
///   "rawInput": "Unpermitted sand mining on the east bank...",
///   "documentType": "Notice of Deadline for Payment",  // optional
///   "sessionId": "abc"                                 // optional
/// }
/// ```
///
/// # Response
///
/// - `200 OK`: SSE stream ending with `done` or `error`
/// - `409 Conflict`: A run is already executing for the session
///
/// # SSE Events
///
/// ```text
/// event: node_start
/// data: {"sessionId":"abc","stageName":"draft","state":{...}}
///
/// event: done
/// data: {"sessionId":"abc","stageName":"human_review"}
/// ```
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let handle = state.engine.generate(req).await.map_err(error_response)?;
    tracing::info!(session_id = %handle.session_id, "Streaming generate run");
    Ok(sse_response(handle))
}

/// Resume a session paused at human review.
///
/// # Request Body
///
/// ```json
/// {
///   "sessionId": "abc",
///   "approved": false,
///   "documentContent": "Edited draft"  // optional, used when not approved
/// }
/// ```
///
/// # Response
///
/// - `200 OK`: SSE stream of the export run
/// - `404 Not Found`: Unknown session
/// - `409 Conflict`: Session busy or not waiting for review
/// - `4xx`: Body missing `sessionId`
pub async fn resume(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResumeRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let handle = state.engine.resume(req).await.map_err(error_response)?;
    tracing::info!(session_id = %handle.session_id, "Streaming resume run");
    Ok(sse_response(handle))
}

/// Latest checkpoint for a session.
///
/// # Response
///
/// - `200 OK`: Session found
/// - `404 Not Found`: Session does not exist
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let checkpoint = state
        .engine
        .checkpoint(&session_id)
        .await
        .map_err(error_response)?;
    let running = state.engine.is_running(&session_id);
    Ok(Json(SessionResponse::from_checkpoint(checkpoint, running)))
}

/// Rendered document for a session.
///
/// # Response
///
/// - `200 OK`: Artifact bytes with its content type
/// - `404 Not Found`: Nothing exported for the session
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Response, ApiError> {
    let artifact = state
        .engine
        .artifact(&session_id)
        .await
        .map_err(error_response)?;

    let disposition = format!("attachment; filename=\"{}\"", artifact.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, artifact.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.bytes,
    )
        .into_response())
}
