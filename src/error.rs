use thiserror::Error;

use crate::pipeline::Stage;

#[derive(Debug, Error)]
pub enum DocflowError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Session is already running: {0}")]
    SessionBusy(String),

    #[error("Session {0} is not waiting for human review")]
    NotAwaitingReview(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Stage {stage} failed: {source:#}")]
    Stage {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DocflowError {
    /// Stable code for programmatic handling by gateway clients.
    pub fn code(&self) -> &'static str {
        match self {
            DocflowError::SessionNotFound(_) => "SESSION_NOT_FOUND",
            DocflowError::SessionBusy(_) => "SESSION_BUSY",
            DocflowError::NotAwaitingReview(_) => "NOT_AWAITING_REVIEW",
            DocflowError::InvalidRequest(_) => "INVALID_REQUEST",
            DocflowError::Stage { .. } => "STAGE_FAILED",
            DocflowError::Checkpoint(_) => "CHECKPOINT_FAILED",
            DocflowError::Internal(_) => "INTERNAL",
        }
    }
}

pub type Result<T> = std::result::Result<T, DocflowError>;
