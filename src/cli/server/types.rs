//! Request/Response types for the HTTP gateway.
//!
//! Pipeline request bodies (`GenerateRequest`, `ResumeRequest`) live with the
//! engine and are re-exported here; this module adds the gateway-only shapes.

use serde::{Deserialize, Serialize};

use crate::error::DocflowError;
use crate::pipeline::{Checkpoint, SessionState, Stage};

pub use crate::pipeline::{GenerateRequest, ResumeRequest};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// Server status (always "ok" when healthy)
    pub status: String,
    /// Server version from Cargo.toml
    pub version: String,
}

impl HealthResponse {
    /// Create a healthy response with the current package version
    pub fn healthy() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Latest checkpoint of a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: String,
    pub last_stage: Stage,
    /// True while the session waits for a resume call
    pub awaiting_review: bool,
    /// True while a run is executing for this session
    pub running: bool,
    /// Checkpoint time in RFC 3339 format
    pub updated_at: String,
    pub state: SessionState,
}

impl SessionResponse {
    pub fn from_checkpoint(checkpoint: Checkpoint, running: bool) -> Self {
        Self {
            session_id: checkpoint.state.session_id.clone(),
            last_stage: checkpoint.last_stage,
            awaiting_review: checkpoint.is_paused(),
            running,
            updated_at: checkpoint.updated_at.to_rfc3339(),
            state: checkpoint.state,
        }
    }
}

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code for programmatic handling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorResponse {
    /// Create an error response with just a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: None,
        }
    }

    /// Create an error response with a message and code
    pub fn with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: Some(code.into()),
        }
    }
}

impl From<&DocflowError> for ErrorResponse {
    fn from(err: &DocflowError) -> Self {
        Self::with_code(err.to_string(), err.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod health_response_tests {
        use super::*;

        #[test]
        fn healthy_returns_ok_status() {
            let resp = HealthResponse::healthy();
            assert_eq!(resp.status, "ok");
        }

        #[test]
        fn healthy_includes_version() {
            let resp = HealthResponse::healthy();
            assert_eq!(resp.version, env!("CARGO_PKG_VERSION"));
        }
    }

    mod session_response_tests {
        use super::*;

        #[test]
        fn from_paused_checkpoint() {
            let state = SessionState::new("s-1", "raw", None);
            let resp =
                SessionResponse::from_checkpoint(Checkpoint::new(state, Stage::HumanReview), false);
            assert_eq!(resp.session_id, "s-1");
            assert!(resp.awaiting_review);
            assert!(!resp.running);

            let json = serde_json::to_value(&resp).unwrap();
            assert_eq!(json["lastStage"], "human_review");
            assert_eq!(json["awaitingReview"], true);
            assert_eq!(json["state"]["rawInput"], "raw");
        }
    }

    mod error_response_tests {
        use super::*;

        #[test]
        fn new_omits_code() {
            let json = serde_json::to_value(ErrorResponse::new("oops")).unwrap();
            assert_eq!(json, serde_json::json!({"error": "oops"}));
        }

        #[test]
        fn from_docflow_error_carries_code() {
            let resp = ErrorResponse::from(&DocflowError::SessionBusy("s-1".into()));
            assert_eq!(resp.code.as_deref(), Some("SESSION_BUSY"));
            assert!(resp.error.contains("s-1"));
        }
    }
}
