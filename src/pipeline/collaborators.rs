//! Collaborator traits consumed by the pipeline engine.
//!
//! The engine only sees these traits, so tests can substitute in-memory
//! fakes and the HTTP client or renderer can be swapped without touching
//! stage logic.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::state::SessionState;

/// Role tag for a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Text-completion collaborator.
///
/// Any error is fatal for the calling stage.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Complete an ordered list of role-tagged messages into one response.
    async fn complete(&self, messages: &[ChatMessage]) -> anyhow::Result<String>;

    /// Description for logging.
    fn description(&self) -> String {
        "completion client".to_string()
    }
}

/// A rendered document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub file_name: String,
}

/// Document-rendering collaborator used by the Export stage.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(&self, state: &SessionState) -> anyhow::Result<Artifact>;
}
