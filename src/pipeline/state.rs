//! Session state for the drafting pipeline.
//!
//! `SessionState` is the full record the engine checkpoints after every
//! stage. Stages never mutate it directly; they return a `StateDelta` that
//! the engine applies and the publisher merges into its running snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Idle,
    Drafting,
    Reviewing,
    Completed,
}

/// A reference to a corpus line used as supporting evidence.
///
/// Two citations are the same candidate when `source_title` and
/// `article_text` match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub source_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_number: Option<u32>,
    pub article_text: String,
}

impl Citation {
    pub fn new(source_title: impl Into<String>, article_text: impl Into<String>) -> Self {
        Self {
            source_title: source_title.into(),
            article_number: None,
            article_text: article_text.into(),
        }
    }

    pub fn with_article_number(mut self, number: u32) -> Self {
        self.article_number = Some(number);
        self
    }

    /// Key used for deduplication.
    pub fn key(&self) -> (&str, &str) {
        (&self.source_title, &self.article_text)
    }
}

/// Structured fields pulled out of the raw input by the completion model.
pub type ExtractedFields = BTreeMap<String, String>;

/// Full state of one drafting session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub session_id: String,
    pub raw_input: String,
    pub document_content: String,
    pub citations: Vec<Citation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_fields: Option<ExtractedFields>,
    pub status: SessionStatus,
    pub revision_count: u32,
    /// `false` is the canonical "unset" value.
    #[serde(default)]
    pub needs_human_review: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_reason: Option<String>,
}

impl SessionState {
    /// Create a fresh session in the `idle` status.
    pub fn new(
        session_id: impl Into<String>,
        raw_input: impl Into<String>,
        document_type: Option<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            raw_input: raw_input.into(),
            document_type,
            ..Default::default()
        }
    }

    /// Apply a stage delta, overwriting exactly the fields it carries.
    pub fn apply(&mut self, delta: &StateDelta) {
        if let Some(ref content) = delta.document_content {
            self.document_content = content.clone();
        }
        if let Some(ref citations) = delta.citations {
            self.citations = citations.clone();
        }
        if let Some(ref fields) = delta.extracted_fields {
            self.extracted_fields = Some(fields.clone());
        }
        if let Some(status) = delta.status {
            self.status = status;
        }
        if let Some(count) = delta.revision_count {
            self.revision_count = count;
        }
        if let Some(flag) = delta.needs_human_review {
            self.needs_human_review = flag;
        }
        if let Some(ref reason) = delta.review_reason {
            self.review_reason = Some(reason.clone());
        }
    }

    /// Serialize to a JSON object for event payloads.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }
}

/// Partial update produced by a stage.
///
/// Identity fields (`sessionId`, `rawInput`, `documentType`) are absent on
/// purpose: stages cannot change them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_fields: Option<ExtractedFields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SessionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub needs_human_review: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_reason: Option<String>,
}

impl StateDelta {
    pub fn status(status: SessionStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }
}
