//! Chat-completions client for OpenAI-compatible endpoints.
//!
//! Defaults target SiliconFlow. Any endpoint that accepts
//! `POST {base_url}/chat/completions` with Bearer auth works.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;

use crate::pipeline::{ChatMessage, CompletionClient};
use crate::settings::schema::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::settings::{get_with_env_fallback, LlmSettings};

/// Environment variables consulted for each value when settings leave it unset.
pub const API_KEY_ENV: &[&str] = &["API_KEY", "SILICONFLOW_API_KEY"];
pub const BASE_URL_ENV: &[&str] = &["SILICONFLOW_BASE_URL"];
pub const MODEL_ENV: &[&str] = &["LLM_MODEL"];

pub struct ChatCompletionsClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl ChatCompletionsClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            max_tokens,
        })
    }

    /// Build a client from settings, falling back to environment variables.
    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        let api_key = get_with_env_fallback(&settings.api_key, API_KEY_ENV, None)
            .context("Completion API key not configured (set llm.api_key or API_KEY)")?;
        let base_url = get_with_env_fallback(
            &settings.base_url,
            BASE_URL_ENV,
            Some(DEFAULT_BASE_URL.to_string()),
        )
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = get_with_env_fallback(&settings.model, MODEL_ENV, Some(DEFAULT_MODEL.to_string()))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Self::new(
            api_key,
            base_url,
            model,
            settings.max_tokens,
            Duration::from_secs(settings.request_timeout_secs),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request_body(&self, messages: &[ChatMessage]) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": self.max_tokens,
        })
    }
}

/// First choice's message text, verbatim. A success body without one reads
/// as an empty completion.
fn extract_content(body: &serde_json::Value) -> String {
    match body["choices"][0]["message"]["content"].as_str() {
        Some(content) => content.to_string(),
        None => {
            tracing::warn!("Completion response carried no message content");
            String::new()
        }
    }
}

#[async_trait]
impl CompletionClient for ChatCompletionsClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        tracing::debug!(
            model = %self.model,
            messages = messages.len(),
            "Sending chat completion request"
        );

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.request_body(messages))
            .send()
            .await
            .context("Failed to send request to completion API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Completion API error ({}): {}", status, body);
        }

        let body: serde_json::Value = response
            .json()
            .await
            .context("Failed to decode completion response")?;
        Ok(extract_content(&body))
    }

    fn description(&self) -> String {
        format!("{} via {}", self.model, self.base_url)
    }
}
