//! Settings schema definitions for docflow configuration.
//!
//! All settings structs use `#[serde(default)]` to allow partial configuration files.
//! Missing fields are filled with sensible defaults.

use serde::{Deserialize, Serialize};

use crate::pipeline::engine::{
    DEFAULT_DOCUMENT_TYPE, DEFAULT_EXPORT_TIMEOUT_SECS, DEFAULT_MAX_REVISIONS, DEFAULT_TOP_K,
};

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.siliconflow.cn/v1";
/// Default completion model.
pub const DEFAULT_MODEL: &str = "Qwen/Qwen3-8B";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_PORT: u16 = 4001;

/// Root settings structure.
///
/// Loaded from `~/.docflow/settings.toml` with environment variable interpolation support.
/// Version field enables future migrations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocflowSettings {
    /// Schema version for migrations
    pub version: u32,

    /// Completion endpoint configuration
    pub llm: LlmSettings,

    /// Pipeline tunables
    pub pipeline: PipelineSettings,

    /// Citation corpus location
    pub corpus: CorpusSettings,

    /// HTTP gateway settings
    pub server: ServerSettings,
}

/// Completion endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Base URL of an OpenAI-compatible API (supports $ENV_VAR syntax)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// API key (supports $ENV_VAR syntax)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    pub max_tokens: u32,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub top_k: usize,
    pub max_revisions: u32,
    pub export_timeout_secs: u64,
    pub default_document_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CorpusSettings {
    /// Directory of `.md`/`.txt` source files (supports $ENV_VAR syntax)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,
}

impl Default for DocflowSettings {
    fn default() -> Self {
        Self {
            version: 1,
            llm: LlmSettings::default(),
            pipeline: PipelineSettings::default(),
            corpus: CorpusSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            model: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            request_timeout_secs: 120,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            max_revisions: DEFAULT_MAX_REVISIONS,
            export_timeout_secs: DEFAULT_EXPORT_TIMEOUT_SECS,
            default_document_type: DEFAULT_DOCUMENT_TYPE.to_string(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

impl PipelineSettings {
    /// Engine configuration derived from these settings.
    pub fn engine_config(&self) -> crate::pipeline::EngineConfig {
        crate::pipeline::EngineConfig {
            top_k: self.top_k,
            max_revisions: self.max_revisions,
            export_timeout: std::time::Duration::from_secs(self.export_timeout_secs),
            default_document_type: self.default_document_type.clone(),
        }
    }
}
