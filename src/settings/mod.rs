//! TOML-based settings for docflow.
//!
//! Settings are loaded from `~/.docflow/settings.toml` with environment variable
//! interpolation support. The `get_with_env_fallback` helper keeps the plain
//! environment variables (`API_KEY`, `SILICONFLOW_BASE_URL`, `LLM_MODEL`) working
//! when the file leaves a value unset.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::settings::{get_with_env_fallback, settings_path, SettingsManager};
//!
//! let manager = SettingsManager::with_path(settings_path()).await?;
//! let settings = manager.settings();
//!
//! let api_key = get_with_env_fallback(&settings.llm.api_key, &["API_KEY"], None);
//! ```

pub mod loader;
pub mod schema;

pub use loader::{get_with_env_fallback, settings_path, SettingsManager};
pub use schema::{
    CorpusSettings, DocflowSettings, LlmSettings, PipelineSettings, ServerSettings, DEFAULT_PORT,
};
