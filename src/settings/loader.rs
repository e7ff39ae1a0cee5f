//! Settings loading, saving, and environment variable interpolation.
//!
//! The `SettingsManager` handles:
//! - Loading settings from `~/.docflow/settings.toml` (or an explicit path)
//! - Resolving `$VAR` and `${VAR}` environment variable references
//! - First-run template generation

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use super::schema::DocflowSettings;

/// Embedded template for first-run generation.
const TEMPLATE: &str = include_str!("template.toml");

/// Get the path to the global settings file.
pub fn settings_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".docflow")
        .join("settings.toml")
}

/// Loads settings from one file and holds the resolved result.
pub struct SettingsManager {
    /// Settings with env vars resolved
    settings: DocflowSettings,

    /// Path to the settings file
    path: PathBuf,
}

impl SettingsManager {
    /// Create a SettingsManager backed by a specific file.
    ///
    /// A missing file yields default settings.
    pub async fn with_path(path: PathBuf) -> Result<Self> {
        let settings = Self::load_from_path(&path).await?;
        Ok(Self { settings, path })
    }

    async fn load_from_path(path: &Path) -> Result<DocflowSettings> {
        if !path.exists() {
            tracing::debug!("Settings file not found at {:?}, using defaults", path);
            return Ok(DocflowSettings::default());
        }

        let contents = tokio::fs::read_to_string(path)
            .await
            .context("Failed to read settings file")?;

        let mut settings: DocflowSettings =
            toml::from_str(&contents).context("Failed to deserialize settings")?;

        Self::resolve_env_vars(&mut settings);

        tracing::info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Resolve $ENV_VAR references in string fields.
    fn resolve_env_vars(settings: &mut DocflowSettings) {
        fn resolve_opt(value: &mut Option<String>) {
            if let Some(v) = value {
                if let Some(resolved) = resolve_env_ref(v) {
                    *v = resolved;
                }
            }
        }

        resolve_opt(&mut settings.llm.base_url);
        resolve_opt(&mut settings.llm.api_key);
        resolve_opt(&mut settings.llm.model);
        resolve_opt(&mut settings.corpus.dir);
    }

    pub fn settings(&self) -> &DocflowSettings {
        &self.settings
    }

    pub fn into_settings(self) -> DocflowSettings {
        self.settings
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the commented template if no settings file exists yet.
    ///
    /// Returns `true` if a new file was created.
    pub async fn ensure_settings_file(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&self.path, TEMPLATE).await?;
        tracing::info!("Generated settings template at {:?}", self.path);
        Ok(true)
    }
}

/// Resolve a $ENV_VAR or ${ENV_VAR} reference.
///
/// Returns `Some(resolved)` if the value starts with `$` and the env var exists.
/// Returns `None` if no env var reference or env var not set.
fn resolve_env_ref(value: &str) -> Option<String> {
    let trimmed = value.trim();
    let reference = trimmed.strip_prefix('$')?;

    let var_name = reference
        .strip_prefix('{')
        .and_then(|r| r.strip_suffix('}'))
        .unwrap_or(reference);

    std::env::var(var_name).ok()
}

/// Get a setting value with environment variable fallback.
///
/// Priority order:
/// 1. Settings value (if set and non-empty)
/// 2. Environment variable (first match from list)
/// 3. Default value
pub fn get_with_env_fallback(
    setting: &Option<String>,
    env_vars: &[&str],
    default: Option<String>,
) -> Option<String> {
    if let Some(v) = setting {
        if !v.is_empty() {
            return Some(v.clone());
        }
    }

    for env_var in env_vars {
        if let Ok(v) = std::env::var(env_var) {
            if !v.is_empty() {
                return Some(v);
            }
        }
    }

    default
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_env_ref_dollar_format() {
        std::env::set_var("DOCFLOW_TEST_VAR_1", "test_value_1");

        assert_eq!(
            resolve_env_ref("$DOCFLOW_TEST_VAR_1"),
            Some("test_value_1".to_string())
        );

        std::env::remove_var("DOCFLOW_TEST_VAR_1");
    }

    #[test]
    fn test_resolve_env_ref_braces_format() {
        std::env::set_var("DOCFLOW_TEST_VAR_2", "test_value_2");

        assert_eq!(
            resolve_env_ref("${DOCFLOW_TEST_VAR_2}"),
            Some("test_value_2".to_string())
        );

        std::env::remove_var("DOCFLOW_TEST_VAR_2");
    }

    #[test]
    fn test_resolve_env_ref_no_match() {
        assert_eq!(resolve_env_ref("regular_value"), None);
        assert_eq!(resolve_env_ref("$NONEXISTENT_VAR_XYZ_12345"), None);
    }

    #[test]
    fn test_get_with_env_fallback_from_setting() {
        let setting = Some("from_settings".to_string());
        let result = get_with_env_fallback(&setting, &["SOME_VAR"], None);
        assert_eq!(result, Some("from_settings".to_string()));
    }

    #[test]
    fn test_get_with_env_fallback_from_env() {
        std::env::set_var("DOCFLOW_FALLBACK_TEST_VAR", "from_env");

        let result = get_with_env_fallback(&None, &["DOCFLOW_FALLBACK_TEST_VAR"], None);
        assert_eq!(result, Some("from_env".to_string()));

        std::env::remove_var("DOCFLOW_FALLBACK_TEST_VAR");
    }

    #[test]
    fn test_get_with_env_fallback_default() {
        let result = get_with_env_fallback(
            &None,
            &["NONEXISTENT_VAR_ABC"],
            Some("default_value".to_string()),
        );
        assert_eq!(result, Some("default_value".to_string()));
    }

    #[test]
    fn test_get_with_env_fallback_empty_setting() {
        std::env::set_var("DOCFLOW_EMPTY_SETTING_TEST", "from_env");

        // Empty string in setting should fall through to env var
        let setting = Some("".to_string());
        let result = get_with_env_fallback(&setting, &["DOCFLOW_EMPTY_SETTING_TEST"], None);
        assert_eq!(result, Some("from_env".to_string()));

        std::env::remove_var("DOCFLOW_EMPTY_SETTING_TEST");
    }

    #[tokio::test]
    async fn test_missing_file_uses_defaults() {
        let manager = SettingsManager::with_path(PathBuf::from("/nonexistent/settings.toml"))
            .await
            .unwrap();

        let settings = manager.settings();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.pipeline.max_revisions, 3);
    }

    #[tokio::test]
    async fn test_load_resolves_env_refs() {
        std::env::set_var("DOCFLOW_LOADER_KEY", "sk-test");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            "[llm]\napi_key = \"${DOCFLOW_LOADER_KEY}\"\nmodel = \"custom/model\"\n",
        )
        .unwrap();

        let manager = SettingsManager::with_path(path).await.unwrap();
        let settings = manager.into_settings();
        assert_eq!(settings.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(settings.llm.model.as_deref(), Some("custom/model"));

        std::env::remove_var("DOCFLOW_LOADER_KEY");
    }

    #[tokio::test]
    async fn test_invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[pipeline\ntop_k = ").unwrap();

        assert!(SettingsManager::with_path(path).await.is_err());
    }

    #[tokio::test]
    async fn test_generated_template_parses_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");
        let manager = SettingsManager::with_path(path.clone()).await.unwrap();

        assert!(manager.ensure_settings_file().await.unwrap());
        assert!(!manager.ensure_settings_file().await.unwrap());

        let reloaded = SettingsManager::with_path(path).await.unwrap();
        let settings = reloaded.settings();
        assert_eq!(settings.pipeline.export_timeout_secs, 15);
        assert_eq!(settings.pipeline.top_k, 5);
        assert_eq!(settings.server.port, 4001);
        assert!(settings.corpus.dir.is_none());
    }
}
