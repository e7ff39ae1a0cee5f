//! CLI bootstrap - wire settings, corpus and collaborators into an engine.
//!
//! The one-shot runner and the HTTP gateway both start from the
//! `CliContext` built here, so they share one engine configuration.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::llm::ChatCompletionsClient;
use crate::pipeline::{CompletionClient, PipelineEngine};
use crate::render::PlainTextRenderer;
use crate::retrieval::{Corpus, KeywordRetriever};
use crate::settings::{get_with_env_fallback, settings_path, DocflowSettings, SettingsManager};

use super::args::Args;

/// Environment variables consulted for the corpus directory.
const CORPUS_DIR_ENV: &[&str] = &["DOCFLOW_CORPUS_DIR"];

/// Initialized services for CLI and gateway execution.
pub struct CliContext {
    pub engine: Arc<PipelineEngine>,

    /// Effective settings after command-line overrides
    pub settings: DocflowSettings,

    pub args: Args,
}

/// Initialize logging, settings, corpus and the pipeline engine.
pub async fn initialize(args: &Args) -> Result<CliContext> {
    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        // Only warn on errors other than file not found
        if !matches!(e, dotenvy::Error::Io(_)) {
            tracing::warn!("Failed to load .env file: {}", e);
        }
    }

    init_tracing(args);

    let path = args.config.clone().unwrap_or_else(settings_path);
    let settings_manager = SettingsManager::with_path(path)
        .await
        .context("Failed to initialize settings manager")?;

    // Only generate a template at the default location
    if args.config.is_none() {
        if let Err(e) = settings_manager.ensure_settings_file().await {
            tracing::warn!("Failed to create settings template: {}", e);
        }
    }

    if args.verbose {
        eprintln!(
            "[cli] Settings loaded from {}",
            settings_manager.path().display()
        );
    }

    let settings = apply_overrides(settings_manager.into_settings(), args);

    let corpus = load_corpus(&settings, args).await?;
    let completion: Arc<dyn CompletionClient> =
        Arc::new(ChatCompletionsClient::from_settings(&settings.llm)?);

    if args.verbose {
        eprintln!("[cli] Completion: {}", completion.description());
        eprintln!("[cli] Corpus entries: {}", corpus.len());
    }

    let engine = build_engine(completion, corpus, &settings);

    Ok(CliContext {
        engine,
        settings,
        args: args.clone(),
    })
}

fn init_tracing(args: &Args) {
    let directive = args
        .log_directive()
        .parse()
        .unwrap_or_else(|_| tracing_subscriber::filter::LevelFilter::INFO.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .try_init();
}

/// Apply command-line overrides on top of file settings.
pub fn apply_overrides(mut settings: DocflowSettings, args: &Args) -> DocflowSettings {
    if let Some(ref model) = args.model {
        settings.llm.model = Some(model.clone());
    }
    if let Some(ref key) = args.api_key {
        settings.llm.api_key = Some(key.clone());
    }
    if let Some(ref dir) = args.corpus {
        settings.corpus.dir = Some(dir.display().to_string());
    }
    settings
}

/// Load the corpus directory named by settings or the environment.
///
/// A missing directory setting yields an empty corpus: every search then
/// reports insufficient evidence.
pub async fn load_corpus(settings: &DocflowSettings, args: &Args) -> Result<Corpus> {
    match get_with_env_fallback(&settings.corpus.dir, CORPUS_DIR_ENV, None) {
        Some(dir) => Corpus::load_dir(&PathBuf::from(dir)).await,
        None => {
            if !args.quiet {
                tracing::warn!("No corpus directory configured; drafts will carry no citations");
            }
            Ok(Corpus::default())
        }
    }
}

/// Assemble the engine around a completion client and corpus.
pub fn build_engine(
    completion: Arc<dyn CompletionClient>,
    corpus: Corpus,
    settings: &DocflowSettings,
) -> Arc<PipelineEngine> {
    let engine = PipelineEngine::new(
        completion,
        Arc::new(KeywordRetriever::new(corpus)),
        Arc::new(PlainTextRenderer::new()),
    )
    .with_config(settings.pipeline.engine_config());
    Arc::new(engine)
}
