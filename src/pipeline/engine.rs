//! The pipeline engine: stage execution, routing, checkpointing and resume.
//!
//! Each run executes stages strictly in sequence. After every stage the
//! engine applies the stage delta, writes a checkpoint and only then lets
//! the publisher report the stage as finished, so a client never sees a
//! stage end that is not durable.
//!
//! Runs are spawned onto the tokio runtime, one task per run, and report
//! through an unbounded channel. At most one run per session is allowed at a
//! time.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use dashmap::DashMap;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::citation::{format_citations, quoted_excerpt};
use super::collaborators::{Artifact, CompletionClient, DocumentRenderer};
use super::events::{EventPublisher, PipelineEvent};
use super::prompts;
use super::stage::{next_stage, Stage};
use super::state::{SessionState, SessionStatus, StateDelta};
use super::store::{ArtifactStore, Checkpoint, CheckpointStore, InMemoryStore};
use crate::error::{DocflowError, Result};
use crate::retrieval::Retriever;

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_MAX_REVISIONS: u32 = 3;
pub const DEFAULT_EXPORT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_DOCUMENT_TYPE: &str = "Notice of Deadline for Payment";

pub const CITATION_MISMATCH_REASON: &str =
    "generated content does not match the verbatim retrieved citation; needs manual verification";
pub const TOO_MANY_REVISIONS_REASON: &str = "too many revisions; requires manual confirmation";

/// Tunables for the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum citations requested from the retriever.
    pub top_k: usize,
    /// Audit forces human review once the revision count exceeds this.
    pub max_revisions: u32,
    /// Upper bound on a single render call.
    pub export_timeout: Duration,
    /// Used when a session has no document type.
    pub default_document_type: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            max_revisions: DEFAULT_MAX_REVISIONS,
            export_timeout: Duration::from_secs(DEFAULT_EXPORT_TIMEOUT_SECS),
            default_document_type: DEFAULT_DOCUMENT_TYPE.to_string(),
        }
    }
}

/// Start (or resubmit) a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub raw_input: String,
    #[serde(default)]
    pub document_type: Option<String>,
    /// Existing session to resubmit, or the id to give a new session.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Continue a session paused at human review.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRequest {
    pub session_id: String,
    #[serde(default)]
    pub approved: bool,
    /// Replacement draft; only honoured when `approved` is false.
    #[serde(default)]
    pub document_content: Option<String>,
}

/// How a run ended when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(SessionState),
    Paused { at: Stage, state: SessionState },
}

impl RunOutcome {
    pub fn state(&self) -> &SessionState {
        match self {
            RunOutcome::Completed(state) | RunOutcome::Paused { state, .. } => state,
        }
    }

    /// The interrupt stage the run paused after, if any.
    pub fn interrupted_at(&self) -> Option<Stage> {
        match self {
            RunOutcome::Completed(_) => None,
            RunOutcome::Paused { at, .. } => Some(*at),
        }
    }
}

/// Event receiver for a spawned run.
pub struct RunHandle {
    pub session_id: String,
    pub events: mpsc::UnboundedReceiver<PipelineEvent>,
}

/// Releases the per-session run slot when dropped.
struct RunGuard {
    running: Arc<DashMap<String, Instant>>,
    session_id: String,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.remove(&self.session_id);
    }
}

pub struct PipelineEngine {
    completion: Arc<dyn CompletionClient>,
    retriever: Arc<dyn Retriever>,
    renderer: Arc<dyn DocumentRenderer>,
    checkpoints: Arc<CheckpointStore>,
    artifacts: Arc<ArtifactStore>,
    config: EngineConfig,
    running: Arc<DashMap<String, Instant>>,
}

impl PipelineEngine {
    /// Create an engine with in-memory stores and default configuration.
    pub fn new(
        completion: Arc<dyn CompletionClient>,
        retriever: Arc<dyn Retriever>,
        renderer: Arc<dyn DocumentRenderer>,
    ) -> Self {
        Self {
            completion,
            retriever,
            renderer,
            checkpoints: InMemoryStore::<Checkpoint>::shared(),
            artifacts: InMemoryStore::<Artifact>::shared(),
            config: EngineConfig::default(),
            running: Arc::new(DashMap::new()),
        }
    }

    pub fn with_stores(
        mut self,
        checkpoints: Arc<CheckpointStore>,
        artifacts: Arc<ArtifactStore>,
    ) -> Self {
        self.checkpoints = checkpoints;
        self.artifacts = artifacts;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Whether a run is currently executing for `session_id`.
    pub fn is_running(&self, session_id: &str) -> bool {
        self.running.contains_key(session_id)
    }

    /// Start a new session, or re-run an existing one from Draft.
    ///
    /// Resubmitting keeps the checkpointed raw input and carries the revision
    /// count and review flag forward.
    pub async fn generate(self: &Arc<Self>, request: GenerateRequest) -> Result<RunHandle> {
        let session_id = request
            .session_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let guard = self.acquire(&session_id)?;

        let state = match self.checkpoints.get(&session_id).await {
            Some(checkpoint) => {
                let mut state = checkpoint.state;
                if !request.raw_input.is_empty() && request.raw_input != state.raw_input {
                    tracing::warn!(
                        session_id = %session_id,
                        "Ignoring new raw input on resubmission; raw input is fixed at creation"
                    );
                }
                if request.document_type.is_some() {
                    state.document_type = request.document_type;
                }
                tracing::info!(
                    session_id = %session_id,
                    revision_count = state.revision_count,
                    "Resubmitting session"
                );
                state
            }
            None => {
                tracing::info!(session_id = %session_id, "Creating session");
                SessionState::new(session_id.clone(), request.raw_input, request.document_type)
            }
        };

        Ok(self.spawn_run(guard, state, Stage::Draft))
    }

    /// Resume a session paused at human review; execution continues at Export.
    pub async fn resume(self: &Arc<Self>, request: ResumeRequest) -> Result<RunHandle> {
        if request.session_id.trim().is_empty() {
            return Err(DocflowError::InvalidRequest(
                "sessionId must not be empty".to_string(),
            ));
        }

        let guard = self.acquire(&request.session_id)?;

        let checkpoint = self
            .checkpoints
            .get(&request.session_id)
            .await
            .ok_or_else(|| DocflowError::SessionNotFound(request.session_id.clone()))?;

        if !checkpoint.is_paused() {
            return Err(DocflowError::NotAwaitingReview(request.session_id));
        }

        let mut state = checkpoint.state;
        if !request.approved {
            if let Some(content) = request.document_content {
                tracing::info!(session_id = %state.session_id, "Applying reviewer content override");
                state.document_content = content;
            }
        }

        let from = next_stage(checkpoint.last_stage, &state).unwrap_or(Stage::Export);
        tracing::info!(
            session_id = %state.session_id,
            approved = request.approved,
            "Resuming session at {}",
            from
        );
        Ok(self.spawn_run(guard, state, from))
    }

    /// Latest checkpoint for a session.
    pub async fn checkpoint(&self, session_id: &str) -> Result<Checkpoint> {
        self.checkpoints
            .get(session_id)
            .await
            .ok_or_else(|| DocflowError::SessionNotFound(session_id.to_string()))
    }

    /// Rendered artifact for a session. Missing when Export has not run or
    /// rendering failed.
    pub async fn artifact(&self, session_id: &str) -> Result<Artifact> {
        self.artifacts
            .get(session_id)
            .await
            .ok_or_else(|| DocflowError::SessionNotFound(session_id.to_string()))
    }

    fn acquire(&self, session_id: &str) -> Result<RunGuard> {
        match self.running.entry(session_id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(DocflowError::SessionBusy(session_id.to_string()))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Instant::now());
                Ok(RunGuard {
                    running: self.running.clone(),
                    session_id: session_id.to_string(),
                })
            }
        }
    }

    fn spawn_run(self: &Arc<Self>, guard: RunGuard, state: SessionState, from: Stage) -> RunHandle {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let session_id = state.session_id.clone();
        let engine = self.clone();

        tokio::spawn(async move {
            let mut publisher = EventPublisher::new(&state, event_tx);
            let session_id = state.session_id.clone();
            let result = AssertUnwindSafe(engine.run_stages(state, from, &mut publisher))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(DocflowError::Internal(format!(
                        "stage panicked: {}",
                        panic_message(panic.as_ref())
                    )))
                });

            // The session must accept new requests by the time a client sees
            // the terminal event.
            drop(guard);

            match &result {
                Ok(outcome @ RunOutcome::Completed(_)) => {
                    tracing::info!(
                        session_id = %session_id,
                        revision_count = outcome.state().revision_count,
                        "Pipeline completed"
                    );
                }
                Ok(outcome @ RunOutcome::Paused { .. }) => {
                    tracing::info!(
                        session_id = %session_id,
                        reason = outcome.state().review_reason.as_deref().unwrap_or_default(),
                        "Pipeline paused for human review"
                    );
                }
                Err(e) => {
                    tracing::warn!(session_id = %session_id, "Pipeline failed: {}", e);
                }
            }
            publish_outcome(&mut publisher, &result);
        });

        RunHandle {
            session_id,
            events: event_rx,
        }
    }

    async fn run_stages(
        &self,
        mut state: SessionState,
        from: Stage,
        publisher: &mut EventPublisher,
    ) -> Result<RunOutcome> {
        let mut current = Some(from);

        while let Some(stage) = current {
            publisher.stage_started(stage, &state);
            let started = Instant::now();

            let delta = self
                .execute_stage(stage, &state)
                .await
                .map_err(|source| DocflowError::Stage { stage, source })?;

            state.apply(&delta);

            let checkpoint = Checkpoint::new(state.clone(), stage);
            self.checkpoints
                .put(&state.session_id, checkpoint)
                .await
                .map_err(|e| DocflowError::Checkpoint(format!("{:#}", e)))?;

            tracing::debug!(
                session_id = %state.session_id,
                revision_count = state.revision_count,
                needs_human_review = state.needs_human_review,
                duration_ms = started.elapsed().as_millis() as u64,
                "Stage {} finished",
                stage
            );
            publisher.stage_finished(stage, &delta);

            if stage.is_interrupt() {
                return Ok(RunOutcome::Paused { at: stage, state });
            }

            current = next_stage(stage, &state);
        }

        Ok(RunOutcome::Completed(state))
    }

    /// Run one stage against `state` and return its delta.
    pub async fn execute_stage(
        &self,
        stage: Stage,
        state: &SessionState,
    ) -> anyhow::Result<StateDelta> {
        match stage {
            Stage::Draft => self.draft(state).await,
            Stage::Verify => Ok(verify(state)),
            Stage::Audit => Ok(audit(state, self.config.max_revisions)),
            Stage::HumanReview => Ok(human_review(state)),
            Stage::Export => Ok(self.export(state).await),
        }
    }

    async fn draft(&self, state: &SessionState) -> anyhow::Result<StateDelta> {
        let revision_count = Some(state.revision_count + 1);
        let raw_input = state.raw_input.trim();

        if raw_input.is_empty() {
            return Ok(StateDelta {
                document_content: Some(String::new()),
                status: Some(SessionStatus::Drafting),
                revision_count,
                ..Default::default()
            });
        }

        let response = self
            .completion
            .complete(&prompts::extraction_messages(raw_input))
            .await
            .context("Field extraction failed")?;
        let fields = prompts::parse_extracted_fields(&response);

        let query = prompts::build_query(&fields, raw_input);
        let retrieval = self
            .retriever
            .search(&query, self.config.top_k)
            .await
            .context("Citation search failed")?;
        if retrieval.is_insufficient() {
            tracing::info!(session_id = %state.session_id, "Insufficient evidence for query");
        }
        let citations = retrieval.into_citations();

        let document_type = state
            .document_type
            .as_deref()
            .unwrap_or(&self.config.default_document_type);
        let citation_lines = format_citations(&citations);
        let document_content = self
            .completion
            .complete(&prompts::drafting_messages(
                raw_input,
                document_type,
                &citation_lines,
            ))
            .await
            .context("Draft generation failed")?;

        Ok(StateDelta {
            document_content: Some(document_content),
            citations: Some(citations),
            extracted_fields: Some(fields),
            status: Some(SessionStatus::Drafting),
            revision_count,
            ..Default::default()
        })
    }

    async fn export(&self, state: &SessionState) -> StateDelta {
        let session_id = &state.session_id;
        match tokio::time::timeout(self.config.export_timeout, self.renderer.render(state)).await {
            Ok(Ok(artifact)) => {
                let size = artifact.bytes.len();
                match self.artifacts.put(session_id, artifact).await {
                    Ok(()) => tracing::info!(session_id = %session_id, size, "Stored artifact"),
                    Err(e) => tracing::warn!(session_id = %session_id, "Failed to store artifact: {:#}", e),
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(session_id = %session_id, "Render failed: {:#}", e);
            }
            Err(_) => {
                tracing::warn!(
                    session_id = %session_id,
                    "Render timed out after {:?}",
                    self.config.export_timeout
                );
            }
        }
        StateDelta::status(SessionStatus::Completed)
    }
}

/// Best-effort text of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

fn publish_outcome(publisher: &mut EventPublisher, result: &Result<RunOutcome>) {
    match result {
        Ok(outcome) => publisher.finish(outcome.interrupted_at()),
        Err(e) => publisher.fail(e.to_string()),
    }
}

/// Check every citation excerpt appears verbatim in the draft; flag the
/// first one that does not.
pub fn verify(state: &SessionState) -> StateDelta {
    let mut delta = StateDelta::status(SessionStatus::Reviewing);
    for line in format_citations(&state.citations) {
        let excerpt = quoted_excerpt(&line);
        if !excerpt.is_empty() && !state.document_content.contains(excerpt) {
            delta.needs_human_review = Some(true);
            delta.review_reason = Some(CITATION_MISMATCH_REASON.to_string());
            break;
        }
    }
    delta
}

/// Count the revision and force review once the limit is exceeded. A flag
/// raised earlier is never cleared here.
pub fn audit(state: &SessionState, max_revisions: u32) -> StateDelta {
    let revision_count = state.revision_count + 1;
    let mut delta = StateDelta {
        status: Some(SessionStatus::Reviewing),
        revision_count: Some(revision_count),
        ..Default::default()
    };
    if revision_count > max_revisions {
        delta.needs_human_review = Some(true);
        delta.review_reason = Some(
            state
                .review_reason
                .clone()
                .unwrap_or_else(|| TOO_MANY_REVISIONS_REASON.to_string()),
        );
    }
    delta
}

pub fn human_review(_state: &SessionState) -> StateDelta {
    StateDelta::status(SessionStatus::Reviewing)
}
