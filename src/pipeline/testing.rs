//! In-memory collaborators for engine tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::collaborators::{Artifact, ChatMessage, CompletionClient, DocumentRenderer};
use super::engine::{PipelineEngine, RunHandle};
use super::events::PipelineEvent;
use super::prompts::EXTRACTION_SYSTEM_PROMPT;
use super::state::SessionState;
use crate::retrieval::{Corpus, CorpusEntry, KeywordRetriever};

/// What the fake model returns for drafting calls.
pub enum DraftReply {
    /// Echo the drafting user prompt, which contains every citation line
    /// verbatim.
    EchoPrompt,
    Fixed(String),
    Fail,
    Panic,
}

/// Completion client that answers extraction and drafting calls from a script.
pub struct ScriptedCompletion {
    pub extraction: String,
    pub draft: DraftReply,
    pub calls: AtomicUsize,
}

impl ScriptedCompletion {
    pub fn new(extraction: impl Into<String>, draft: DraftReply) -> Self {
        Self {
            extraction: extraction.into(),
            draft,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn complete(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if messages.first().map(|m| m.content.as_str()) == Some(EXTRACTION_SYSTEM_PROMPT) {
            return Ok(self.extraction.clone());
        }
        match &self.draft {
            DraftReply::EchoPrompt => Ok(messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default()),
            DraftReply::Fixed(text) => Ok(text.clone()),
            DraftReply::Fail => anyhow::bail!("model unavailable"),
            DraftReply::Panic => panic!("model client crashed"),
        }
    }
}

/// Renderer that records what it was asked to render.
#[derive(Default)]
pub struct RecordingRenderer {
    pub rendered: Mutex<Vec<SessionState>>,
    pub delay: Option<Duration>,
    pub fail: bool,
}

impl RecordingRenderer {
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn rendered_contents(&self) -> Vec<String> {
        self.rendered
            .lock()
            .iter()
            .map(|s| s.document_content.clone())
            .collect()
    }
}

#[async_trait]
impl DocumentRenderer for RecordingRenderer {
    async fn render(&self, state: &SessionState) -> anyhow::Result<Artifact> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.rendered.lock().push(state.clone());
        if self.fail {
            anyhow::bail!("renderer crashed");
        }
        Ok(Artifact {
            bytes: state.document_content.clone().into_bytes(),
            content_type: "text/plain; charset=utf-8".to_string(),
            file_name: format!("{}.txt", state.session_id),
        })
    }
}

pub const SAND_MINING_LINE: &str = "Article 34 Sand mining in a river channel without a permit is prohibited.";

pub fn water_corpus() -> Corpus {
    Corpus::new(vec![
        CorpusEntry::new(
            "River Channel Regulations",
            format!("{}\nArticle 35 Permits are issued by the water authority.", SAND_MINING_LINE),
        ),
        CorpusEntry::new("Old Sand Rules", format!("(superseded)\n{}", SAND_MINING_LINE)),
    ])
}

/// Extraction reply with no query fields, so the query is the raw input.
/// Pair it with raw input `sand mining` to hit exactly one corpus line.
pub const SAND_MINING_EXTRACTION: &str = r#"```json
{"subject":"Unknown crew","time":"yesterday","place":""}
```"#;

pub fn engine(
    completion: Arc<ScriptedCompletion>,
    renderer: Arc<RecordingRenderer>,
) -> Arc<PipelineEngine> {
    Arc::new(PipelineEngine::new(
        completion,
        Arc::new(KeywordRetriever::new(water_corpus())),
        renderer,
    ))
}

/// Read events until the first terminal one.
pub async fn collect_events(handle: RunHandle) -> Vec<PipelineEvent> {
    collect_from(handle.events).await
}

pub async fn collect_from(mut rx: mpsc::UnboundedReceiver<PipelineEvent>) -> Vec<PipelineEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        let terminal = event.is_terminal();
        events.push(event);
        if terminal {
            break;
        }
    }
    events
}

/// `(tag, stage)` pairs for compact assertions.
pub fn trace(events: &[PipelineEvent]) -> Vec<(String, Option<String>)> {
    events
        .iter()
        .map(|e| (e.tag().to_string(), e.payload().stage_name))
        .collect()
}

/// Wait until no run is active for `session_id`.
pub async fn wait_idle(engine: &PipelineEngine, session_id: &str) {
    for _ in 0..200 {
        if !engine.is_running(session_id) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("session {} never became idle", session_id);
}
