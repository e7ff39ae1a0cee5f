//! Source corpus for citation retrieval.
//!
//! A corpus is a list of named text blocks (one per source file). Blocks
//! carrying a superseded or pending-revision marker stay in the corpus for
//! inspection but are never scored.

use std::path::Path;

use anyhow::{Context, Result};

/// Markers flagging a block as superseded.
pub const SUPERSEDED_MARKERS: &[&str] = &["（已废止）", "(superseded)", "[superseded]"];

/// Markers flagging a block as awaiting revision.
pub const PENDING_MARKERS: &[&str] = &["（待修订）", "(pending revision)", "[pending revision]"];

/// File extensions picked up by [`Corpus::load_dir`].
const CORPUS_EXTENSIONS: &[&str] = &["md", "txt"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EntryStatus {
    #[default]
    Active,
    Superseded,
    PendingRevision,
}

impl EntryStatus {
    /// Classify a block by the markers it contains.
    pub fn detect(text: &str) -> Self {
        let lower = text.to_lowercase();
        if SUPERSEDED_MARKERS.iter().any(|m| lower.contains(m)) {
            EntryStatus::Superseded
        } else if PENDING_MARKERS.iter().any(|m| lower.contains(m)) {
            EntryStatus::PendingRevision
        } else {
            EntryStatus::Active
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusEntry {
    pub title: String,
    pub text: String,
    pub status: EntryStatus,
}

impl CorpusEntry {
    /// Create an entry, detecting its status from the text.
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            title: title.into(),
            status: EntryStatus::detect(&text),
            text,
        }
    }

    pub fn with_status(mut self, status: EntryStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_scorable(&self) -> bool {
        self.status == EntryStatus::Active
    }

    /// Trimmed, non-blank lines.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines().map(str::trim).filter(|l| !l.is_empty())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Corpus {
    entries: Vec<CorpusEntry>,
}

impl Corpus {
    pub fn new(entries: Vec<CorpusEntry>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, entry: CorpusEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(title, line)` pairs from every scorable entry, in corpus order.
    pub fn scorable_lines(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .filter(|e| e.is_scorable())
            .flat_map(|e| e.lines().map(move |line| (e.title.as_str(), line)))
    }

    /// Load every `.md`/`.txt` file in `dir` as one entry titled by its file
    /// stem. Files are read in name order.
    pub async fn load_dir(dir: &Path) -> Result<Self> {
        let mut read_dir = tokio::fs::read_dir(dir)
            .await
            .with_context(|| format!("Failed to read corpus directory {}", dir.display()))?;

        let mut paths = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let path = entry.path();
            let matches_ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| CORPUS_EXTENSIONS.contains(&e))
                .unwrap_or(false);
            if matches_ext && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut corpus = Corpus::default();
        for path in paths {
            let text = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read corpus file {}", path.display()))?;
            let title = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            let entry = CorpusEntry::new(title, text);
            if !entry.is_scorable() {
                tracing::debug!("Corpus entry '{}' excluded ({:?})", entry.title, entry.status);
            }
            corpus.push(entry);
        }

        tracing::info!("Loaded {} corpus entries from {:?}", corpus.len(), dir);
        Ok(corpus)
    }
}
