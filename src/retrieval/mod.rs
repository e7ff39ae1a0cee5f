//! Citation retrieval for the Draft stage.
//!
//! Retrieval is keyword-based: every scorable corpus line is scored by how
//! often the whole query occurs in it. An empty result is reported as
//! [`Retrieval::InsufficientEvidence`] so downstream stages branch on an
//! explicit negative finding rather than on list length.
//!
//! # Usage
//!
//! ```rust,ignore
//! let corpus = Corpus::load_dir(Path::new("data/corpus")).await?;
//! let retriever = KeywordRetriever::new(corpus);
//! match retriever.search("illegal sand mining", 5).await? {
//!     Retrieval::Found(citations) => { /* ... */ }
//!     Retrieval::InsufficientEvidence => { /* ... */ }
//! }
//! ```

pub mod corpus;
pub mod scorer;

pub use corpus::{Corpus, CorpusEntry, EntryStatus};

use async_trait::async_trait;

use crate::pipeline::Citation;

/// Outcome of a citation search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Retrieval {
    /// Ranked, deduplicated candidates (never empty).
    Found(Vec<Citation>),
    /// No usable candidate exists for the query.
    InsufficientEvidence,
}

impl Retrieval {
    pub fn is_insufficient(&self) -> bool {
        matches!(self, Retrieval::InsufficientEvidence)
    }

    pub fn citations(&self) -> &[Citation] {
        match self {
            Retrieval::Found(citations) => citations,
            Retrieval::InsufficientEvidence => &[],
        }
    }

    pub fn into_citations(self) -> Vec<Citation> {
        match self {
            Retrieval::Found(citations) => citations,
            Retrieval::InsufficientEvidence => Vec::new(),
        }
    }
}

/// Source of candidate citations for the pipeline.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn search(&self, query: &str, top_k: usize) -> anyhow::Result<Retrieval>;
}

/// Keyword retriever over an in-memory corpus.
pub struct KeywordRetriever {
    corpus: Corpus,
}

impl KeywordRetriever {
    pub fn new(corpus: Corpus) -> Self {
        Self { corpus }
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }
}

#[async_trait]
impl Retriever for KeywordRetriever {
    async fn search(&self, query: &str, top_k: usize) -> anyhow::Result<Retrieval> {
        let result = scorer::rank(&self.corpus, query, top_k);
        tracing::debug!(
            candidates = result.citations().len(),
            insufficient = result.is_insufficient(),
            "Keyword search over {} entries",
            self.corpus.len()
        );
        Ok(result)
    }
}
