//! Session-keyed stores for checkpoints and rendered artifacts.
//!
//! Both stores are injected into the engine rather than held as globals so
//! several engines can coexist and tests can substitute their own.
//!
//! # Thread Safety
//!
//! `InMemoryStore` wraps a `DashMap`, so concurrent sessions only contend
//! when they hash to the same shard. Values are cloned out on read.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use super::collaborators::Artifact;
use super::stage::Stage;
use super::state::SessionState;

/// Snapshot of a session after its most recently completed stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub state: SessionState,
    pub last_stage: Stage,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(state: SessionState, last_stage: Stage) -> Self {
        Self {
            state,
            last_stage,
            updated_at: Utc::now(),
        }
    }

    /// True when the session is parked at the interrupt point.
    pub fn is_paused(&self) -> bool {
        self.last_stage.is_interrupt()
    }
}

/// Key-value store addressed by session id.
#[async_trait]
pub trait SessionStore<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, session_id: &str) -> Option<V>;

    /// Write or replace the value for `session_id`.
    async fn put(&self, session_id: &str, value: V) -> anyhow::Result<()>;

    async fn exists(&self, session_id: &str) -> bool;
}

pub type CheckpointStore = dyn SessionStore<Checkpoint>;
pub type ArtifactStore = dyn SessionStore<Artifact>;

/// Process-lifetime store backed by a `DashMap`.
pub struct InMemoryStore<V> {
    entries: DashMap<String, V>,
}

impl<V> InMemoryStore<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for InMemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> SessionStore<V> for InMemoryStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, session_id: &str) -> Option<V> {
        self.entries.get(session_id).map(|entry| entry.value().clone())
    }

    async fn put(&self, session_id: &str, value: V) -> anyhow::Result<()> {
        self.entries.insert(session_id.to_string(), value);
        Ok(())
    }

    async fn exists(&self, session_id: &str) -> bool {
        self.entries.contains_key(session_id)
    }
}
