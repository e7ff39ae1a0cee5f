//! Drafting pipeline.
//!
//! A session moves through five stages:
//!
//! ```text
//! Draft -> Verify -> Audit -> [HumanReview] -> Export
//! ```
//!
//! HumanReview only runs when something flagged the session, and the run
//! pauses after it until a reviewer resumes the session.
//!
//! # Architecture
//!
//! - `state`: session record and per-stage deltas
//! - `stage`: stage identifiers and routing
//! - `engine`: stage executors, run loop, resume
//! - `events`: lifecycle events and the snapshot-merging publisher
//! - `store`: checkpoint and artifact stores
//! - `collaborators`: completion and rendering traits
//!
//! # Usage
//!
//! ```rust,ignore
//! let engine = Arc::new(PipelineEngine::new(completion, retriever, renderer));
//! let handle = engine.generate(GenerateRequest {
//!     raw_input: "Sand mining at the north bend without a permit".into(),
//!     ..Default::default()
//! }).await?;
//! let mut events = event_stream(handle.events);
//! while let Some(event) = events.next().await {
//!     println!("{}", encode_frame(&event));
//! }
//! ```

pub mod citation;
pub mod collaborators;
pub mod engine;
pub mod events;
pub mod prompts;
pub mod stage;
pub mod state;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use collaborators::{Artifact, ChatMessage, ChatRole, CompletionClient, DocumentRenderer};
pub use engine::{
    EngineConfig, GenerateRequest, PipelineEngine, ResumeRequest, RunHandle, RunOutcome,
};
pub use events::{decode_frame, encode_frame, event_stream, EventPayload, EventPublisher, PipelineEvent};
pub use stage::{next_stage, route_after_audit, Stage};
pub use state::{Citation, ExtractedFields, SessionState, SessionStatus, StateDelta};
pub use store::{ArtifactStore, Checkpoint, CheckpointStore, InMemoryStore, SessionStore};
