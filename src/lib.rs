//! docflow - staged drafting of official enforcement documents.
//!
//! Raw incident text flows through Draft, Verify, Audit, HumanReview and
//! Export stages. Every stage checkpoints the session, and a session that
//! fails verification or exceeds its revision limit pauses for a reviewer
//! before export.
//!
//! The `cli` feature adds the command-line driver; `server` adds the axum SSE
//! gateway on top of it.

pub mod error;
pub mod llm;
pub mod pipeline;
pub mod render;
pub mod retrieval;
pub mod settings;

#[cfg(feature = "cli")]
pub mod cli;
