//! CLI module for headless docflow operation.
//!
//! The CLI drives the same `PipelineEngine` the HTTP gateway serves, so a
//! one-shot draft from the terminal goes through exactly the stages a
//! browser session would.
//!
//! ```text
//! +-----------------+     +----------------+     +---------------+
//! | bootstrap.rs    | --> | PipelineEngine | --> | output.rs     |
//! | (settings, llm, |     | (stage events) |     | (print/JSON)  |
//! |  corpus)        |     +----------------+     +---------------+
//! +-----------------+
//! ```
//!
//! With neither `-e` nor `-f`, raw input is read from stdin.

mod args;
mod bootstrap;
mod output;
mod runner;
#[cfg(feature = "server")]
pub mod server;

pub use args::Args;
pub use bootstrap::{build_engine, initialize, CliContext};
pub use output::{run_event_loop, RunEnd};
pub use runner::{execute_batch, execute_once, execute_stdin};
