//! CLI execution runner.
//!
//! Drives one pipeline session per input through the engine, resuming
//! paused sessions when `--auto-approve` is set.

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::pipeline::{GenerateRequest, ResumeRequest};

use super::bootstrap::CliContext;
use super::output::{run_event_loop, RunEnd};

/// Separator line between inputs in a batch file.
const BATCH_SEPARATOR: &str = "---";

/// Draft a document from `raw_input` and wait for the run to settle.
///
/// Returns the session id. A session left waiting for review is not an
/// error; its id is reported so it can be resumed through the gateway.
pub async fn execute_once(ctx: &CliContext, raw_input: &str) -> Result<String> {
    let handle = ctx
        .engine
        .generate(GenerateRequest {
            raw_input: raw_input.to_string(),
            document_type: ctx.args.document_type.clone(),
            session_id: None,
        })
        .await?;
    let session_id = handle.session_id.clone();

    let mut end = run_event_loop(handle.events, ctx.args.json, ctx.args.quiet).await?;

    if let RunEnd::Paused(_) = end {
        if !ctx.args.auto_approve {
            if !ctx.args.json {
                let checkpoint = ctx.engine.checkpoint(&session_id).await?;
                eprintln!(
                    "Session {} needs review: {}",
                    session_id,
                    checkpoint.state.review_reason.as_deref().unwrap_or("no reason recorded")
                );
            }
            return Ok(session_id);
        }

        tracing::info!(session_id = %session_id, "Auto-approving review");
        let handle = ctx
            .engine
            .resume(ResumeRequest {
                session_id: session_id.clone(),
                approved: true,
                document_content: None,
            })
            .await?;
        end = run_event_loop(handle.events, ctx.args.json, ctx.args.quiet).await?;
    }

    match end {
        RunEnd::Completed => {}
        RunEnd::Failed(message) => bail!("Pipeline failed: {}", message),
        RunEnd::Closed => bail!("Pipeline stopped without a result"),
        RunEnd::Paused(stage) => bail!("Pipeline paused again at {}", stage),
    }

    match ctx.engine.artifact(&session_id).await {
        Ok(artifact) => {
            if let Some(ref path) = ctx.args.output {
                tokio::fs::write(path, &artifact.bytes)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                if !ctx.args.quiet && !ctx.args.json {
                    eprintln!("[export] wrote {}", path.display());
                }
            } else if !ctx.args.json {
                println!("{}", String::from_utf8_lossy(&artifact.bytes));
            }
        }
        Err(_) => {
            tracing::warn!(session_id = %session_id, "No document was exported");
        }
    }

    Ok(session_id)
}

/// Draft one document per input in a file.
///
/// Inputs are separated by a line containing only `---`. Lines starting
/// with `#` are comments. Execution stops on the first error.
pub async fn execute_batch(ctx: &CliContext, file_path: &Path) -> Result<()> {
    let content = tokio::fs::read_to_string(file_path)
        .await
        .with_context(|| format!("Failed to read input file: {}", file_path.display()))?;

    let inputs = split_inputs(&content);
    if inputs.is_empty() {
        bail!("No inputs found in file: {}", file_path.display());
    }

    let total = inputs.len();
    if !ctx.args.quiet {
        eprintln!("[batch] Drafting {} document(s) from {}", total, file_path.display());
    }

    for (i, input) in inputs.iter().enumerate() {
        if !ctx.args.quiet {
            eprintln!("\n[batch] [{}/{}]", i + 1, total);
        }
        let session_id = execute_once(ctx, input).await?;
        if !ctx.args.quiet {
            eprintln!("[batch] [{}/{}] session {}", i + 1, total, session_id);
        }
    }

    Ok(())
}

/// Draft one document from everything on standard input.
pub async fn execute_stdin(ctx: &CliContext) -> Result<()> {
    use tokio::io::AsyncReadExt;

    let mut raw_input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut raw_input)
        .await
        .context("Failed to read input from stdin")?;
    execute_once(ctx, raw_input.trim()).await.map(|_| ())
}

fn split_inputs(content: &str) -> Vec<String> {
    let mut inputs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in content.lines() {
        if line.trim() == BATCH_SEPARATOR {
            push_input(&mut inputs, &current);
            current.clear();
        } else if !line.trim_start().starts_with('#') {
            current.push(line);
        }
    }
    push_input(&mut inputs, &current);
    inputs
}

fn push_input(inputs: &mut Vec<String>, lines: &[&str]) {
    let joined = lines.join("\n").trim().to_string();
    if !joined.is_empty() {
        inputs.push(joined);
    }
}
