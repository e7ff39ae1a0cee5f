//! CLI output handling - pipeline event receiver loop.
//!
//! Renders events as they arrive, based on output mode (terminal, JSON, or
//! quiet), and reports how the run ended.

use std::io::{self, Write};

use anyhow::Result;
use tokio::sync::mpsc;

use crate::pipeline::{PipelineEvent, Stage};

/// How a run ended, as seen from its event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEnd {
    Completed,
    /// Paused after this stage, waiting for review.
    Paused(Stage),
    Failed(String),
    /// The channel closed without a terminal event.
    Closed,
}

/// Run the event loop until a terminal event arrives or the channel closes.
///
/// # Arguments
///
/// * `event_rx` - Channel receiver for pipeline events
/// * `json_mode` - If true, output events as JSON lines
/// * `quiet_mode` - If true, suppress progress output
pub async fn run_event_loop(
    mut event_rx: mpsc::UnboundedReceiver<PipelineEvent>,
    json_mode: bool,
    quiet_mode: bool,
) -> Result<RunEnd> {
    while let Some(event) = event_rx.recv().await {
        if json_mode {
            println!("{}", event_to_json(&event));
            io::stdout().flush()?;
        } else if !quiet_mode {
            print_event(&event);
        }

        match event {
            PipelineEvent::Done {
                interrupted_at: Some(stage),
                ..
            } => return Ok(RunEnd::Paused(stage)),
            PipelineEvent::Done { .. } => return Ok(RunEnd::Completed),
            PipelineEvent::Error { message, .. } => {
                if !json_mode {
                    eprintln!("Error: {}", message);
                }
                return Ok(RunEnd::Failed(message));
            }
            _ => {}
        }
    }

    Ok(RunEnd::Closed)
}

/// One JSON line per event: the payload plus an `event` tag.
pub fn event_to_json(event: &PipelineEvent) -> serde_json::Value {
    let mut json = serde_json::to_value(event.payload()).unwrap_or_else(|_| serde_json::json!({}));
    if let Some(obj) = json.as_object_mut() {
        obj.insert("event".to_string(), serde_json::json!(event.tag()));
    }
    json
}

fn print_event(event: &PipelineEvent) {
    match event {
        PipelineEvent::NodeStart { stage, .. } => {
            eprintln!("[{}] started", stage);
        }
        PipelineEvent::NodeEnd { stage, state, .. } => {
            let revision = state["revisionCount"].as_u64().unwrap_or(0);
            eprintln!("[{}] finished (revision {})", stage, revision);
            if let Some(reason) = state["reviewReason"].as_str() {
                if *stage == Stage::Verify || *stage == Stage::Audit {
                    eprintln!("[{}] review requested: {}", stage, truncate(reason, 100));
                }
            }
        }
        PipelineEvent::StateUpdate { .. } => {}
        PipelineEvent::Done {
            interrupted_at: Some(stage),
            session_id,
        } => {
            eprintln!("[{}] paused for review (session {})", stage, session_id);
        }
        PipelineEvent::Done { .. } => {
            eprintln!("[done] pipeline complete");
        }
        PipelineEvent::Error { .. } => {}
    }
}

/// Truncate a string to a maximum number of characters.
fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars.saturating_sub(3)) {
        Some((idx, _)) if s.chars().count() > max_chars => format!("{}...", &s[..idx]),
        _ => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world!", 8), "hello...");
        assert_eq!(truncate("需要人工核对的内容很长", 5), "需要...");
    }

    #[test]
    fn test_event_to_json_carries_tag() {
        let json = event_to_json(&PipelineEvent::Done {
            session_id: "s-1".into(),
            interrupted_at: Some(Stage::HumanReview),
        });
        assert_eq!(json["event"], "done");
        assert_eq!(json["sessionId"], "s-1");
        assert_eq!(json["stageName"], "human_review");
    }

    #[tokio::test]
    async fn test_event_loop_reports_pause() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(PipelineEvent::NodeStart {
            session_id: "s".into(),
            stage: Stage::HumanReview,
            state: serde_json::json!({}),
        })
        .unwrap();
        tx.send(PipelineEvent::Done {
            session_id: "s".into(),
            interrupted_at: Some(Stage::HumanReview),
        })
        .unwrap();

        let end = run_event_loop(rx, false, true).await.unwrap();
        assert_eq!(end, RunEnd::Paused(Stage::HumanReview));
    }

    #[tokio::test]
    async fn test_event_loop_reports_failure_and_close() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(PipelineEvent::Error {
            session_id: "s".into(),
            message: "boom".into(),
        })
        .unwrap();
        let end = run_event_loop(rx, false, true).await.unwrap();
        assert_eq!(end, RunEnd::Failed("boom".into()));

        let (tx, rx) = mpsc::unbounded_channel::<PipelineEvent>();
        drop(tx);
        assert_eq!(run_event_loop(rx, false, true).await.unwrap(), RunEnd::Closed);
    }
}
