//! Pipeline lifecycle events and the publisher that emits them.
//!
//! The publisher keeps a JSON snapshot of the session seeded from the
//! initial state and merges each stage delta into it, so every `node_end`
//! carries the cumulative state rather than only what the stage changed.
//!
//! # Wire format
//!
//! One event per frame: a tag line, a JSON payload line, a blank line.
//!
//! ```text
//! event: node_end
//! data: {"sessionId":"...","stageName":"draft","state":{...}}
//!
//! ```

use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use super::stage::Stage;
use super::state::{SessionState, StateDelta};

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// A stage is about to run; `state` is the state it receives.
    NodeStart {
        session_id: String,
        stage: Stage,
        state: Value,
    },
    /// A stage finished; `state` is the cumulative merged snapshot.
    NodeEnd {
        session_id: String,
        stage: Stage,
        state: Value,
    },
    /// Snapshot broadcast following every `NodeEnd`.
    StateUpdate { session_id: String, state: Value },
    /// The run ended normally, either at the end of the pipeline or paused
    /// at an interrupt stage.
    Done {
        session_id: String,
        interrupted_at: Option<Stage>,
    },
    /// The run failed; nothing follows.
    Error { session_id: String, message: String },
}

/// JSON body of a wire frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PipelineEvent {
    /// Wire tag for this event.
    pub fn tag(&self) -> &'static str {
        match self {
            PipelineEvent::NodeStart { .. } => "node_start",
            PipelineEvent::NodeEnd { .. } => "node_end",
            PipelineEvent::StateUpdate { .. } => "state_update",
            PipelineEvent::Done { .. } => "done",
            PipelineEvent::Error { .. } => "error",
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            PipelineEvent::NodeStart { session_id, .. }
            | PipelineEvent::NodeEnd { session_id, .. }
            | PipelineEvent::StateUpdate { session_id, .. }
            | PipelineEvent::Done { session_id, .. }
            | PipelineEvent::Error { session_id, .. } => session_id,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineEvent::Done { .. } | PipelineEvent::Error { .. })
    }

    pub fn payload(&self) -> EventPayload {
        let mut payload = EventPayload {
            session_id: self.session_id().to_string(),
            stage_name: None,
            state: None,
            message: None,
        };
        match self {
            PipelineEvent::NodeStart { stage, state, .. }
            | PipelineEvent::NodeEnd { stage, state, .. } => {
                payload.stage_name = Some(stage.to_string());
                payload.state = Some(state.clone());
            }
            PipelineEvent::StateUpdate { state, .. } => {
                payload.state = Some(state.clone());
            }
            PipelineEvent::Done { interrupted_at, .. } => {
                payload.stage_name = interrupted_at.map(|s| s.to_string());
            }
            PipelineEvent::Error { message, .. } => {
                payload.message = Some(message.clone());
            }
        }
        payload
    }
}

/// Encode an event as a wire frame.
pub fn encode_frame(event: &PipelineEvent) -> String {
    let data = serde_json::to_string(&event.payload()).unwrap_or_else(|_| "{}".to_string());
    format!("event: {}\ndata: {}\n\n", event.tag(), data)
}

/// Parse one wire frame back into its tag and payload.
pub fn decode_frame(frame: &str) -> Option<(String, EventPayload)> {
    let mut tag = None;
    let mut data = None;
    for line in frame.lines() {
        if let Some(rest) = line.strip_prefix("event: ") {
            tag = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("data: ") {
            data = Some(rest);
        }
    }
    let payload = serde_json::from_str(data?).ok()?;
    Some((tag?, payload))
}

/// Turns stage lifecycle into ordered events for one session.
///
/// Once a terminal event has been emitted the publisher is closed and
/// further calls are ignored. A dropped receiver is not an error: the run
/// keeps going without an observer.
pub struct EventPublisher {
    session_id: String,
    tx: mpsc::UnboundedSender<PipelineEvent>,
    snapshot: Map<String, Value>,
    closed: bool,
}

impl EventPublisher {
    pub fn new(initial: &SessionState, tx: mpsc::UnboundedSender<PipelineEvent>) -> Self {
        let snapshot = match initial.to_json() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            session_id: initial.session_id.clone(),
            tx,
            snapshot,
            closed: false,
        }
    }

    pub fn stage_started(&mut self, stage: Stage, input: &SessionState) {
        self.emit(PipelineEvent::NodeStart {
            session_id: self.session_id.clone(),
            stage,
            state: input.to_json(),
        });
    }

    /// Merge the stage delta into the snapshot and publish the result.
    pub fn stage_finished(&mut self, stage: Stage, delta: &StateDelta) {
        if let Value::Object(fields) = delta.to_json() {
            for (key, value) in fields {
                self.snapshot.insert(key, value);
            }
        }
        let state = Value::Object(self.snapshot.clone());
        self.emit(PipelineEvent::NodeEnd {
            session_id: self.session_id.clone(),
            stage,
            state: state.clone(),
        });
        self.emit(PipelineEvent::StateUpdate {
            session_id: self.session_id.clone(),
            state,
        });
    }

    pub fn finish(&mut self, interrupted_at: Option<Stage>) {
        self.emit(PipelineEvent::Done {
            session_id: self.session_id.clone(),
            interrupted_at,
        });
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.emit(PipelineEvent::Error {
            session_id: self.session_id.clone(),
            message: message.into(),
        });
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn emit(&mut self, event: PipelineEvent) {
        if self.closed {
            tracing::debug!(
                session_id = %self.session_id,
                "Dropping {} event after stream end",
                event.tag()
            );
            return;
        }
        if event.is_terminal() {
            self.closed = true;
        }
        if self.tx.send(event).is_err() {
            tracing::debug!(session_id = %self.session_id, "Event receiver dropped");
        }
    }
}

/// Adapt a receiver into a stream that ends right after the first terminal
/// event.
pub fn event_stream(
    rx: mpsc::UnboundedReceiver<PipelineEvent>,
) -> impl Stream<Item = PipelineEvent> + Send {
    stream::unfold((rx, false), |(mut rx, finished)| async move {
        if finished {
            return None;
        }
        let event = rx.recv().await?;
        let terminal = event.is_terminal();
        Some((event, (rx, terminal)))
    })
}
