//! Progress events emitted while a turn runs
//!
//! The sink is the sending half of an unbounded channel, so emitting never
//! waits on the consumer. Events sent after the consumer has gone away are
//! dropped.

use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::core::AgentReply;

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Started,
    Iteration {
        number: usize,
        max: usize,
    },
    ToolStart {
        name: String,
        args: Value,
    },
    ToolComplete {
        name: String,
        success: bool,
        error: Option<String>,
    },
    Complete(AgentReply),
    Error(String),
}

impl ProgressEvent {
    /// Frame type tag
    pub fn event_name(&self) -> &'static str {
        match self {
            ProgressEvent::Started => "start",
            ProgressEvent::Iteration { .. } => "iteration",
            ProgressEvent::ToolStart { .. } => "tool_start",
            ProgressEvent::ToolComplete { .. } => "tool_complete",
            ProgressEvent::Complete(_) => "complete",
            ProgressEvent::Error(_) => "error",
        }
    }

    /// Frame JSON body
    pub fn data(&self) -> Value {
        match self {
            ProgressEvent::Started => json!({ "status": "processing" }),
            ProgressEvent::Iteration { number, max } => json!({ "number": number, "max": max }),
            ProgressEvent::ToolStart { name, args } => json!({ "name": name, "args": args }),
            ProgressEvent::ToolComplete {
                name,
                success,
                error,
            } => {
                let mut body = json!({ "name": name, "success": success });
                if let Some(error) = error {
                    body["error"] = json!(error);
                }
                body
            }
            ProgressEvent::Complete(reply) => json!({ "agent": reply.agent, "text": reply.text }),
            ProgressEvent::Error(message) => json!({ "error": message }),
        }
    }

    /// Whether this event ends a stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressEvent::Complete(_) | ProgressEvent::Error(_))
    }
}

/// Caller-supplied consumer of progress events
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ProgressSink {
    pub fn new(tx: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }

    /// A sink and the receiver that observes it
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn emit(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}
