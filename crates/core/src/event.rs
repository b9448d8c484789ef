//! Observational agent events.
//!
//! The controller publishes what it is doing (model tokens, parsed thoughts,
//! tool traffic, termination) on an [`EventBus`]. Subscribers such as the
//! CLI's live display only watch; nothing published here feeds back into
//! the loop.

use crate::provider::Usage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    /// The model produced a `Final Answer`.
    Answered,
    /// Too many unparseable outputs; the answer is the last raw output.
    MaxParseErrorsExceeded,
    /// Action budget spent; the answer is assembled from observations.
    MaxIterationsExceeded,
}

impl TurnStatus {
    /// Whether the answer is a best-effort fallback.
    pub fn is_degraded(&self) -> bool {
        !matches!(self, TurnStatus::Answered)
    }
}

impl std::fmt::Display for TurnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TurnStatus::Answered => "answered",
            TurnStatus::MaxParseErrorsExceeded => "max_parse_errors_exceeded",
            TurnStatus::MaxIterationsExceeded => "max_iterations_exceeded",
        };
        f.write_str(s)
    }
}

/// Events emitted by the agent while a turn runs.
///
/// - `chunk`       — partial text from the model
/// - `thought`     — the reasoning line of a parsed step
/// - `tool_call`   — a tool is about to run
/// - `tool_result` — the observation the tool produced
/// - `parse_error` — model output did not match the step grammar
/// - `done`        — the turn terminated
/// - `error`       — the turn aborted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    Chunk {
        content: String,
    },

    Thought {
        content: String,
    },

    ToolCall {
        name: String,
        input: String,
    },

    ToolResult {
        name: String,
        output: String,
        success: bool,
    },

    ParseError {
        message: String,
        count: usize,
    },

    Done {
        conversation_id: String,
        status: TurnStatus,
        iterations: usize,
        tool_calls: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        usage: Option<Usage>,
    },

    Error {
        message: String,
    },
}

impl AgentEvent {
    /// Short event name, matching the serde tag.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Chunk { .. } => "chunk",
            Self::Thought { .. } => "thought",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::ParseError { .. } => "parse_error",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }
}

/// A broadcast-based event bus for agent events.
///
/// Publishing never blocks: slow subscribers lag and drop old events instead
/// of holding up the controller.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Arc<AgentEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: AgentEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<AgentEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}
