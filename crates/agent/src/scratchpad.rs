//! Scratchpad — the reasoning trace of a single turn.
//!
//! Every cycle that ends in an observation (tool output, tool failure,
//! parse error, unknown tool) leaves one entry. The rendered scratchpad is
//! appended after `Thought:` in the prompt so the model continues its own
//! trace. It is discarded when the turn ends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where an observation came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ObservationKind {
    ToolOutput,
    ToolFailure,
    ParseError,
}

/// One Thought / Action / Observation cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScratchpadEntry {
    /// Raw model text for the cycle, exactly as generated.
    pub log: String,
    pub thought: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<(String, String)>,
    pub observation: String,
    pub kind: ObservationKind,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scratchpad {
    entries: Vec<ScratchpadEntry>,
}

impl Scratchpad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a tool call and what it returned.
    pub fn push_action(
        &mut self,
        log: &str,
        thought: &str,
        tool: &str,
        input: &str,
        observation: &str,
        success: bool,
    ) {
        let kind = if success {
            ObservationKind::ToolOutput
        } else {
            ObservationKind::ToolFailure
        };
        self.push(ScratchpadEntry {
            log: log.to_string(),
            thought: thought.to_string(),
            action: Some((tool.to_string(), input.to_string())),
            observation: observation.to_string(),
            kind,
            timestamp: Utc::now(),
        });
    }

    /// Record malformed output and the corrective observation.
    pub fn push_parse_error(&mut self, log: &str, observation: &str) {
        self.push(ScratchpadEntry {
            log: log.to_string(),
            thought: String::new(),
            action: None,
            observation: observation.to_string(),
            kind: ObservationKind::ParseError,
            timestamp: Utc::now(),
        });
    }

    fn push(&mut self, entry: ScratchpadEntry) {
        self.entries.push(entry);
    }

    /// Text that follows `Thought:` in the prompt.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.log);
            out.push_str("\nObservation: ");
            out.push_str(&entry.observation);
            out.push_str("\nThought: ");
        }
        out
    }

    /// Up to `n` most recent successful tool outputs, oldest first.
    pub fn recent_observations(&self, n: usize) -> Vec<&str> {
        let mut recent: Vec<&str> = self
            .entries
            .iter()
            .rev()
            .filter(|e| e.kind == ObservationKind::ToolOutput)
            .take(n)
            .map(|e| e.observation.as_str())
            .collect();
        recent.reverse();
        recent
    }

    pub fn entries(&self) -> &[ScratchpadEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
