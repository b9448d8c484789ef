//! Parser for the text step grammar.
//!
//! A model step is either
//!
//! ```text
//! <thought>
//! Action: <tool name>
//! Action Input: <query>
//! ```
//!
//! or
//!
//! ```text
//! <thought>
//! Final Answer: <answer>
//! ```
//!
//! Anything else is a [`ParseError`], which the controller feeds back to
//! the model as a corrective observation.

use regex_lite::Regex;
use std::sync::LazyLock;
use thiserror::Error;

pub const FINAL_ANSWER_MARKER: &str = "Final Answer:";

static ACTION_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)").ok()
});
static ACTION_ONLY_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)").ok());
static ACTION_INPUT_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)").ok());

/// One parsed model step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentStep {
    Action {
        tool_name: String,
        tool_input: String,
        thought: String,
    },
    FinalAnswer {
        text: String,
        thought: String,
    },
}

impl AgentStep {
    pub fn thought(&self) -> &str {
        match self {
            AgentStep::Action { thought, .. } | AgentStep::FinalAnswer { thought, .. } => thought,
        }
    }
}

/// Model output that matches neither branch of the grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Invalid Format: Missing 'Action:' after 'Thought:'")]
    MissingAction,

    #[error("Invalid Format: Missing 'Action Input:' after 'Action:'")]
    MissingActionInput,

    #[error(
        "Parsing LLM output produced both a final answer and a parse-able action. \
         Reply with either an Action or a Final Answer, not both."
    )]
    ActionAndFinalAnswer,

    #[error("Could not parse LLM output: {0}")]
    Unrecognized(String),
}

impl ParseError {
    /// Observation text shown to the model on the next cycle.
    pub fn observation(&self) -> String {
        self.to_string()
    }
}

/// Parse one raw model output.
pub fn parse(text: &str) -> Result<AgentStep, ParseError> {
    let includes_answer = text.contains(FINAL_ANSWER_MARKER);

    if let Some(caps) = ACTION_RE.as_ref().and_then(|re| re.captures(text)) {
        if includes_answer {
            return Err(ParseError::ActionAndFinalAnswer);
        }

        let action_start = caps.get(0).map_or(0, |m| m.start());
        let tool_name = caps.get(1).map_or("", |m| m.as_str()).trim().to_string();
        let raw_input = caps.get(2).map_or("", |m| m.as_str());
        let tool_input = clean_input(raw_input);

        if tool_name.is_empty() {
            return Err(ParseError::MissingAction);
        }

        return Ok(AgentStep::Action {
            tool_name,
            tool_input,
            thought: clean_thought(&text[..action_start]),
        });
    }

    if includes_answer {
        let (before, answer) = match text.rfind(FINAL_ANSWER_MARKER) {
            Some(idx) => (&text[..idx], &text[idx + FINAL_ANSWER_MARKER.len()..]),
            None => ("", text),
        };
        return Ok(AgentStep::FinalAnswer {
            text: answer.trim().to_string(),
            thought: clean_thought(before),
        });
    }

    if !ACTION_ONLY_RE.as_ref().is_some_and(|re| re.is_match(text)) {
        return Err(ParseError::MissingAction);
    }
    if !ACTION_INPUT_RE.as_ref().is_some_and(|re| re.is_match(text)) {
        return Err(ParseError::MissingActionInput);
    }
    Err(ParseError::Unrecognized(text.trim().to_string()))
}

/// Strip surrounding spaces and quotes; drop anything past a hallucinated
/// observation.
fn clean_input(raw: &str) -> String {
    let raw = match raw.find("\nObservation") {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    raw.trim().trim_matches('"').trim().to_string()
}

fn clean_thought(raw: &str) -> String {
    let raw = raw.trim();
    raw.strip_prefix("Thought:").unwrap_or(raw).trim().to_string()
}
