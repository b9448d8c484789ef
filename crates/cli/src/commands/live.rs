//! Live display of agent events for `--stream`.
//!
//! Watches a session's event bus and echoes model tokens and tool traffic
//! to stderr while one turn runs. The display ends with the turn's `done` or
//! `error` event; the command waits for it before printing the answer.

use chatmate_core::event::{AgentEvent, EventBus};
use std::io::Write;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

const PREVIEW_CHARS: usize = 160;

/// Display one turn. Subscribe before the turn starts.
pub fn spawn(events: &EventBus) -> JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(text) = describe(&event) {
                        eprint!("{text}");
                        let _ = std::io::stderr().flush();
                    }
                    if ends_turn(&event) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Live display fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Text to show for one event, if any.
pub fn describe(event: &AgentEvent) -> Option<String> {
    match event {
        AgentEvent::Chunk { content } => Some(content.clone()),
        AgentEvent::Thought { .. } => None,
        AgentEvent::ToolCall { name, input } => Some(format!("\n  [{name}] {input}\n")),
        AgentEvent::ToolResult {
            name,
            output,
            success,
        } => {
            let mark = if *success { "ok" } else { "failed" };
            Some(format!("  [{name} {mark}] {}\n", preview(output)))
        }
        AgentEvent::ParseError { message, count } => {
            Some(format!("\n  [parse error #{count}] {message}\n"))
        }
        AgentEvent::Done {
            iterations,
            tool_calls,
            ..
        } => Some(format!("\n  [done: {iterations} steps, {tool_calls} tool calls]\n")),
        AgentEvent::Error { message } => Some(format!("\n  [error] {message}\n")),
    }
}

fn ends_turn(event: &AgentEvent) -> bool {
    matches!(event, AgentEvent::Done { .. } | AgentEvent::Error { .. })
}

fn preview(text: &str) -> String {
    let flat = text.replace('\n', " ");
    match flat.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}…", &flat[..idx]),
        None => flat,
    }
}
