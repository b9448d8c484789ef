//! Agent controller — the Thought → Action → Observation loop for one turn.
//!
//! Each cycle builds a prompt from the conversation, the tool catalog and
//! the scratchpad, asks the reasoning engine for one step and parses it:
//!
//! - **Final Answer**: the turn ends with [`TurnStatus::Answered`].
//! - **Action** on a registered tool: the tool runs and its output (or a
//!   description of its failure) becomes the next observation.
//! - **Action** on an unknown tool, or unparseable output: a corrective
//!   observation is added and the parse error count goes up.
//!
//! Two budgets bound the loop. More than `max_parse_errors` parse errors
//! ends the turn with the last raw output as the answer. `max_iterations`
//! executed actions ends it with an answer assembled from the latest
//! observations. Model failures and cancellation abort the turn.

use crate::error::AgentError;
use crate::parser::{self, AgentStep};
use crate::prompt;
use crate::reasoning::ReasoningEngine;
use crate::scratchpad::{Scratchpad, ScratchpadEntry};
use chatmate_config::AppConfig;
use chatmate_core::error::ToolError;
use chatmate_core::event::{AgentEvent, EventBus, TurnStatus};
use chatmate_core::message::{ConversationId, Message};
use chatmate_core::provider::{Provider, Usage};
use chatmate_core::tool::ToolRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_ITERATIONS: usize = 15;
pub const DEFAULT_MAX_PARSE_ERRORS: usize = 3;

/// Observations quoted in an iteration-cap fallback answer.
const FALLBACK_OBSERVATIONS: usize = 3;

pub struct AgentController {
    engine: ReasoningEngine,
    tools: Arc<ToolRegistry>,
    max_iterations: usize,
    max_parse_errors: usize,
}

/// How one turn ended.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Final answer, or the best-effort fallback when degraded.
    pub answer: String,
    pub status: TurnStatus,
    /// Reasoning engine calls made.
    pub iterations: usize,
    /// Tool invocations, successful or not.
    pub tool_calls: usize,
    pub parse_errors: usize,
    pub usage: Option<Usage>,
    /// The discarded scratchpad, for inspection.
    pub trace: Vec<ScratchpadEntry>,
}

/// Per-turn loop state.
#[derive(Default)]
struct TurnState {
    scratchpad: Scratchpad,
    iterations: usize,
    tool_calls: usize,
    parse_errors: usize,
    usage: Option<Usage>,
}

impl AgentController {
    pub fn new(engine: ReasoningEngine, tools: Arc<ToolRegistry>) -> Self {
        Self {
            engine,
            tools,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_parse_errors: DEFAULT_MAX_PARSE_ERRORS,
        }
    }

    /// Wire a controller from the `[agent]` table and model defaults.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        let engine = ReasoningEngine::new(provider, config.effective_model())
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens)
            .with_timeout(Duration::from_secs(config.agent.model_timeout_secs.max(1)));

        Self::new(engine, tools)
            .with_max_iterations(config.agent.max_iterations)
            .with_max_parse_errors(config.agent.max_parse_errors)
    }

    /// Set the action budget. At least one action is always allowed.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn with_max_parse_errors(mut self, max: usize) -> Self {
        self.max_parse_errors = max;
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn engine(&self) -> &ReasoningEngine {
        &self.engine
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Run one turn. `history` must end with the user's question.
    ///
    /// Progress is published on `events`, which belongs to the caller's
    /// conversation; the controller itself holds no per-conversation state.
    pub async fn run(
        &self,
        history: &[Message],
        conversation_id: &ConversationId,
        events: &EventBus,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, AgentError> {
        let mut state = TurnState::default();

        info!(
            conversation = %conversation_id,
            model = %self.engine.model(),
            max_iterations = self.max_iterations,
            max_parse_errors = self.max_parse_errors,
            "Turn starting"
        );

        loop {
            if cancel.is_cancelled() {
                return Err(abort(events, AgentError::Cancelled));
            }

            if state.tool_calls >= self.max_iterations {
                warn!(tool_calls = state.tool_calls, "Iteration cap reached");
                let answer = self.iteration_fallback(&state.scratchpad);
                return Ok(finish(
                    conversation_id,
                    events,
                    state,
                    answer,
                    TurnStatus::MaxIterationsExceeded,
                ));
            }

            state.iterations += 1;
            let messages = prompt::build_messages(&self.tools, history, &state.scratchpad);
            debug!(iteration = state.iterations, "Awaiting step");

            let completion = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(abort(events, AgentError::Cancelled)),
                result = self.engine.complete(messages, events) => {
                    result.map_err(|e| abort(events, e))?
                }
            };
            if let Some(u) = &completion.usage {
                state.usage.get_or_insert_with(Usage::default).add(u);
            }

            let step = match parser::parse(&completion.text) {
                Ok(step) => step,
                Err(err) => {
                    let observation = err.observation();
                    if self.record_parse_error(events, &mut state, &completion.text, &observation) {
                        return Ok(finish(
                            conversation_id,
                            events,
                            state,
                            completion.text,
                            TurnStatus::MaxParseErrorsExceeded,
                        ));
                    }
                    continue;
                }
            };

            if !step.thought().is_empty() {
                events.publish(AgentEvent::Thought {
                    content: step.thought().to_string(),
                });
            }

            let (tool_name, tool_input, thought) = match step {
                AgentStep::FinalAnswer { text, .. } => {
                    return Ok(finish(conversation_id, events, state, text, TurnStatus::Answered));
                }
                AgentStep::Action {
                    tool_name,
                    tool_input,
                    thought,
                } => (tool_name, tool_input, thought),
            };

            let Some(spec) = self.tools.get(&tool_name) else {
                let observation = format!(
                    "{tool_name} is not a valid tool, try one of [{}].",
                    self.tools.names().join(", ")
                );
                if self.record_parse_error(events, &mut state, &completion.text, &observation) {
                    return Ok(finish(
                        conversation_id,
                        events,
                        state,
                        completion.text,
                        TurnStatus::MaxParseErrorsExceeded,
                    ));
                }
                continue;
            };

            state.tool_calls += 1;
            info!(tool = %spec.name(), input = %tool_input, "Calling tool");
            events.publish(AgentEvent::ToolCall {
                name: spec.name().to_string(),
                input: tool_input.clone(),
            });

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(abort(events, AgentError::Cancelled)),
                result = spec.invoke(&tool_input) => result,
            };

            let (observation, success) = match result {
                Ok(output) => (output, true),
                Err(err) => {
                    warn!(tool = %spec.name(), error = %err, "Tool failed");
                    (failure_observation(spec.name(), &err), false)
                }
            };

            events.publish(AgentEvent::ToolResult {
                name: spec.name().to_string(),
                output: observation.clone(),
                success,
            });
            state.scratchpad.push_action(
                &completion.text,
                &thought,
                spec.name(),
                &tool_input,
                &observation,
                success,
            );
        }
    }

    /// Count a parse error and add its corrective observation. Returns
    /// `true` when the budget is spent and the turn must end.
    fn record_parse_error(
        &self,
        events: &EventBus,
        state: &mut TurnState,
        raw: &str,
        observation: &str,
    ) -> bool {
        state.parse_errors += 1;
        warn!(count = state.parse_errors, error = %observation, "Unusable model output");
        events.publish(AgentEvent::ParseError {
            message: observation.to_string(),
            count: state.parse_errors,
        });

        if state.parse_errors > self.max_parse_errors {
            return true;
        }
        state.scratchpad.push_parse_error(raw, observation);
        false
    }

    fn iteration_fallback(&self, scratchpad: &Scratchpad) -> String {
        let recent = scratchpad.recent_observations(FALLBACK_OBSERVATIONS);
        if recent.is_empty() {
            return format!(
                "I could not reach a final answer within {} steps, and none of the tool \
                 calls returned anything useful.",
                self.max_iterations
            );
        }
        format!(
            "I could not reach a final answer within {} steps. Here is what I found:\n\n{}",
            self.max_iterations,
            recent.join("\n\n")
        )
    }
}

fn finish(
    conversation_id: &ConversationId,
    events: &EventBus,
    state: TurnState,
    answer: String,
    status: TurnStatus,
) -> TurnOutcome {
    info!(
        status = %status,
        iterations = state.iterations,
        tool_calls = state.tool_calls,
        parse_errors = state.parse_errors,
        "Turn finished"
    );
    events.publish(AgentEvent::Done {
        conversation_id: conversation_id.to_string(),
        status,
        iterations: state.iterations,
        tool_calls: state.tool_calls,
        usage: state.usage,
    });

    TurnOutcome {
        answer,
        status,
        iterations: state.iterations,
        tool_calls: state.tool_calls,
        parse_errors: state.parse_errors,
        usage: state.usage,
        trace: state.scratchpad.entries().to_vec(),
    }
}

fn abort(events: &EventBus, err: AgentError) -> AgentError {
    warn!(error = %err, "Turn aborted");
    events.publish(AgentEvent::Error {
        message: err.to_string(),
    });
    err
}

/// What the model sees when a tool call fails.
fn failure_observation(tool: &str, err: &ToolError) -> String {
    let cause = match err {
        ToolError::ExecutionFailed { cause, .. } => cause.clone(),
        other => other.to_string(),
    };
    format!("The {tool} tool is unavailable right now ({cause}). Try another tool or a different query.")
}
