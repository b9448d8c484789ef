//! The Chat-Mate agent — a ReAct loop over text completions.
//!
//! One turn runs as:
//!
//! 1. **Record** the user message in the session transcript
//! 2. **Prompt** the model with the tool catalog, the conversation and the
//!    scratchpad so far
//! 3. **Parse** the reply into an `Action` or a `Final Answer`
//! 4. **If Action**: run the tool, add the observation, loop back to step 2
//! 5. **If Final Answer**: record it and return
//!
//! Malformed replies are corrected in-loop up to `max_parse_errors` times,
//! and at most `max_iterations` tool actions run per turn. Either budget
//! running out ends the turn with a best-effort answer.

pub mod controller;
pub mod error;
pub mod parser;
pub mod prompt;
pub mod reasoning;
pub mod scratchpad;
pub mod session;

#[cfg(test)]
mod test_helpers;

pub use controller::{AgentController, TurnOutcome};
pub use error::AgentError;
pub use parser::{AgentStep, ParseError};
pub use reasoning::{Completion, ReasoningEngine, STOP_SEQUENCE};
pub use scratchpad::{Scratchpad, ScratchpadEntry};
pub use session::Session;
