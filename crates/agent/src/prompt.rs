//! Prompt assembly for one reasoning cycle.
//!
//! The system message carries the framing, the tool catalog and the output
//! grammar. The user message carries earlier conversation, the current
//! question and the scratchpad, ending in `Thought:` so the model picks up
//! where its trace left off.

use crate::scratchpad::Scratchpad;
use chatmate_core::message::{Message, Role};
use chatmate_core::provider::ChatMessage;
use chatmate_core::tool::ToolRegistry;

const PREAMBLE: &str = "You are Chat-Mate, a helpful search assistant. \
Answer the following questions as best you can. You have access to the following tools:";

const SUFFIX: &str = "Begin!";

/// Instructions, tool catalog and format grammar.
pub fn system_prompt(tools: &ToolRegistry) -> String {
    let catalog = tools
        .specs()
        .map(|spec| format!("{}: {}", spec.name(), spec.description()))
        .collect::<Vec<_>>()
        .join("\n");
    let names = tools.names().join(", ");

    format!(
        "{PREAMBLE}\n\n\
         {catalog}\n\n\
         Use the following format:\n\n\
         Question: the input question you must answer\n\
         Thought: you should always think about what to do\n\
         Action: the action to take, should be one of [{names}]\n\
         Action Input: the input to the action\n\
         Observation: the result of the action\n\
         ... (this Thought/Action/Action Input/Observation can repeat N times)\n\
         Thought: I now know the final answer\n\
         Final Answer: the final answer to the original input question\n\n\
         {SUFFIX}"
    )
}

/// Build the full message list for the next engine call.
///
/// `history` must end with the current user message; everything before it
/// is rendered as prior conversation.
pub fn build_messages(
    tools: &ToolRegistry,
    history: &[Message],
    scratchpad: &Scratchpad,
) -> Vec<ChatMessage> {
    let (question, earlier) = match history.split_last() {
        Some((last, earlier)) if last.role() == Role::User => (last.content(), earlier),
        _ => ("", history),
    };

    let mut body = String::new();
    if !earlier.is_empty() {
        body.push_str("Previous conversation:\n");
        for message in earlier {
            body.push_str(message.role().label());
            body.push_str(": ");
            body.push_str(message.content());
            body.push('\n');
        }
        body.push('\n');
    }
    body.push_str("Question: ");
    body.push_str(question);
    body.push_str("\nThought:");
    body.push_str(&scratchpad.render());

    vec![ChatMessage::system(system_prompt(tools)), ChatMessage::user(body)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ScriptedSource, registry_with};
    use chatmate_core::provider::ChatRole;

    fn registry() -> std::sync::Arc<ToolRegistry> {
        registry_with(
            ScriptedSource::ok("a"),
            ScriptedSource::ok("b"),
            ScriptedSource::ok("c"),
        )
    }

    #[test]
    fn system_prompt_lists_every_tool() {
        let prompt = system_prompt(&registry());
        assert!(prompt.contains("Search: A wrapper around DuckDuckGo Search."));
        assert!(prompt.contains("arxiv: A wrapper around arxiv.org."));
        assert!(prompt.contains("wikipedia: A wrapper around Wikipedia."));
        assert!(prompt.contains("should be one of [Search, arxiv, wikipedia]"));
        assert!(prompt.ends_with("Begin!"));
    }

    #[test]
    fn first_cycle_ends_at_thought() {
        let history = vec![Message::user("What is the capital of France?")];
        let messages = build_messages(&registry(), &history, &Scratchpad::new());

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::System);
        assert_eq!(
            messages[1].content,
            "Question: What is the capital of France?\nThought:"
        );
    }

    #[test]
    fn prior_turns_and_scratchpad_are_rendered() {
        let history = vec![
            Message::assistant("Hi, I'm Chat-Mate. How can I help you?"),
            Message::user("Who wrote Dune?"),
            Message::assistant("Frank Herbert."),
            Message::user("When was it published?"),
        ];
        let mut pad = Scratchpad::new();
        pad.push_action(
            " look it up\nAction: wikipedia\nAction Input: Dune novel",
            "look it up",
            "wikipedia",
            "Dune novel",
            "Page: Dune (novel)",
            true,
        );

        let messages = build_messages(&registry(), &history, &pad);
        let body = &messages[1].content;
        assert!(body.starts_with("Previous conversation:\nAssistant: Hi, I'm Chat-Mate."));
        assert!(body.contains("User: Who wrote Dune?\nAssistant: Frank Herbert.\n"));
        assert!(body.contains("Question: When was it published?\nThought: look it up"));
        assert!(body.ends_with("Observation: Page: Dune (novel)\nThought: "));
        assert!(!body.contains("User: When was it published?"));
    }
}
