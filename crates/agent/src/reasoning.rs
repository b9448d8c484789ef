//! Reasoning engine — one model completion per call, no state in between.
//!
//! The completion is streamed and accumulated until the stream ends or the
//! `\nObservation:` stop boundary shows up. Deltas are published as `chunk`
//! events for live display, minus a tail that could still turn out to be
//! the start of the stop marker. Published chunks always concatenate to the
//! text handed back for parsing.

use crate::error::AgentError;
use chatmate_core::event::{AgentEvent, EventBus};
use chatmate_core::provider::{ChatMessage, Provider, ProviderRequest, Usage};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// The model must stop here so that observations come from tools, not from
/// the model's imagination.
pub const STOP_SEQUENCE: &str = "\nObservation:";

/// Raw text of one model step.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: Option<Usage>,
}

pub struct ReasoningEngine {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    timeout: Duration,
}

impl ReasoningEngine {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Produce the next reasoning fragment for `messages`.
    pub async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        events: &EventBus,
    ) -> Result<Completion, AgentError> {
        let secs = self.timeout.as_secs();
        match tokio::time::timeout(self.timeout, self.stream_completion(messages, events)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(model = %self.model, timeout_secs = secs, "Model call timed out");
                Err(AgentError::ModelTimeout { secs })
            }
        }
    }

    async fn stream_completion(
        &self,
        messages: Vec<ChatMessage>,
        events: &EventBus,
    ) -> Result<Completion, AgentError> {
        let secs = self.timeout.as_secs();
        let request = ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: true,
            stop: vec![STOP_SEQUENCE.to_string()],
        };

        debug!(provider = %self.provider.name(), model = %self.model, "Requesting reasoning step");

        let mut rx = self
            .provider
            .stream(request)
            .await
            .map_err(|e| AgentError::from_provider(e, secs))?;

        let mut text = String::new();
        let mut published = 0;
        let mut usage = None;

        while let Some(chunk) = rx.recv().await {
            let chunk = chunk.map_err(|e| AgentError::from_provider(e, secs))?;

            if let Some(delta) = chunk.content {
                text.push_str(&delta);

                // Providers that ignore `stop` still get cut at the boundary
                if let Some(cut) = text.find(STOP_SEQUENCE) {
                    text.truncate(cut);
                    break;
                }
                publish_up_to(events, &text, &mut published, held_back_end(&text));
            }

            if chunk.usage.is_some() {
                usage = chunk.usage;
            }
            if chunk.done {
                break;
            }
        }

        publish_up_to(events, &text, &mut published, text.len());
        Ok(Completion { text, usage })
    }
}

/// End of the text that cannot be the start of a split stop marker.
fn held_back_end(text: &str) -> usize {
    let mut end = text.len().saturating_sub(STOP_SEQUENCE.len() - 1);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    end
}

fn publish_up_to(events: &EventBus, text: &str, published: &mut usize, end: usize) {
    if end > *published {
        events.publish(AgentEvent::Chunk {
            content: text[*published..end].to_string(),
        });
        *published = end;
    }
}
