//! Session — one conversation with its own transcript.
//!
//! A session takes turns strictly one at a time (`&mut self`). Any number of
//! sessions can share one controller, and with it the reasoning engine and
//! the tool registry. Each session publishes its turns on its own event bus,
//! so a subscriber only ever sees its own conversation.

use crate::controller::{AgentController, TurnOutcome};
use crate::error::AgentError;
use chatmate_config::AppConfig;
use chatmate_core::event::{EventBus, TurnStatus};
use chatmate_core::message::{ConversationId, Message, TranscriptStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct Session {
    id: ConversationId,
    transcript: TranscriptStore,
    controller: Arc<AgentController>,
    events: EventBus,
    record_fallback_answers: bool,
}

impl Session {
    pub fn new(controller: Arc<AgentController>) -> Self {
        Self {
            id: ConversationId::new(),
            transcript: TranscriptStore::new(),
            controller,
            events: EventBus::default(),
            record_fallback_answers: true,
        }
    }

    /// Session with retention, fallback policy and greeting from config.
    pub fn from_config(config: &AppConfig, controller: Arc<AgentController>) -> Self {
        let mut session = Self::new(controller)
            .with_fallback_recording(config.agent.record_fallback_answers);
        if let Some(max) = config.agent.max_context_messages {
            session = session.with_max_context_messages(max);
        }
        session.with_greeting(&config.agent.greeting)
    }

    /// Open the conversation with an assistant message. Blank greetings are
    /// skipped.
    pub fn with_greeting(mut self, greeting: &str) -> Self {
        if !greeting.trim().is_empty() {
            self.transcript.append(Message::assistant(greeting));
        }
        self
    }

    /// Retain at most `max` messages, dropping the oldest first.
    pub fn with_max_context_messages(mut self, max: usize) -> Self {
        let mut transcript = TranscriptStore::with_max_context_messages(max);
        for message in self.transcript.snapshot() {
            transcript.append(message);
        }
        self.transcript = transcript;
        self
    }

    /// Whether degraded answers are written to the transcript.
    pub fn with_fallback_recording(mut self, record: bool) -> Self {
        self.record_fallback_answers = record;
        self
    }

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    pub fn transcript(&self) -> &TranscriptStore {
        &self.transcript
    }

    pub fn controller(&self) -> &AgentController {
        &self.controller
    }

    /// Events for this conversation's turns.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Run one turn to completion.
    pub async fn ask(&mut self, question: &str) -> Result<TurnOutcome, AgentError> {
        self.ask_with_cancel(question, &CancellationToken::new()).await
    }

    /// Run one turn, abandoning it when `cancel` fires.
    ///
    /// The user message is always recorded. An assistant message is recorded
    /// for a final answer, and for a fallback answer when fallback recording
    /// is on. Aborted turns record nothing more.
    pub async fn ask_with_cancel(
        &mut self,
        question: &str,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, AgentError> {
        self.transcript.append(Message::user(question));
        let history = self.transcript.snapshot();
        debug!(conversation = %self.id, history = history.len(), "Turn submitted");

        let outcome = self
            .controller
            .run(&history, &self.id, &self.events, cancel)
            .await?;

        if outcome.status == TurnStatus::Answered || self.record_fallback_answers {
            self.transcript.append(Message::assistant(outcome.answer.clone()));
        } else {
            info!(status = %outcome.status, "Fallback answer not recorded");
        }
        Ok(outcome)
    }
}
