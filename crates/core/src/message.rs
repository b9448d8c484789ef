//! Message and transcript domain types.
//!
//! A session's history is an append-only sequence of user and assistant
//! messages. Tool traffic and reasoning never land here; they live in the
//! per-turn scratchpad owned by the agent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

/// Unique identifier for a conversation (session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The search assistant
    Assistant,
}

impl Role {
    /// Label used when rendering history into a prompt.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// A single message in a conversation.
///
/// Fields are private: a message cannot change after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: String,
    role: Role,
    content: String,
    timestamp: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content.into())
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content.into())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Ordered conversation history for one session.
///
/// `append` is the only mutation. With a retention window configured, the
/// oldest messages are evicted first once the window is full; the newest
/// message is always kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptStore {
    messages: VecDeque<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_context_messages: Option<usize>,
    /// Messages ever appended, including evicted ones.
    appended: u64,
}

impl TranscriptStore {
    /// Create an unbounded transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transcript that retains at most `max` messages.
    ///
    /// A window of zero is treated as one so the latest message survives.
    pub fn with_max_context_messages(max: usize) -> Self {
        Self {
            max_context_messages: Some(max.max(1)),
            ..Self::default()
        }
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push_back(message);
        self.appended += 1;

        if let Some(max) = self.max_context_messages {
            while self.messages.len() > max {
                self.messages.pop_front();
            }
        }
    }

    /// A copy of the retained history, oldest first.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    /// The most recent message, if any.
    pub fn last(&self) -> Option<&Message> {
        self.messages.back()
    }

    /// Number of retained messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Total number of messages appended over the session's lifetime.
    pub fn total_appended(&self) -> u64 {
        self.appended
    }

    pub fn max_context_messages(&self) -> Option<usize> {
        self.max_context_messages
    }
}
