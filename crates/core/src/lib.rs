//! # Chat-Mate Core
//!
//! Domain types, traits, and error definitions for the Chat-Mate search agent.
//! This crate has **no transport dependencies**: it defines the domain model
//! that the provider, tool, and agent crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (language model, knowledge source) is a trait
//! here. Implementations live in their respective crates, which keeps the
//! agent loop testable with scripted mocks.

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{ProviderError, RegistryError, ToolError};
pub use event::{AgentEvent, EventBus, TurnStatus};
pub use message::{ConversationId, Message, Role, TranscriptStore};
pub use provider::{
    ChatMessage, ChatRole, Provider, ProviderRequest, ProviderResponse, StreamChunk, Usage,
};
pub use tool::{KnowledgeSource, ToolKind, ToolRegistry, ToolRegistryBuilder, ToolSpec};
