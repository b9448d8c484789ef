//! Error types for the Chat-Mate domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Whether this failure is a timeout rather than an availability problem.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool execution failed: {tool_name} — {cause}")]
    ExecutionFailed { tool_name: String, cause: String },

    #[error("Invalid tool input: {0}")]
    InvalidInput(String),
}

impl ToolError {
    /// Build an `ExecutionFailed` from any displayable cause.
    pub fn execution(tool_name: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::ExecutionFailed {
            tool_name: tool_name.into(),
            cause: cause.to_string(),
        }
    }
}

/// Rejected tool registrations. Raised once, at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("tool name must not be empty or whitespace: {name:?}")]
    InvalidName { name: String },

    #[error("duplicate tool name: {name}")]
    DuplicateName { name: String },

    #[error("tool {name} must have a result_char_limit of at least 1")]
    InvalidCharLimit { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        };
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn tool_error_displays_correctly() {
        let err = ToolError::execution("arxiv", "connection reset");
        assert!(err.to_string().contains("arxiv"));
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn only_timeout_is_timeout() {
        assert!(ProviderError::Timeout("60s".into()).is_timeout());
        assert!(!ProviderError::Network("dns".into()).is_timeout());
    }
}
