//! Errors that abort a turn.
//!
//! Parse errors, unknown tools and tool failures are not here: the
//! controller turns them into observations and keeps going.

use chatmate_core::ProviderError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AgentError {
    /// Bad or missing credentials, rate limiting, network or provider failure.
    #[error("Model unavailable: {0}")]
    ModelUnavailable(ProviderError),

    #[error("Model did not respond within {secs}s")]
    ModelTimeout { secs: u64 },

    /// The caller cancelled the turn.
    #[error("Turn cancelled")]
    Cancelled,
}

impl AgentError {
    /// Classify a provider failure.
    pub fn from_provider(err: ProviderError, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            AgentError::ModelTimeout { secs: timeout_secs }
        } else {
            AgentError::ModelUnavailable(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_timeout_becomes_model_timeout() {
        let err = AgentError::from_provider(ProviderError::Timeout("read".into()), 60);
        assert!(matches!(err, AgentError::ModelTimeout { secs: 60 }));
    }

    #[test]
    fn auth_failure_becomes_unavailable() {
        let err = AgentError::from_provider(
            ProviderError::AuthenticationFailed("bad key".into()),
            60,
        );
        assert!(matches!(err, AgentError::ModelUnavailable(_)));
        assert!(err.to_string().contains("bad key"));
    }
}
