pub mod ask;
pub mod chat;
pub mod config_cmd;
pub mod live;
pub mod tools;

use chatmate_agent::{AgentController, Session, TurnOutcome};
use chatmate_config::AppConfig;
use std::path::Path;
use std::sync::Arc;

/// Load config from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => {
            let mut config = AppConfig::load_from(path)?;
            config.apply_env_overrides(|key| std::env::var(key).ok());
            config.validate()?;
            config
        }
        None => AppConfig::load()?,
    };
    Ok(config)
}

/// Wire provider, tools and controller from config.
///
/// A missing API key does not stop startup; the first model call reports it.
pub fn build_controller(config: &AppConfig) -> Result<Arc<AgentController>, Box<dyn std::error::Error>> {
    let router = chatmate_providers::build_from_config(config);
    let provider = router
        .default_provider()
        .ok_or_else(|| format!("Provider '{}' is not configured", config.default_provider))?;
    let tools = Arc::new(chatmate_tools::default_registry(&config.tools)?);

    if !config.has_api_key() {
        tracing::warn!(
            provider = %config.default_provider,
            "No API key configured; set CHATMATE_API_KEY or GROQ_API_KEY"
        );
    }

    Ok(Arc::new(AgentController::from_config(config, provider, tools)))
}

pub fn new_session(config: &AppConfig) -> Result<Session, Box<dyn std::error::Error>> {
    Ok(Session::from_config(config, build_controller(config)?))
}

/// Answer text, with the failure mode noted for fallback answers.
pub fn format_answer(outcome: &TurnOutcome) -> String {
    if outcome.status.is_degraded() {
        format!("{}\n\n[fallback: {}]", outcome.answer, outcome.status)
    } else {
        outcome.answer.clone()
    }
}
