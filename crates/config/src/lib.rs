//! Configuration loading, validation, and management for Chat-Mate.
//!
//! Loads configuration from `~/.chatmate/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use chatmate_core::ToolKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.chatmate/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the model provider (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Agent loop limits
    #[serde(default)]
    pub agent: AgentConfig,

    /// Knowledge tool settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

const REDACTED: &str = "[REDACTED]";

fn default_provider() -> String {
    "groq".into()
}
fn default_model() -> String {
    "llama3-8b-8192".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_true() -> bool {
    true
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => REDACTED,
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("agent", &self.agent)
            .field("tools", &self.tools)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

/// Limits and policies for the reasoning/acting loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Tool actions allowed per turn
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Unparseable model outputs tolerated per turn
    #[serde(default = "default_max_parse_errors")]
    pub max_parse_errors: usize,

    /// Transcript retention window; unbounded when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_context_messages: Option<usize>,

    /// Append degraded (fallback) answers to the transcript
    #[serde(default = "default_true")]
    pub record_fallback_answers: bool,

    /// Per-call timeout for the reasoning engine
    #[serde(default = "default_model_timeout")]
    pub model_timeout_secs: u64,

    /// Assistant message that opens every session
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

fn default_max_iterations() -> usize {
    15
}
fn default_max_parse_errors() -> usize {
    3
}
fn default_model_timeout() -> u64 {
    60
}
fn default_greeting() -> String {
    "Hi, I'm Chat-Mate. How can I help you?".into()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_parse_errors: default_max_parse_errors(),
            max_context_messages: None,
            record_fallback_answers: true,
            model_timeout_secs: default_model_timeout(),
            greeting: default_greeting(),
        }
    }
}

/// Per-tool settings, one table per knowledge source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub search: ToolConfig,

    #[serde(default)]
    pub arxiv: ToolConfig,

    #[serde(default)]
    pub wikipedia: ToolConfig,
}

impl ToolsConfig {
    pub fn get(&self, kind: ToolKind) -> &ToolConfig {
        match kind {
            ToolKind::WebSearch => &self.search,
            ToolKind::Arxiv => &self.arxiv,
            ToolKind::Wikipedia => &self.wikipedia,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Top-k results requested from the source
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,

    /// Character cap on the observation; the tool's own default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_char_limit: Option<usize>,

    #[serde(default = "default_tool_timeout")]
    pub timeout_secs: u64,

    /// Override the source's endpoint (mirrors, tests)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

fn default_result_limit() -> usize {
    1
}
fn default_tool_timeout() -> u64 {
    20
}

impl ToolConfig {
    /// Effective character cap for a tool of `kind`.
    pub fn char_limit_for(&self, kind: ToolKind) -> usize {
        self.result_char_limit
            .unwrap_or_else(|| kind.default_char_limit())
    }
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            result_limit: default_result_limit(),
            result_char_limit: None,
            timeout_secs: default_tool_timeout(),
            base_url: None,
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.chatmate/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `CHATMATE_API_KEY` (highest priority)
    /// - `GROQ_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    ///
    /// The key is only taken from the environment when the file left it unset.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.api_key.is_none() {
            self.api_key = lookup("CHATMATE_API_KEY")
                .or_else(|| lookup("GROQ_API_KEY"))
                .or_else(|| lookup("OPENAI_API_KEY"))
                .filter(|k| !k.trim().is_empty());
        }

        if let Some(provider) = lookup("CHATMATE_PROVIDER") {
            self.default_provider = provider;
        }

        if let Some(model) = lookup("CHATMATE_MODEL") {
            if let Some(provider) = self.providers.get_mut(&self.default_provider) {
                provider.default_model = Some(model.clone());
            }
            self.default_model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".chatmate")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }

        for kind in ToolKind::ALL {
            let tool = self.tools.get(kind);
            if tool.result_char_limit == Some(0) {
                return Err(ConfigError::ValidationError(format!(
                    "tools.{}.result_char_limit must be at least 1",
                    tool_table(kind)
                )));
            }
            if tool.result_limit == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "tools.{}.result_limit must be at least 1",
                    tool_table(kind)
                )));
            }
        }

        Ok(())
    }

    /// Model for the default provider: its `[providers.<name>]` table's
    /// `default_model`, else the top-level `default_model`.
    pub fn effective_model(&self) -> &str {
        self.providers
            .get(&self.default_provider)
            .and_then(|p| p.default_model.as_deref())
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(&self.default_model)
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// A copy with every API key replaced by a placeholder, for display.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.api_key.is_some() {
            config.api_key = Some(REDACTED.into());
        }
        for provider in config.providers.values_mut() {
            if provider.api_key.is_some() {
                provider.api_key = Some(REDACTED.into());
            }
        }
        config
    }

    /// Generate a default config TOML string (for `config --init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn tool_table(kind: ToolKind) -> &'static str {
    match kind {
        ToolKind::WebSearch => "search",
        ToolKind::Arxiv => "arxiv",
        ToolKind::Wikipedia => "wikipedia",
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            agent: AgentConfig::default(),
            tools: ToolsConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.default_provider, "groq");
        assert_eq!(config.default_model, "llama3-8b-8192");
        assert_eq!(config.agent.max_iterations, 15);
        assert_eq!(config.agent.max_parse_errors, 3);
        assert!(config.agent.record_fallback_answers);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.default_provider, config.default_provider);
        assert_eq!(parsed.agent.greeting, config.agent.greeting);
    }

    #[test]
    fn per_tool_char_limit_defaults() {
        let tools = ToolsConfig::default();
        assert_eq!(tools.arxiv.char_limit_for(ToolKind::Arxiv), 200);
        assert_eq!(tools.wikipedia.char_limit_for(ToolKind::Wikipedia), 200);
        assert_eq!(tools.search.char_limit_for(ToolKind::WebSearch), 1000);
    }

    #[test]
    fn partial_tool_table_keeps_defaults() {
        let toml_str = r#"
[tools.arxiv]
enabled = false

[tools.wikipedia]
result_char_limit = 500
result_limit = 2
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert!(!config.tools.arxiv.enabled);
        assert_eq!(config.tools.arxiv.char_limit_for(ToolKind::Arxiv), 200);
        assert_eq!(config.tools.wikipedia.char_limit_for(ToolKind::Wikipedia), 500);
        assert_eq!(config.tools.wikipedia.result_limit, 2);
        assert!(config.tools.search.enabled);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            default_temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_iterations_rejected() {
        let mut config = AppConfig::default();
        config.agent.max_iterations = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_iterations"));
    }

    #[test]
    fn zero_char_limit_rejected() {
        let mut config = AppConfig::default();
        config.tools.search.result_char_limit = Some(0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("tools.search"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.default_provider, "groq");
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
default_model = "llama-3.1-8b-instant"

[agent]
max_iterations = 5
max_context_messages = 20
record_fallback_answers = false
"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.default_model, "llama-3.1-8b-instant");
        assert_eq!(config.agent.max_iterations, 5);
        assert_eq!(config.agent.max_parse_errors, 3);
        assert_eq!(config.agent.max_context_messages, Some(20));
        assert!(!config.agent.record_fallback_answers);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_temperature = \"hot\"").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn invalid_file_values_rejected_on_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[agent]\nmax_iterations = 0").unwrap();
        let err = AppConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn env_key_precedence() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(env(&[
            ("GROQ_API_KEY", "gsk-groq"),
            ("OPENAI_API_KEY", "sk-openai"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("gsk-groq"));

        let mut config = AppConfig::default();
        config.apply_env_overrides(env(&[
            ("CHATMATE_API_KEY", "cm-key"),
            ("GROQ_API_KEY", "gsk-groq"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("cm-key"));
    }

    #[test]
    fn file_key_wins_over_env() {
        let mut config = AppConfig {
            api_key: Some("from-file".into()),
            ..AppConfig::default()
        };
        config.apply_env_overrides(env(&[("CHATMATE_API_KEY", "from-env")]));
        assert_eq!(config.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn env_overrides_provider_and_model() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(env(&[
            ("CHATMATE_PROVIDER", "ollama"),
            ("CHATMATE_MODEL", "llama3"),
        ]));
        assert_eq!(config.default_provider, "ollama");
        assert_eq!(config.default_model, "llama3");
        assert!(!config.has_api_key());
    }

    #[test]
    fn provider_table_model_wins_over_top_level() {
        let toml_str = r#"
default_provider = "openai"
default_model = "llama3-8b-8192"

[providers.openai]
default_model = "gpt-4o-mini"

[providers.groq]
default_model = "mixtral-8x7b-32768"
"#;
        let mut config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.effective_model(), "gpt-4o-mini");

        config.default_provider = "ollama".into();
        assert_eq!(config.effective_model(), "llama3-8b-8192");

        config.default_provider = "openai".into();
        config.apply_env_overrides(env(&[("CHATMATE_MODEL", "gpt-4o")]));
        assert_eq!(config.effective_model(), "gpt-4o");
    }

    #[test]
    fn debug_redacts_keys() {
        let mut config = AppConfig {
            api_key: Some("gsk-secret".into()),
            ..AppConfig::default()
        };
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                api_key: Some("sk-secret".into()),
                ..ProviderConfig::default()
            },
        );
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn redacted_hides_every_key() {
        let mut config = AppConfig {
            api_key: Some("gsk-secret".into()),
            ..AppConfig::default()
        };
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                api_key: Some("sk-secret".into()),
                ..ProviderConfig::default()
            },
        );

        let shown = toml::to_string_pretty(&config.redacted()).unwrap();
        assert!(!shown.contains("secret"));
        assert!(shown.contains("[REDACTED]"));
        assert_eq!(config.api_key.as_deref(), Some("gsk-secret"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("groq"));
        assert!(toml_str.contains("max_parse_errors"));
        assert!(toml_str.contains("Chat-Mate"));
    }
}
