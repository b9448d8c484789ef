//! Tool adapter — uniform access to the agent's knowledge sources.
//!
//! Every tool is a [`KnowledgeSource`] wrapped in a [`ToolSpec`] that fixes
//! its name, description, result size and timeout. Specs are collected into
//! a [`ToolRegistry`] once at startup and never change afterwards, so a
//! registry can be shared across sessions behind an `Arc` without locking.

use crate::error::{RegistryError, ToolError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// The closed set of knowledge tools the agent understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// General web search (DuckDuckGo).
    WebSearch,
    /// Scientific paper index (arXiv).
    Arxiv,
    /// Encyclopedia lookup (Wikipedia).
    Wikipedia,
}

impl ToolKind {
    pub const ALL: [ToolKind; 3] = [ToolKind::WebSearch, ToolKind::Arxiv, ToolKind::Wikipedia];

    /// Name the model uses to select this tool.
    pub fn default_name(&self) -> &'static str {
        match self {
            ToolKind::WebSearch => "Search",
            ToolKind::Arxiv => "arxiv",
            ToolKind::Wikipedia => "wikipedia",
        }
    }

    /// Description shown to the model in the tool catalog.
    pub fn default_description(&self) -> &'static str {
        match self {
            ToolKind::WebSearch => {
                "A wrapper around DuckDuckGo Search. Useful for when you need to answer \
                 questions about current events. Input should be a search query."
            }
            ToolKind::Arxiv => {
                "A wrapper around arxiv.org. Useful for when you need to answer questions \
                 about Physics, Mathematics, Computer Science, Quantitative Biology, \
                 Quantitative Finance, Statistics, Electrical Engineering, and Economics \
                 from scientific articles on arxiv.org. Input should be a search query."
            }
            ToolKind::Wikipedia => {
                "A wrapper around Wikipedia. Useful for when you need to answer general \
                 questions about people, places, companies, facts, historical events, or \
                 other subjects. Input should be a search query."
            }
        }
    }

    /// Default cap on characters returned to the prompt.
    pub fn default_char_limit(&self) -> usize {
        match self {
            ToolKind::WebSearch => 1000,
            ToolKind::Arxiv | ToolKind::Wikipedia => 200,
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ToolKind::WebSearch => "web_search",
            ToolKind::Arxiv => "arxiv",
            ToolKind::Wikipedia => "wikipedia",
        };
        f.write_str(s)
    }
}

/// A black-box knowledge provider.
///
/// `search` returns plain text for at most `result_limit` hits. Implementations
/// should not truncate; the owning [`ToolSpec`] applies the character cap.
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    async fn search(&self, query: &str, result_limit: usize) -> Result<String, ToolError>;
}

/// One registered tool: a knowledge source plus the limits it runs under.
#[derive(Clone)]
pub struct ToolSpec {
    kind: ToolKind,
    name: String,
    description: String,
    result_limit: usize,
    result_char_limit: usize,
    timeout: Duration,
    source: Arc<dyn KnowledgeSource>,
}

impl std::fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSpec")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("result_limit", &self.result_limit)
            .field("result_char_limit", &self.result_char_limit)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ToolSpec {
    /// Create a spec with the kind's default name, description and limits.
    pub fn new(kind: ToolKind, source: Arc<dyn KnowledgeSource>) -> Self {
        Self {
            kind,
            name: kind.default_name().to_string(),
            description: kind.default_description().to_string(),
            result_limit: 1,
            result_char_limit: kind.default_char_limit(),
            timeout: Duration::from_secs(30),
            source,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Top-k results requested from the source (minimum 1).
    pub fn with_result_limit(mut self, limit: usize) -> Self {
        self.result_limit = limit.max(1);
        self
    }

    pub fn with_result_char_limit(mut self, limit: usize) -> Self {
        self.result_char_limit = limit;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn kind(&self) -> ToolKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn result_limit(&self) -> usize {
        self.result_limit
    }

    pub fn result_char_limit(&self) -> usize {
        self.result_char_limit
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the source once. No retries; the result is capped at
    /// `result_char_limit` characters.
    pub async fn invoke(&self, input: &str) -> Result<String, ToolError> {
        let outcome = tokio::time::timeout(
            self.timeout,
            self.source.search(input, self.result_limit),
        )
        .await;

        let text = match outcome {
            Err(_) => {
                return Err(ToolError::execution(
                    &self.name,
                    format!("timed out after {}s", self.timeout.as_secs()),
                ));
            }
            Ok(Err(ToolError::ExecutionFailed { cause, .. })) => {
                return Err(ToolError::execution(&self.name, cause));
            }
            Ok(Err(err)) => return Err(ToolError::execution(&self.name, err)),
            Ok(Ok(text)) => text,
        };

        Ok(truncate_chars(&text, self.result_char_limit))
    }
}

/// Cut `text` to at most `limit` characters (not bytes).
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

/// Collects tool specs and validates them into a [`ToolRegistry`].
#[derive(Default)]
pub struct ToolRegistryBuilder {
    specs: Vec<ToolSpec>,
}

impl ToolRegistryBuilder {
    pub fn register(mut self, spec: ToolSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Validate names and limits. Names are unique ignoring ASCII case, so
    /// lookups by the model can be case-insensitive without ambiguity.
    pub fn build(self) -> Result<ToolRegistry, RegistryError> {
        let mut index = HashMap::new();

        for (position, spec) in self.specs.iter().enumerate() {
            let name = spec.name.trim();
            if name.is_empty() || name != spec.name {
                return Err(RegistryError::InvalidName {
                    name: spec.name.clone(),
                });
            }
            if spec.result_char_limit == 0 {
                return Err(RegistryError::InvalidCharLimit {
                    name: spec.name.clone(),
                });
            }
            if index.insert(name.to_ascii_lowercase(), position).is_some() {
                return Err(RegistryError::DuplicateName {
                    name: spec.name.clone(),
                });
            }
        }

        Ok(ToolRegistry {
            tools: self.specs,
            index,
        })
    }
}

/// The agent's immutable capability set, in registration order.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolSpec>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    /// Look up a tool by the name the model produced.
    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.index
            .get(&name.trim().to_ascii_lowercase())
            .map(|&i| &self.tools[i])
    }

    /// Registered tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn specs(&self) -> impl Iterator<Item = &ToolSpec> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke the named tool with the model's input text.
    pub async fn invoke(&self, name: &str, input: &str) -> Result<String, ToolError> {
        let spec = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        debug!(tool = %spec.name, input = %input, "Invoking tool");
        spec.invoke(input).await
    }
}
