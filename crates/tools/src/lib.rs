//! Knowledge sources for Chat-Mate.
//!
//! Each source implements `chatmate_core::KnowledgeSource` over a public
//! HTTP API:
//! - `Search`: DuckDuckGo HTML results
//! - `arxiv`: the arXiv Atom query API
//! - `wikipedia`: the MediaWiki action API
//!
//! [`default_registry`] wires the enabled ones into a validated
//! `ToolRegistry` using the `[tools.*]` config tables.

pub mod arxiv;
pub mod duckduckgo;
pub mod wikipedia;

use chatmate_config::ToolsConfig;
use chatmate_core::error::RegistryError;
use chatmate_core::tool::{KnowledgeSource, ToolKind, ToolRegistry, ToolSpec};
use std::sync::Arc;
use std::time::Duration;

pub use arxiv::ArxivSearch;
pub use duckduckgo::DuckDuckGoSearch;
pub use wikipedia::WikipediaSearch;

const USER_AGENT: &str = concat!("chatmate/", env!("CARGO_PKG_VERSION"));

pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Build the HTTP source for `kind`.
pub fn source_for(
    kind: ToolKind,
    base_url: Option<&str>,
    timeout: Duration,
) -> Arc<dyn KnowledgeSource> {
    match kind {
        ToolKind::WebSearch => Arc::new(DuckDuckGoSearch::new(base_url, timeout)),
        ToolKind::Arxiv => Arc::new(ArxivSearch::new(base_url, timeout)),
        ToolKind::Wikipedia => Arc::new(WikipediaSearch::new(base_url, timeout)),
    }
}

/// Create the tool registry from config, in the order Search, arxiv,
/// wikipedia. Disabled tools are left out.
pub fn default_registry(config: &ToolsConfig) -> Result<ToolRegistry, RegistryError> {
    let mut builder = ToolRegistry::builder();

    for kind in ToolKind::ALL {
        let tool = config.get(kind);
        if !tool.enabled {
            continue;
        }

        let timeout = Duration::from_secs(tool.timeout_secs.max(1));
        let spec = ToolSpec::new(kind, source_for(kind, tool.base_url.as_deref(), timeout))
            .with_result_limit(tool.result_limit)
            .with_result_char_limit(tool.char_limit_for(kind))
            .with_timeout(timeout);
        builder = builder.register(spec);
    }

    builder.build()
}
