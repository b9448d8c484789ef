//! Web search through DuckDuckGo's HTML endpoint (no API key needed).

use crate::http_client;
use async_trait::async_trait;
use chatmate_core::error::ToolError;
use chatmate_core::tool::KnowledgeSource;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://html.duckduckgo.com";
pub const NO_RESULT: &str = "No good DuckDuckGo Search Result was found";

pub struct DuckDuckGoSearch {
    base_url: String,
    client: reqwest::Client,
}

impl DuckDuckGoSearch {
    pub fn new(base_url: Option<&str>, timeout: Duration) -> Self {
        Self {
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            client: http_client(timeout),
        }
    }
}

#[async_trait]
impl KnowledgeSource for DuckDuckGoSearch {
    async fn search(&self, query: &str, result_limit: usize) -> Result<String, ToolError> {
        let url = format!("{}/html/", self.base_url);
        debug!(query = %query, "DuckDuckGo search");

        let response = self
            .client
            .get(&url)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| ToolError::execution("Search", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::execution("Search", format!("HTTP {status}")));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ToolError::execution("Search", e))?;

        let snippets = extract_snippets(&html, result_limit);
        if snippets.is_empty() {
            Ok(NO_RESULT.to_string())
        } else {
            Ok(snippets.join(" "))
        }
    }
}

/// Pull the text of the first `limit` result snippets out of a results page.
fn extract_snippets(html: &str, limit: usize) -> Vec<String> {
    let Ok(selector) = Selector::parse(".result__snippet") else {
        return Vec::new();
    };

    Html::parse_document(html)
        .select(&selector)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|s| !s.is_empty())
        .take(limit)
        .collect()
}

pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
