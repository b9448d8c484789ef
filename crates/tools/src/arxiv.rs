//! arXiv paper lookup through the public Atom API.

use crate::duckduckgo::collapse_whitespace;
use crate::http_client;
use async_trait::async_trait;
use chatmate_core::error::ToolError;
use chatmate_core::tool::KnowledgeSource;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://export.arxiv.org";
pub const NO_RESULT: &str = "No good Arxiv Result was found";

pub struct ArxivSearch {
    base_url: String,
    client: reqwest::Client,
}

impl ArxivSearch {
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
impl KnowledgeSource for ArxivSearch {
    async fn search(&self, query: &str, result_limit: usize) -> Result<String, ToolError> {
        let url = format!("{}/api/query", self.base_url);
        let search_query = format!("all:{}", query.trim());
        let max_results = result_limit.to_string();
        debug!(query = %query, max_results = result_limit, "arXiv search");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", max_results.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ToolError::execution("arxiv", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::execution("arxiv", format!("HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ToolError::execution("arxiv", e))?;

        let feed = parse_feed(&body)?;
        if feed.entries.is_empty() {
            return Ok(NO_RESULT.to_string());
        }

        Ok(feed
            .entries
            .iter()
            .take(result_limit)
            .map(Entry::render)
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    published: String,
    #[serde(rename = "author", default)]
    authors: Vec<Author>,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: String,
}

impl Entry {
    fn render(&self) -> String {
        let published = self.published.get(..10).unwrap_or(&self.published);
        let authors = self
            .authors
            .iter()
            .map(|a| a.name.trim())
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "Published: {published}\nTitle: {}\nAuthors: {authors}\nSummary: {}",
            collapse_whitespace(&self.title),
            collapse_whitespace(&self.summary),
        )
    }
}

fn parse_feed(xml: &str) -> Result<Feed, ToolError> {
    quick_xml::de::from_str(xml)
        .map_err(|e| ToolError::execution("arxiv", format!("malformed Atom feed: {e}")))
}
