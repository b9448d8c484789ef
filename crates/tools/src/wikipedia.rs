//! Wikipedia lookup through the MediaWiki action API.
//!
//! Two requests per query: a full-text search for page titles, then one
//! plain-text intro extract per title.

use crate::http_client;
use async_trait::async_trait;
use chatmate_core::error::ToolError;
use chatmate_core::tool::KnowledgeSource;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://en.wikipedia.org/w/api.php";
pub const NO_RESULT: &str = "No good Wikipedia Search Result was found";

pub struct WikipediaSearch {
    api_url: String,
    client: reqwest::Client,
}

impl WikipediaSearch {
    pub fn new(api_url: Option<&str>, timeout: Duration) -> Self {
        Self {
            api_url: api_url.unwrap_or(DEFAULT_BASE_URL).to_string(),
            client: http_client(timeout),
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        params: &[(&str, &str)],
    ) -> Result<T, ToolError> {
        let response = self
            .client
            .get(&self.api_url)
            .query(params)
            .query(&[("format", "json"), ("formatversion", "2")])
            .send()
            .await
            .map_err(|e| ToolError::execution("wikipedia", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::execution("wikipedia", format!("HTTP {status}")));
        }

        response
            .json()
            .await
            .map_err(|e| ToolError::execution("wikipedia", format!("malformed response: {e}")))
    }

    async fn search_titles(&self, query: &str, limit: usize) -> Result<Vec<String>, ToolError> {
        let limit = limit.to_string();
        let resp: SearchResponse = self
            .get_json(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", limit.as_str()),
            ])
            .await?;
        Ok(resp.query.search.into_iter().map(|hit| hit.title).collect())
    }

    async fn intro_extract(&self, title: &str) -> Result<Option<Page>, ToolError> {
        let resp: ExtractResponse = self
            .get_json(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", title),
            ])
            .await?;
        Ok(resp
            .query
            .pages
            .into_iter()
            .find(|p| !p.missing && !p.extract.trim().is_empty()))
    }
}

#[async_trait]
impl KnowledgeSource for WikipediaSearch {
    async fn search(&self, query: &str, result_limit: usize) -> Result<String, ToolError> {
        debug!(query = %query, "Wikipedia search");
        let titles = self.search_titles(query.trim(), result_limit).await?;

        let mut blocks = Vec::new();
        let mut seen = HashSet::new();
        for title in titles.iter().take(result_limit) {
            match self.intro_extract(title).await? {
                Some(page) => {
                    // Redirects can map two hits onto one page
                    if seen.insert(page.title.clone()) {
                        blocks.push(format!("Page: {}\nSummary: {}", page.title, page.extract.trim()));
                    }
                }
                None => warn!(title = %title, "Wikipedia page had no extract"),
            }
        }

        if blocks.is_empty() {
            Ok(NO_RESULT.to_string())
        } else {
            Ok(blocks.join("\n\n"))
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    query: SearchQuery,
}

#[derive(Debug, Default, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    query: ExtractQuery,
}

#[derive(Debug, Default, Deserialize)]
struct ExtractQuery {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    extract: String,
    #[serde(default)]
    missing: bool,
}
