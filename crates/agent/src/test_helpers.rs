//! Shared test helpers for agent tests.

use async_trait::async_trait;
use chatmate_core::error::{ProviderError, ToolError};
use chatmate_core::provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk, Usage};
use chatmate_core::tool::{KnowledgeSource, ToolKind, ToolRegistry, ToolSpec};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue.
/// Panics if more calls are made than responses provided.
pub struct SequentialMockProvider {
    responses: Vec<ProviderResponse>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn from_texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| make_text_response(t)).collect())
    }

    /// The same output for `n` calls.
    pub fn repeating(text: &str, n: usize) -> Self {
        Self::new((0..n).map(|_| make_text_response(text)).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let count = requests.len();
        if count >= self.responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                count,
                self.responses.len()
            );
        }
        requests.push(request);
        Ok(self.responses[count].clone())
    }
}

/// Streams one scripted completion as several chunks.
pub struct ChunkedMockProvider {
    chunks: Vec<String>,
}

impl ChunkedMockProvider {
    pub fn new(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[async_trait]
impl Provider for ChunkedMockProvider {
    fn name(&self) -> &str {
        "chunked_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Ok(ProviderResponse {
            content: self.chunks.concat(),
            usage: None,
            model: request.model,
        })
    }

    async fn stream(
        &self,
        _request: ProviderRequest,
    ) -> Result<tokio::sync::mpsc::Receiver<Result<StreamChunk, ProviderError>>, ProviderError>
    {
        let (tx, rx) = tokio::sync::mpsc::channel(self.chunks.len() + 1);
        for chunk in &self.chunks {
            let _ = tx
                .send(Ok(StreamChunk {
                    content: Some(chunk.clone()),
                    done: false,
                    usage: None,
                }))
                .await;
        }
        let _ = tx
            .send(Ok(StreamChunk {
                content: None,
                done: true,
                usage: None,
            }))
            .await;
        Ok(rx)
    }
}

/// Always fails with the given error.
pub struct FailingProvider {
    error: ProviderError,
}

impl FailingProvider {
    pub fn new(error: ProviderError) -> Self {
        Self { error }
    }
}

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing_mock"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        Err(self.error.clone())
    }
}

/// Sleeps before answering.
pub struct SlowProvider {
    delay: Duration,
}

impl SlowProvider {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Provider for SlowProvider {
    fn name(&self) -> &str {
        "slow_mock"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        tokio::time::sleep(self.delay).await;
        Ok(make_text_response("Final Answer: late"))
    }
}

/// Create a simple text response.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        content: text.to_string(),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// A knowledge source with a canned answer, recording every query.
pub struct ScriptedSource {
    result: Result<String, String>,
    queries: Mutex<Vec<String>>,
}

impl ScriptedSource {
    pub fn ok(text: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(text.to_string()),
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(cause: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Err(cause.to_string()),
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl KnowledgeSource for ScriptedSource {
    async fn search(&self, query: &str, _result_limit: usize) -> Result<String, ToolError> {
        self.queries.lock().unwrap().push(query.to_string());
        self.result
            .clone()
            .map_err(|cause| ToolError::execution("scripted", cause))
    }
}

/// Registry with all three tools backed by the given sources.
pub fn registry_with(
    search: Arc<ScriptedSource>,
    arxiv: Arc<ScriptedSource>,
    wikipedia: Arc<ScriptedSource>,
) -> Arc<ToolRegistry> {
    Arc::new(
        ToolRegistry::builder()
            .register(ToolSpec::new(ToolKind::WebSearch, search))
            .register(ToolSpec::new(ToolKind::Arxiv, arxiv))
            .register(ToolSpec::new(ToolKind::Wikipedia, wikipedia))
            .build()
            .unwrap(),
    )
}
