//! OpenAI-compatible provider implementation.
//!
//! Works with: Groq (default), OpenAI, OpenRouter, Ollama, and any
//! endpoint exposing `/chat/completions`.
//!
//! Supports:
//! - Chat completions (non-streaming and streaming SSE)
//! - Stop sequences

use async_trait::async_trait;
use chatmate_core::error::ProviderError;
use chatmate_core::provider::*;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace, warn};

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    requires_key: bool,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            requires_key: true,
            client,
        }
    }

    /// Create a Groq provider (convenience constructor).
    pub fn groq(api_key: impl Into<String>) -> Self {
        Self::new("groq", GROQ_BASE_URL, api_key)
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", OPENAI_BASE_URL, api_key)
    }

    /// Create an OpenRouter provider (convenience constructor).
    pub fn openrouter(api_key: impl Into<String>) -> Self {
        Self::new("openrouter", OPENROUTER_BASE_URL, api_key)
    }

    /// Create an Ollama provider (convenience constructor).
    pub fn ollama(base_url: Option<&str>) -> Self {
        // Ollama doesn't need a real key
        Self::new("ollama", base_url.unwrap_or(OLLAMA_BASE_URL), "ollama").without_key()
    }

    /// Allow requests without an API key (local servers).
    pub fn without_key(mut self) -> Self {
        self.requires_key = false;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn to_api_messages(messages: &[ChatMessage]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: match m.role {
                    ChatRole::System => "system".into(),
                    ChatRole::User => "user".into(),
                    ChatRole::Assistant => "assistant".into(),
                },
                content: Some(m.content.clone()),
            })
            .collect()
    }

    fn request_body(request: &ProviderRequest, stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": stream,
        });

        if stream {
            body["stream_options"] = serde_json::json!({ "include_usage": true });
        }

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if !request.stop.is_empty() {
            body["stop"] = serde_json::json!(request.stop);
        }

        body
    }

    /// POST a chat-completions body and map non-200 statuses.
    async fn post(
        &self,
        body: &serde_json::Value,
        stream: bool,
    ) -> std::result::Result<reqwest::Response, ProviderError> {
        if self.requires_key && self.api_key.trim().is_empty() {
            return Err(ProviderError::NotConfigured(format!(
                "no API key for provider '{}'",
                self.name
            )));
        }

        let url = format!("{}/chat/completions", self.base_url);
        let mut builder = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body);
        if stream {
            builder = builder.header("Accept", "text/event-stream");
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(e.to_string())
            } else {
                ProviderError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(ProviderError::RateLimited { retry_after_secs });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status == 404 {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ModelNotFound(error_body));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl chatmate_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let body = Self::request_body(&request, false);
        debug!(provider = %self.name, model = %request.model, "Sending completion request");

        let response = self.post(&body, false).await?;

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let choice =
            api_response
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| ProviderError::ApiError {
                    status_code: 200,
                    message: "No choices in response".into(),
                })?;

        Ok(ProviderResponse {
            content: choice.message.content.unwrap_or_default(),
            usage: api_response.usage.map(Usage::from),
            model: api_response.model,
        })
    }

    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>,
        ProviderError,
    > {
        let body = Self::request_body(&request, true);
        debug!(provider = %self.name, model = %request.model, "Sending streaming request");

        let response = self.post(&body, true).await?;

        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let provider_name = self.name.clone();

        // Read the SSE byte stream on its own task
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut lines = SseLines::default();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                for data in lines.push(&bytes) {
                    match parse_sse_data(&data) {
                        SseEvent::Done => {
                            let _ = tx.send(Ok(finished_chunk(None))).await;
                            return;
                        }
                        SseEvent::Usage(usage) => {
                            let _ = tx.send(Ok(finished_chunk(Some(usage)))).await;
                            return;
                        }
                        SseEvent::Delta(content) => {
                            let chunk = StreamChunk {
                                content: Some(content),
                                done: false,
                                usage: None,
                            };
                            if tx.send(Ok(chunk)).await.is_err() {
                                return; // receiver dropped
                            }
                        }
                        SseEvent::Skip => {}
                        SseEvent::Unparseable(e) => {
                            trace!(
                                provider = %provider_name,
                                data = %data,
                                error = %e,
                                "Ignoring unparseable SSE chunk"
                            );
                        }
                    }
                }
            }

            // Stream ended without [DONE]
            let _ = tx.send(Ok(finished_chunk(None))).await;
        });

        Ok(rx)
    }
}

fn finished_chunk(usage: Option<Usage>) -> StreamChunk {
    StreamChunk {
        content: None,
        done: true,
        usage,
    }
}

/// Splits a byte stream into SSE `data:` payloads.
///
/// Bytes are buffered until a full line arrives, so characters split across
/// network reads are decoded whole.
#[derive(Default)]
struct SseLines {
    buffer: Vec<u8>,
}

impl SseLines {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut out = Vec::new();
        while let Some(line_end) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=line_end).collect();
            let line = match std::str::from_utf8(&raw[..line_end]) {
                Ok(line) => line.trim_end_matches('\r'),
                Err(e) => {
                    warn!(error = %e, "Dropping SSE line that is not valid UTF-8");
                    continue;
                }
            };

            // Skip empty lines and SSE comments
            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            if let Some(data) = line.strip_prefix("data:") {
                out.push(data.trim().to_string());
            }
        }
        out
    }
}

#[derive(Debug, PartialEq)]
enum SseEvent {
    Delta(String),
    Usage(Usage),
    Done,
    Skip,
    Unparseable(String),
}

fn parse_sse_data(data: &str) -> SseEvent {
    if data == "[DONE]" {
        return SseEvent::Done;
    }

    match serde_json::from_str::<StreamResponse>(data) {
        Ok(resp) => {
            // Usage arrives on its own final chunk with stream_options
            if let Some(usage) = resp.usage {
                return SseEvent::Usage(usage.into());
            }
            resp.choices
                .into_iter()
                .next()
                .and_then(|c| c.delta.content)
                .filter(|c| !c.is_empty())
                .map(SseEvent::Delta)
                .unwrap_or(SseEvent::Skip)
        }
        Err(e) => SseEvent::Unparseable(e.to_string()),
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl From<ApiUsage> for Usage {
    fn from(u: ApiUsage) -> Self {
        Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

/// A single SSE `data: {...}` chunk from a streaming response.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatmate_core::Provider;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ProviderRequest {
        ProviderRequest {
            model: "llama3-8b-8192".into(),
            messages: vec![
                ChatMessage::system("You are helpful"),
                ChatMessage::user("Question: capital of France?"),
            ],
            temperature: 0.7,
            max_tokens: Some(256),
            stream: false,
            stop: vec!["\nObservation:".into()],
        }
    }

    #[test]
    fn groq_constructor() {
        let provider = OpenAiCompatProvider::groq("gsk-test");
        assert_eq!(provider.name(), "groq");
        assert!(provider.base_url().contains("api.groq.com"));
    }

    #[test]
    fn ollama_constructor() {
        let provider = OpenAiCompatProvider::ollama(None);
        assert_eq!(provider.name(), "ollama");
        assert!(provider.base_url().contains("localhost:11434"));
        assert!(!provider.requires_key);
    }

    #[test]
    fn message_conversion() {
        let api_messages = OpenAiCompatProvider::to_api_messages(&request().messages);
        assert_eq!(api_messages.len(), 2);
        assert_eq!(api_messages[0].role, "system");
        assert_eq!(api_messages[1].role, "user");
    }

    #[test]
    fn request_body_carries_stop_sequence() {
        let body = OpenAiCompatProvider::request_body(&request(), true);
        assert_eq!(body["stop"][0], "\nObservation:");
        assert_eq!(body["stream"], true);
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["stream_options"]["include_usage"], true);
    }

    // --- SSE parsing tests ---

    #[test]
    fn sse_lines_handle_split_chunks() {
        let mut lines = SseLines::default();
        assert!(lines.push(b"data: {\"choices\":[{\"delta\":{\"con").is_empty());
        let out = lines.push(b"tent\":\"Hi\"}}]}\r\n\r\n: keep-alive\ndata: [DONE]\n");
        assert_eq!(out.len(), 2);
        assert_eq!(parse_sse_data(&out[0]), SseEvent::Delta("Hi".into()));
        assert_eq!(parse_sse_data(&out[1]), SseEvent::Done);
    }

    #[test]
    fn sse_lines_keep_multibyte_characters_split_across_reads() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"Zürich\"}}]}\n".as_bytes();
        let split = line.iter().position(|&b| b == 0xC3).unwrap() + 1;

        let mut lines = SseLines::default();
        assert!(lines.push(&line[..split]).is_empty());
        let out = lines.push(&line[split..]);
        assert_eq!(out.len(), 1);
        assert_eq!(parse_sse_data(&out[0]), SseEvent::Delta("Zürich".into()));
    }

    #[test]
    fn parse_finish_chunk_is_skipped() {
        let data = r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        assert_eq!(parse_sse_data(data), SseEvent::Skip);
    }

    #[test]
    fn parse_stream_usage() {
        let data = r#"{"choices":[],"usage":{"prompt_tokens":10,"completion_tokens":5,"total_tokens":15}}"#;
        match parse_sse_data(data) {
            SseEvent::Usage(usage) => assert_eq!(usage.total_tokens, 15),
            other => panic!("expected usage, got {other:?}"),
        }
    }

    #[test]
    fn parse_garbage_is_unparseable() {
        assert!(matches!(parse_sse_data("{nope"), SseEvent::Unparseable(_)));
    }

    // --- HTTP tests ---

    #[tokio::test]
    async fn complete_returns_content_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer gsk-test"))
            .and(body_partial_json(serde_json::json!({"stop": ["\nObservation:"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "llama3-8b-8192",
                "choices": [{"message": {"role": "assistant", "content": "Final Answer: Paris"}}],
                "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = OpenAiCompatProvider::new("groq", server.uri(), "gsk-test");
        let response = provider.complete(request()).await.unwrap();
        assert_eq!(response.content, "Final Answer: Paris");
        assert_eq!(response.usage.unwrap().total_tokens, 16);
    }

    #[tokio::test]
    async fn stream_yields_deltas_then_done() {
        let server = MockServer::start().await;
        let sse = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Thought: \"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"done\"}}]}\n\n",
            "data: {\"choices\":[],\"usage\":{\"prompt_tokens\":3,\"completion_tokens\":2,\"total_tokens\":5}}\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse),
            )
            .mount(&server)
            .await;

        let provider = OpenAiCompatProvider::new("groq", server.uri(), "gsk-test");
        let mut rx = provider.stream(request()).await.unwrap();

        let mut text = String::new();
        let mut last = None;
        while let Some(chunk) = rx.recv().await {
            let chunk = chunk.unwrap();
            if let Some(c) = &chunk.content {
                text.push_str(c);
            }
            if chunk.done {
                last = Some(chunk);
            }
        }
        assert_eq!(text, "Thought: done");
        assert_eq!(last.unwrap().usage.unwrap().total_tokens, 5);
    }

    #[tokio::test]
    async fn status_codes_map_to_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        let provider = OpenAiCompatProvider::new("groq", server.uri(), "bad-key");
        let err = provider.complete(request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed(_)));

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "12"))
            .mount(&server)
            .await;
        let provider = OpenAiCompatProvider::new("groq", server.uri(), "gsk-test");
        let err = provider.complete(request()).await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::RateLimited {
                retry_after_secs: 12
            }
        ));

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&server)
            .await;
        let provider = OpenAiCompatProvider::new("groq", server.uri(), "gsk-test");
        let err = provider.stream(request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::ApiError { status_code: 500, .. }));
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let provider = OpenAiCompatProvider::new("groq", server.uri(), "");
        let err = provider.complete(request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }
}
