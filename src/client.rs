//! Completion backend: the boundary to the OpenAI-compatible server.
//!
//! The orchestrator only depends on the [`CompletionBackend`] trait, so tests
//! (and embedders with exotic transports) can substitute their own
//! implementation. [`HttpBackend`] is the stock reqwest-based implementation
//! speaking to `{base_url}/chat/completions` and `{base_url}/embeddings`,
//! with Server-Sent Events parsing for the streaming endpoint.

use crate::error::{Error, Result};
use crate::types::{ChatChunk, ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::time::Duration;

/// Boxed stream of completion chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatChunk>> + Send>>;

/// Contract consumed from the completion client.
///
/// Transport errors are returned verbatim; no retry happens at this layer or
/// above it.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Synchronous chat completion.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse>;

    /// Open a streaming chat completion. The request's `stream` flag must be
    /// set by the caller.
    async fn complete_stream(&self, request: &ChatRequest) -> Result<ChunkStream>;

    /// Compute one embedding vector for the input text.
    async fn embed(&self, model: &str, input: &str) -> Result<Vec<f64>>;
}

/// HTTP implementation of [`CompletionBackend`] for OpenAI-compatible servers
/// (Docker Model Runner, LM Studio, Ollama, llama.cpp, vLLM, OpenAI itself).
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpBackend {
    /// Create a backend for the given endpoint.
    ///
    /// `timeout` is the whole-request timeout in seconds; for streaming it
    /// bounds the entire stream, not individual chunks.
    pub fn new(base_url: &str, api_key: &str, timeout: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn post(&self, path: &str, body: &impl serde::Serialize) -> Result<reqwest::Response> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::api(format!("{status}: {body}")));
        }
        Ok(response)
    }
}

#[async_trait]
impl CompletionBackend for HttpBackend {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let response = self.post("/chat/completions", request).await?;
        Ok(response.json::<ChatResponse>().await?)
    }

    async fn complete_stream(&self, request: &ChatRequest) -> Result<ChunkStream> {
        let response = self.post("/chat/completions", request).await?;

        // SSE framing: each event's data line carries one JSON chunk, and the
        // stream ends with the "[DONE]" sentinel (not valid JSON, skipped).
        let stream = response
            .bytes_stream()
            .eventsource()
            .filter_map(|event| async move {
                match event {
                    Ok(event) => {
                        if event.data == "[DONE]" {
                            return None;
                        }
                        Some(
                            serde_json::from_str::<ChatChunk>(&event.data).map_err(|e| {
                                Error::stream(format!("failed to parse chunk: {e}"))
                            }),
                        )
                    }
                    Err(e) => Some(Err(Error::stream(e.to_string()))),
                }
            });

        Ok(Box::pin(stream))
    }

    async fn embed(&self, model: &str, input: &str) -> Result<Vec<f64>> {
        let request = EmbeddingRequest {
            model: model.to_string(),
            input: input.to_string(),
        };
        let response = self.post("/embeddings", &request).await?;
        let mut parsed = response.json::<EmbeddingResponse>().await?;

        if parsed.data.is_empty() {
            return Err(Error::api("embedding response contained no data"));
        }
        Ok(parsed.data.remove(0).embedding)
    }
}
