//! Shared test backend: a scripted stand-in for the completion server.

#![allow(dead_code)]

use async_trait::async_trait;
use magpie::{
    ChatChunk, ChatRequest, ChatResponse, ChunkStream, CompletionBackend, Error, Result,
};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Backend driven by a queue of scripted completions, scripted stream chunks,
/// and a text-to-vector embedding table. Captures every chat request for
/// assertions.
#[derive(Default)]
pub struct MockBackend {
    responses: Mutex<VecDeque<Result<ChatResponse>>>,
    chunks: Mutex<Vec<Result<ChatChunk>>>,
    embeddings: Mutex<HashMap<String, Vec<f64>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a plain-text completion.
    pub fn push_text(&self, content: &str) {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": content}, "finish_reason": "stop"}]
        }))
        .unwrap();
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue a completion carrying one native tool call.
    pub fn push_tool_call(&self, id: &str, name: &str, arguments: &str) {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": id,
                        "type": "function",
                        "function": {"name": name, "arguments": arguments}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }))
        .unwrap();
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue a failing completion.
    pub fn push_error(&self, error: Error) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Script the chunk sequence for the next streaming call.
    pub fn set_chunks(&self, deltas: &[&str]) {
        let chunks = deltas
            .iter()
            .map(|delta| {
                Ok(serde_json::from_value::<ChatChunk>(json!({
                    "choices": [{"delta": {"content": delta}, "finish_reason": null}]
                }))
                .unwrap())
            })
            .collect();
        *self.chunks.lock().unwrap() = chunks;
    }

    /// Script the embedding vector returned for an exact input text.
    pub fn set_embedding(&self, text: &str, vector: Vec<f64>) {
        self.embeddings
            .lock()
            .unwrap()
            .insert(text.to_string(), vector);
    }

    /// Chat requests seen so far, shared with the test body.
    pub fn requests(&self) -> Arc<Mutex<Vec<ChatRequest>>> {
        Arc::clone(&self.requests)
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::api("mock backend script exhausted")))
    }

    async fn complete_stream(&self, request: &ChatRequest) -> Result<ChunkStream> {
        self.requests.lock().unwrap().push(request.clone());
        let chunks = std::mem::take(&mut *self.chunks.lock().unwrap());
        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn embed(&self, _model: &str, input: &str) -> Result<Vec<f64>> {
        self.embeddings
            .lock()
            .unwrap()
            .get(input)
            .cloned()
            .ok_or_else(|| Error::api(format!("no scripted embedding for {input:?}")))
    }
}
