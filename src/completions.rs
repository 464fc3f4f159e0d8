//! Completion orchestration: the four operations an agent can run.
//!
//! Every operation follows the same flat sequence: run the before-hooks,
//! issue the backend call(s), populate the operation context with the result
//! or the error, run the after-hooks exactly once, emit one structured log
//! event, and return. Transport errors surface verbatim; nothing here ever
//! retries. Structural problems (no choices, empty text, no tool calls) map
//! to the sentinel variants of [`crate::Error`].
//!
//! Duration in the context covers the backend call(s) only; hook execution is
//! excluded.

use crate::agent::Agent;
use crate::error::{Error, Result, StreamFailure};
use crate::hooks::{AlternativeToolsContext, ChatContext, ChatStreamContext, ToolsContext};
use crate::types::{ChatRequest, Message, ResponseFormat, ToolCall, ToolSpec};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use std::time::Instant;

const ENVELOPE_INSTRUCTION: &str =
    "Return all function calls wrapped in a container object with a 'function_calls' key.";

const CALLING_INSTRUCTIONS: &str = r#"If the question of the user matched the description of a tool, the tool will be called.
To call a tool, respond with a JSON object with the following structure:
[
    {
        "name": <name of the called tool>,
        "arguments": {
            <name of the argument>: <value of the argument>
        }
    },
]

search the name of the tool in the list of tools with the name field
"#;

/// The envelope the second alternative-detection call must produce.
#[derive(Debug, Deserialize)]
struct FunctionCallEnvelope {
    #[serde(default)]
    function_calls: Vec<DescribedCall>,
}

#[derive(Debug, Deserialize)]
struct DescribedCall {
    name: String,
    #[serde(default)]
    arguments: serde_json::Map<String, Value>,
}

impl Agent {
    fn build_request(&self, stream: bool) -> ChatRequest {
        let tools = if self.tools.is_empty() {
            None
        } else {
            Some(self.tools.iter().map(ToolSpec::to_openai).collect())
        };

        ChatRequest {
            model: self.config.model.clone(),
            messages: self.messages.clone(),
            stream,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            tools,
            parallel_tool_calls: self.config.parallel_tool_calls,
            response_format: None,
        }
    }

    /// Run a synchronous chat completion over the current history.
    ///
    /// Returns the first choice's text. After-hooks may rewrite the response
    /// in the context; the rewritten text is what gets returned.
    pub async fn chat_completion(&mut self) -> Result<String> {
        let mut ctx = ChatContext::new();

        let before = self.hooks.before_chat.clone();
        for hook in &before {
            hook.on_before(self, &mut ctx);
        }

        let request = self.build_request(false);
        let started = Instant::now();
        let outcome = self.backend.complete(&request).await;
        ctx.duration = started.elapsed();

        match outcome {
            Ok(response) => match response.choices.into_iter().next() {
                Some(choice) => ctx.response = choice.message.content.unwrap_or_default(),
                None => ctx.error = Some(Error::NoChoices),
            },
            Err(e) => ctx.error = Some(e),
        }

        let after = self.hooks.after_chat.clone();
        for hook in &after {
            hook.on_after(self, &mut ctx);
        }

        tracing::info!(
            agent = %self.name,
            model = %self.config.model,
            duration_ms = ctx.duration.as_millis() as u64,
            error = ?ctx.error,
            "chat_completion"
        );

        match ctx.error {
            Some(e) => Err(e),
            None => Ok(ctx.response),
        }
    }

    /// Run a streaming chat completion, invoking `callback` for each
    /// non-empty content delta.
    ///
    /// The callback cancels the stream cooperatively by returning an error;
    /// that error becomes the operation's error. On any failure the text
    /// accumulated so far travels with the error in [`StreamFailure`].
    pub async fn chat_completion_stream<F>(
        &mut self,
        mut callback: F,
    ) -> std::result::Result<String, StreamFailure>
    where
        F: FnMut(&str) -> Result<()>,
    {
        let mut ctx = ChatStreamContext::new();

        let before = self.hooks.before_chat_stream.clone();
        for hook in &before {
            hook.on_before(self, &mut ctx);
        }

        let request = self.build_request(true);
        let started = Instant::now();

        match self.backend.complete_stream(&request).await {
            Ok(mut stream) => {
                while let Some(item) = stream.next().await {
                    match item {
                        Ok(chunk) => {
                            let Some(delta) = chunk
                                .choices
                                .first()
                                .and_then(|choice| choice.delta.content.as_deref())
                            else {
                                continue;
                            };
                            if delta.is_empty() {
                                continue;
                            }

                            // The delta that triggered cancellation still
                            // counts as delivered output.
                            if let Err(e) = callback(delta) {
                                ctx.error = Some(e);
                            }
                            ctx.response.push_str(delta);
                            if ctx.error.is_some() {
                                break;
                            }
                        }
                        Err(e) => {
                            ctx.error = Some(e);
                            break;
                        }
                    }
                }
            }
            Err(e) => ctx.error = Some(e),
        }
        ctx.duration = started.elapsed();

        let after = self.hooks.after_chat_stream.clone();
        for hook in &after {
            hook.on_after(self, &mut ctx);
        }

        tracing::info!(
            agent = %self.name,
            model = %self.config.model,
            duration_ms = ctx.duration.as_millis() as u64,
            bytes = ctx.response.len(),
            error = ?ctx.error,
            "chat_completion_stream"
        );

        match ctx.error {
            Some(error) => Err(StreamFailure {
                partial: ctx.response,
                error,
            }),
            None => Ok(ctx.response),
        }
    }

    /// Detect tool calls through the server's native function-calling
    /// support.
    ///
    /// An empty detection is an error, not an empty success: the single error
    /// channel does not distinguish "the model declined" from "detection
    /// failed".
    pub async fn tools_completion(&mut self) -> Result<Vec<ToolCall>> {
        let mut ctx = ToolsContext::new();

        let before = self.hooks.before_tools.clone();
        for hook in &before {
            hook.on_before(self, &mut ctx);
        }

        let request = self.build_request(false);
        let started = Instant::now();
        let outcome = self.backend.complete(&request).await;
        ctx.duration = started.elapsed();

        match outcome {
            Ok(response) => match response.choices.into_iter().next() {
                Some(choice) => {
                    let calls = choice.message.tool_calls.unwrap_or_default();
                    if calls.is_empty() {
                        ctx.error = Some(Error::NoToolCallsDetected);
                    } else {
                        ctx.tool_calls = calls;
                    }
                }
                None => ctx.error = Some(Error::NoChoices),
            },
            Err(e) => ctx.error = Some(e),
        }

        let after = self.hooks.after_tools.clone();
        for hook in &after {
            hook.on_after(self, &mut ctx);
        }

        tracing::info!(
            agent = %self.name,
            model = %self.config.model,
            duration_ms = ctx.duration.as_millis() as u64,
            tool_calls = ctx.tool_calls.len(),
            error = ?ctx.error,
            "tools_completion"
        );

        match ctx.error {
            Some(e) => Err(e),
            None => Ok(ctx.tool_calls),
        }
    }

    /// Detect tool calls without native function-calling support.
    ///
    /// The catalog is advertised inside a system message instead of on the
    /// wire, a first tool-free completion describes the calls in prose, and a
    /// second JSON-mode completion rewrites that description into a
    /// `{"function_calls": [...]}` envelope, from which the tool calls are
    /// synthesized with fresh identifiers.
    ///
    /// The tool catalog is restored whichever step fails. The history
    /// replacement performed by the protocol is deliberately not rolled back;
    /// callers needing conversational continuity must re-seed the history.
    pub async fn alternative_tools_completion(&mut self) -> Result<Vec<ToolCall>> {
        let mut ctx = AlternativeToolsContext::new();

        let before = self.hooks.before_alternative_tools.clone();
        for hook in &before {
            hook.on_before(self, &mut ctx);
        }

        // Step 1: snapshot the catalog and disable it on the wire for the
        // whole protocol.
        let catalog = std::mem::take(&mut self.tools);

        let started = Instant::now();
        let outcome = self.detect_without_native_tools(&catalog).await;
        ctx.duration = started.elapsed();

        // The snapshot comes back on every path.
        self.tools = catalog;

        match outcome {
            Ok(calls) => ctx.tool_calls = calls,
            Err(e) => ctx.error = Some(e),
        }

        let after = self.hooks.after_alternative_tools.clone();
        for hook in &after {
            hook.on_after(self, &mut ctx);
        }

        tracing::info!(
            agent = %self.name,
            model = %self.config.model,
            duration_ms = ctx.duration.as_millis() as u64,
            tool_calls = ctx.tool_calls.len(),
            error = ?ctx.error,
            "alternative_tools_completion"
        );

        match ctx.error {
            Some(e) => Err(e),
            None => Ok(ctx.tool_calls),
        }
    }

    async fn detect_without_native_tools(
        &mut self,
        catalog: &[ToolSpec],
    ) -> Result<Vec<ToolCall>> {
        let tools_json =
            serde_json::to_string(&catalog.iter().map(ToolSpec::to_openai).collect::<Vec<_>>())?;

        let system = format!(
            "You have access to the following tools:\n[AVAILABLE_TOOLS]{tools_json}[/AVAILABLE_TOOLS]\n{CALLING_INSTRUCTIONS}"
        );
        self.messages.insert(0, Message::system(system));

        // First call: tool-free, the model describes which tools to invoke.
        let request = self.build_request(false);
        let response = self.backend.complete(&request).await?;
        let choice = response.choices.into_iter().next().ok_or(Error::NoChoices)?;
        let described = choice.message.content.unwrap_or_default();
        if described.is_empty() {
            return Err(Error::EmptyResponse);
        }

        // Second call: rewrite the description into the fixed envelope under
        // JSON mode. The history replacement is permanent.
        self.messages = vec![
            Message::system(ENVELOPE_INSTRUCTION),
            Message::user(described),
        ];
        let mut request = self.build_request(false);
        request.response_format = Some(ResponseFormat::json_object());

        let response = self.backend.complete(&request).await?;
        let choice = response.choices.into_iter().next().ok_or(Error::NoChoices)?;
        let envelope_text = choice.message.content.unwrap_or_default();
        if envelope_text.is_empty() {
            return Err(Error::EmptyResponse);
        }

        let envelope: FunctionCallEnvelope = serde_json::from_str(&envelope_text)?;
        if envelope.function_calls.is_empty() {
            return Err(Error::NoToolCallsDetected);
        }

        envelope
            .function_calls
            .into_iter()
            .map(|call| {
                let arguments = serde_json::to_string(&call.arguments)?;
                Ok(ToolCall::new(
                    uuid::Uuid::new_v4().to_string(),
                    call.name,
                    arguments,
                ))
            })
            .collect()
    }
}
