//! Tool dispatch: executing detected tool calls.
//!
//! Detection and execution are separate steps. A completion returns
//! [`ToolCall`]s; the caller hands them to one of the dispatch methods, which
//! executes each call, feeds results back into the conversation as tool
//! messages, and returns the textual outputs in input order.
//!
//! Local tools live in a [`ToolBox`] of async closures. MCP tools go through
//! the agent's connected MCP client. The two paths treat failure differently:
//! local dispatch silently skips names with no implementation, while MCP
//! dispatch attempts every call and stringifies failures into the output
//! slot, so its output length always equals the input length. On both paths
//! a call whose argument string is not valid JSON aborts the whole batch.

use crate::agent::Agent;
use crate::error::{Error, Result};
use crate::mcp::McpToolClient;
use crate::types::ToolCall;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed async tool implementation: JSON arguments in, JSON result out.
pub type ToolImplFn =
    Arc<dyn Fn(Value) -> Pin<Box<dyn Future<Output = Result<Value>> + Send>> + Send + Sync>;

/// Named collection of local tool implementations.
///
/// ```rust
/// use magpie::ToolBox;
/// use serde_json::{Value, json};
///
/// let toolbox = ToolBox::new().register("add", |args: Value| async move {
///     let a = args["a"].as_f64().unwrap_or(0.0);
///     let b = args["b"].as_f64().unwrap_or(0.0);
///     Ok(json!(a + b))
/// });
/// assert!(toolbox.contains("add"));
/// ```
#[derive(Clone, Default)]
pub struct ToolBox {
    impls: HashMap<String, ToolImplFn>,
}

impl ToolBox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an implementation under `name`, replacing any previous one.
    pub fn register<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.impls
            .insert(name.into(), Arc::new(move |args| Box::pin(f(args))));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.impls.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ToolImplFn> {
        self.impls.get(name)
    }

    pub fn len(&self) -> usize {
        self.impls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.impls.is_empty()
    }
}

impl std::fmt::Debug for ToolBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.impls.keys().collect();
        names.sort();
        f.debug_struct("ToolBox").field("tools", &names).finish()
    }
}

/// A string result stays raw text; anything else becomes compact JSON.
fn format_tool_output(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl Agent {
    /// Execute detected tool calls against local implementations.
    ///
    /// Calls naming a tool absent from the toolbox are skipped without
    /// complaint, so the catalog may advertise more tools than this process
    /// implements. Malformed argument JSON aborts the whole batch. Each
    /// executed call's output (or its error, stringified) lands in the result
    /// vector; successes are also appended to the conversation as tool
    /// messages. A batch yielding zero outputs is an error.
    pub async fn execute_tool_calls(
        &mut self,
        calls: &[ToolCall],
        toolbox: &ToolBox,
    ) -> Result<Vec<String>> {
        let mut outputs = Vec::new();

        for call in calls {
            let Some(implementation) = toolbox.get(&call.function.name) else {
                tracing::warn!(
                    agent = %self.name,
                    tool = %call.function.name,
                    "skipping tool call with no local implementation"
                );
                continue;
            };

            let arguments: Value = serde_json::from_str(&call.function.arguments)?;

            match implementation(arguments).await {
                Ok(value) => {
                    let output = format_tool_output(&value);
                    tracing::debug!(agent = %self.name, tool = %call.function.name, "tool executed");
                    self.add_tool_message(output.clone(), call.id.clone());
                    outputs.push(output);
                }
                Err(e) => {
                    tracing::warn!(agent = %self.name, tool = %call.function.name, error = %e, "tool failed");
                    outputs.push(e.to_string());
                }
            }
        }

        if outputs.is_empty() {
            return Err(Error::NoToolResponses);
        }
        Ok(outputs)
    }

    /// Execute detected tool calls against the connected stdio MCP server.
    pub async fn execute_mcp_stdio_tool_calls(&mut self, calls: &[ToolCall]) -> Result<Vec<String>> {
        let client = self
            .stdio_mcp
            .clone()
            .ok_or_else(|| Error::mcp("no stdio MCP client connected"))?;
        self.execute_mcp_calls(client, calls, "stdio").await
    }

    /// Execute detected tool calls against the connected streamable-HTTP MCP
    /// server.
    pub async fn execute_mcp_http_tool_calls(&mut self, calls: &[ToolCall]) -> Result<Vec<String>> {
        let client = self
            .http_mcp
            .clone()
            .ok_or_else(|| Error::mcp("no streamable-HTTP MCP client connected"))?;
        self.execute_mcp_calls(client, calls, "http").await
    }

    /// Every call is attempted; call failures are stringified into the output
    /// slot rather than aborting, so the output length equals the input
    /// length. Malformed argument JSON is the one exception and aborts the
    /// batch, as in local dispatch.
    async fn execute_mcp_calls(
        &mut self,
        client: Arc<dyn McpToolClient>,
        calls: &[ToolCall],
        transport: &str,
    ) -> Result<Vec<String>> {
        let mut outputs = Vec::with_capacity(calls.len());

        for call in calls {
            let arguments: Value = serde_json::from_str(&call.function.arguments)?;

            match client.call_tool(&call.function.name, arguments).await {
                Ok(text) => {
                    tracing::debug!(
                        agent = %self.name,
                        transport,
                        tool = %call.function.name,
                        "MCP tool executed"
                    );
                    self.add_tool_message(text.clone(), call.id.clone());
                    outputs.push(text);
                }
                Err(e) => {
                    tracing::warn!(
                        agent = %self.name,
                        transport,
                        tool = %call.function.name,
                        error = %e,
                        "MCP tool failed"
                    );
                    outputs.push(e.to_string());
                }
            }
        }

        if outputs.is_empty() {
            return Err(Error::NoToolResponses);
        }
        Ok(outputs)
    }
}
