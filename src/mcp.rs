//! MCP client wrappers for remote tool servers.
//!
//! The agent talks to Model Context Protocol servers through the
//! [`McpToolClient`] trait: list the server's tools as [`ToolSpec`]s, call one
//! tool and get its text output back. [`StdioMcp`] spawns a local server as a
//! child process; [`StreamableHttpMcp`] speaks the streamable-HTTP transport
//! to a remote one. Both are thin adapters over `rmcp`.

use crate::error::{Error, Result};
use crate::types::ToolSpec;
use async_trait::async_trait;
use rmcp::model::{CallToolRequestParams, ClientInfo, JsonObject, ProtocolVersion};
use rmcp::service::{DynService, RoleClient, RunningService, ServiceExt};
use rmcp::transport::{StreamableHttpClientTransport, TokioChildProcess};
use serde_json::Value;
use tokio::process::Command;
use tokio::sync::Mutex;

type McpSession = RunningService<RoleClient, Box<dyn DynService<RoleClient>>>;

/// Remote tool transport: list tools, call one by name.
#[async_trait]
pub trait McpToolClient: Send + Sync {
    /// List the server's tools converted to the local tool-spec shape.
    async fn list_tools(&self) -> Result<Vec<ToolSpec>>;

    /// Invoke one tool; returns the first text content block of the result.
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<String>;
}

fn client_info() -> ClientInfo {
    ClientInfo {
        protocol_version: ProtocolVersion::LATEST,
        ..Default::default()
    }
}

fn coerce_arguments(arguments: Value) -> Result<Option<JsonObject>> {
    match arguments {
        Value::Null => Ok(None),
        Value::Object(map) => Ok(Some(map)),
        other => Err(Error::mcp(format!(
            "tool arguments must be a JSON object, got {other}"
        ))),
    }
}

fn convert_tool(tool: rmcp::model::Tool) -> ToolSpec {
    ToolSpec {
        name: tool.name.to_string(),
        description: tool
            .description
            .map(|d| d.to_string())
            .unwrap_or_default(),
        parameters: Value::Object((*tool.input_schema).clone()),
    }
}

async fn list_tools_on(session: &Mutex<McpSession>, transport: &str) -> Result<Vec<ToolSpec>> {
    let session = session.lock().await;
    let tools = session
        .list_all_tools()
        .await
        .map_err(|e| Error::mcp(format!("list_tools failed: {e}")))?;

    tracing::debug!(transport, count = tools.len(), "listed MCP tools");
    Ok(tools.into_iter().map(convert_tool).collect())
}

async fn call_tool_on(
    session: &Mutex<McpSession>,
    transport: &str,
    name: &str,
    arguments: Value,
) -> Result<String> {
    let arguments = coerce_arguments(arguments)?;

    let session = session.lock().await;
    let result = session
        .call_tool(CallToolRequestParams {
            meta: None,
            name: name.to_owned().into(),
            arguments,
            task: None,
        })
        .await
        .map_err(|e| Error::mcp(format!("call_tool {name} failed: {e}")))?;

    let text = result
        .content
        .iter()
        .find_map(|item| item.as_text())
        .map(|t| t.text.clone())
        .ok_or_else(|| Error::mcp(format!("tool {name} returned no text content")))?;

    if result.is_error.unwrap_or(false) {
        return Err(Error::mcp(format!("tool {name} failed: {text}")));
    }

    tracing::debug!(transport, tool = name, "MCP tool call succeeded");
    Ok(text)
}

/// MCP client over a child-process stdio transport.
pub struct StdioMcp {
    session: Mutex<McpSession>,
}

impl StdioMcp {
    /// Spawn the server process and run the initialization handshake.
    pub async fn connect(
        command: &str,
        args: &[String],
        envs: &[(String, String)],
    ) -> Result<Self> {
        let mut cmd = Command::new(command);
        cmd.args(args);
        for (key, value) in envs {
            cmd.env(key, value);
        }

        let transport = TokioChildProcess::new(cmd)
            .map_err(|e| Error::mcp(format!("failed to spawn {command}: {e}")))?;

        let session = client_info()
            .into_dyn()
            .serve(transport)
            .await
            .map_err(|e| Error::mcp(format!("stdio initialize failed: {e}")))?;

        tracing::info!(transport = "stdio", command, "MCP session established");
        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

#[async_trait]
impl McpToolClient for StdioMcp {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>> {
        list_tools_on(&self.session, "stdio").await
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<String> {
        call_tool_on(&self.session, "stdio", name, arguments).await
    }
}

/// MCP client over the streamable-HTTP transport.
pub struct StreamableHttpMcp {
    session: Mutex<McpSession>,
}

impl StreamableHttpMcp {
    /// Connect to the server URL and run the initialization handshake.
    pub async fn connect(url: &str) -> Result<Self> {
        let transport = StreamableHttpClientTransport::from_uri(url.to_owned());

        let session = client_info()
            .into_dyn()
            .serve(transport)
            .await
            .map_err(|e| Error::mcp(format!("http initialize failed: {e}")))?;

        tracing::info!(transport = "http", url, "MCP session established");
        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

#[async_trait]
impl McpToolClient for StreamableHttpMcp {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>> {
        list_tools_on(&self.session, "http").await
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<String> {
        call_tool_on(&self.session, "http", name, arguments).await
    }
}
