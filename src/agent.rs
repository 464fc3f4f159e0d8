//! The agent: one conversation, one tool catalog, one backend.
//!
//! An [`Agent`] owns its full state — conversation history, tool catalog,
//! completion backend, hook registry, vector store, and optional MCP clients.
//! One agent serves one conversation; everything takes `&mut self` and there
//! is no internal locking. Concurrent use means multiple agents.
//!
//! Construction pairs a name with a validated [`AgentConfig`]:
//!
//! ```rust,no_run
//! use magpie::{Agent, AgentConfig};
//!
//! # fn example() -> magpie::Result<()> {
//! let config = AgentConfig::builder()
//!     .model("qwen2.5:latest")
//!     .base_url("http://localhost:12434/engines/v1")
//!     .build()?;
//! let mut agent = Agent::new("Bob", config)?;
//! agent.add_user_message("Who is James Bond?");
//! # Ok(())
//! # }
//! ```

use crate::client::{CompletionBackend, HttpBackend};
use crate::config::AgentConfig;
use crate::error::{Error, Result};
use crate::hooks::{
    AlternativeToolsHook, ChatHook, ChatStreamHook, CompletionHooks, ToolsHook,
};
use crate::mcp::{McpToolClient, StdioMcp, StreamableHttpMcp};
use crate::rag::MemoryVectorStore;
use crate::types::{Message, MessageRole, ToolSpec};
use std::sync::Arc;

/// A conversational agent bound to an OpenAI-compatible backend.
pub struct Agent {
    pub(crate) name: String,
    pub(crate) config: AgentConfig,
    pub(crate) messages: Vec<Message>,
    pub(crate) tools: Vec<ToolSpec>,
    pub(crate) backend: Arc<dyn CompletionBackend>,
    pub(crate) hooks: CompletionHooks,
    pub(crate) store: MemoryVectorStore,
    pub(crate) stdio_mcp: Option<Arc<dyn McpToolClient>>,
    pub(crate) http_mcp: Option<Arc<dyn McpToolClient>>,
}

impl Agent {
    /// Create an agent with the stock HTTP backend.
    ///
    /// If the config carries system instructions, they are seeded as the first
    /// message of the conversation.
    pub fn new(name: impl Into<String>, config: AgentConfig) -> Result<Self> {
        let backend = HttpBackend::new(&config.base_url, &config.api_key, config.timeout)?;
        Ok(Self::with_backend(name, config, Arc::new(backend)))
    }

    /// Create an agent with a caller-supplied backend (tests, exotic
    /// transports).
    pub fn with_backend(
        name: impl Into<String>,
        config: AgentConfig,
        backend: Arc<dyn CompletionBackend>,
    ) -> Self {
        let mut messages = Vec::new();
        if let Some(instructions) = &config.system_instructions {
            messages.push(Message::system(instructions.clone()));
        }

        Self {
            name: name.into(),
            config,
            messages,
            tools: Vec::new(),
            backend,
            hooks: CompletionHooks::new(),
            store: MemoryVectorStore::new(),
            stdio_mcp: None,
            http_mcp: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    // --- Parameter setters -------------------------------------------------

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.config.model = model.into();
    }

    pub fn set_temperature(&mut self, temperature: f64) {
        self.config.temperature = Some(temperature);
    }

    pub fn set_max_tokens(&mut self, max_tokens: u32) {
        self.config.max_tokens = Some(max_tokens);
    }

    // --- Conversation history ----------------------------------------------

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn messages_mut(&mut self) -> &mut Vec<Message> {
        &mut self.messages
    }

    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn add_system_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::system(content));
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    /// Append a tool-result message carrying the originating call id.
    pub fn add_tool_message(
        &mut self,
        content: impl Into<String>,
        tool_call_id: impl Into<String>,
    ) {
        self.messages.push(Message::tool(content, tool_call_id));
    }

    pub fn clear_messages(&mut self) {
        self.messages.clear();
    }

    /// Most recent message with the given role, by position in the history.
    pub fn get_last_message(&self, role: MessageRole) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == role)
    }

    /// Content of the most recent message with the given role.
    pub fn get_last_message_content(&self, role: MessageRole) -> Option<&str> {
        self.get_last_message(role).map(|m| m.content.as_str())
    }

    pub fn get_last_user_message_content(&self) -> Option<&str> {
        self.get_last_message_content(MessageRole::User)
    }

    pub fn get_last_assistant_message_content(&self) -> Option<&str> {
        self.get_last_message_content(MessageRole::Assistant)
    }

    /// Remove and return the most recent message with the given role.
    pub fn remove_last_message(&mut self, role: MessageRole) -> Option<Message> {
        let index = self.messages.iter().rposition(|m| m.role == role)?;
        Some(self.messages.remove(index))
    }

    /// Remove and return the message at `index`, or `None` when out of range.
    pub fn remove_message(&mut self, index: usize) -> Option<Message> {
        if index < self.messages.len() {
            Some(self.messages.remove(index))
        } else {
            None
        }
    }

    // --- Tool catalog ------------------------------------------------------

    pub fn tools(&self) -> &[ToolSpec] {
        &self.tools
    }

    pub fn add_tool(&mut self, tool: ToolSpec) {
        self.tools.push(tool);
    }

    pub fn add_tools(&mut self, tools: impl IntoIterator<Item = ToolSpec>) {
        self.tools.extend(tools);
    }

    /// Replace the whole catalog. Used to temporarily disable tools and to
    /// restore a snapshot afterwards.
    pub fn set_tools(&mut self, tools: Vec<ToolSpec>) {
        self.tools = tools;
    }

    // --- Hook registration -------------------------------------------------

    pub fn add_before_chat_completion(&mut self, hook: impl ChatHook + 'static) {
        self.hooks.before_chat.push(Arc::new(hook));
    }

    pub fn add_after_chat_completion(&mut self, hook: impl ChatHook + 'static) {
        self.hooks.after_chat.push(Arc::new(hook));
    }

    pub fn add_before_chat_completion_stream(&mut self, hook: impl ChatStreamHook + 'static) {
        self.hooks.before_chat_stream.push(Arc::new(hook));
    }

    pub fn add_after_chat_completion_stream(&mut self, hook: impl ChatStreamHook + 'static) {
        self.hooks.after_chat_stream.push(Arc::new(hook));
    }

    pub fn add_before_tools_completion(&mut self, hook: impl ToolsHook + 'static) {
        self.hooks.before_tools.push(Arc::new(hook));
    }

    pub fn add_after_tools_completion(&mut self, hook: impl ToolsHook + 'static) {
        self.hooks.after_tools.push(Arc::new(hook));
    }

    pub fn add_before_alternative_tools_completion(
        &mut self,
        hook: impl AlternativeToolsHook + 'static,
    ) {
        self.hooks.before_alternative_tools.push(Arc::new(hook));
    }

    pub fn add_after_alternative_tools_completion(
        &mut self,
        hook: impl AlternativeToolsHook + 'static,
    ) {
        self.hooks.after_alternative_tools.push(Arc::new(hook));
    }

    // --- MCP wiring --------------------------------------------------------

    /// Spawn and initialize a stdio MCP server.
    pub async fn connect_mcp_stdio(
        &mut self,
        command: &str,
        args: &[String],
        envs: &[(String, String)],
    ) -> Result<()> {
        let client = StdioMcp::connect(command, args, envs).await?;
        self.stdio_mcp = Some(Arc::new(client));
        Ok(())
    }

    /// Connect and initialize a streamable-HTTP MCP server.
    pub async fn connect_mcp_http(&mut self, url: &str) -> Result<()> {
        let client = StreamableHttpMcp::connect(url).await?;
        self.http_mcp = Some(Arc::new(client));
        Ok(())
    }

    /// Install a pre-built stdio MCP client (tests, custom transports).
    pub fn set_stdio_mcp(&mut self, client: Arc<dyn McpToolClient>) {
        self.stdio_mcp = Some(client);
    }

    /// Install a pre-built streamable-HTTP MCP client.
    pub fn set_http_mcp(&mut self, client: Arc<dyn McpToolClient>) {
        self.http_mcp = Some(client);
    }

    /// List the stdio MCP server's tools and append them to the catalog.
    ///
    /// An empty `filter` loads everything. A non-empty filter keeps only the
    /// named tools; matching nothing is a configuration error.
    pub async fn load_mcp_stdio_tools(&mut self, filter: &[String]) -> Result<()> {
        let client = self
            .stdio_mcp
            .clone()
            .ok_or_else(|| Error::mcp("no stdio MCP client connected"))?;
        let tools = client.list_tools().await?;
        let selected = apply_tool_filter(tools, filter)?;

        tracing::info!(agent = %self.name, count = selected.len(), "loaded stdio MCP tools");
        self.tools.extend(selected);
        Ok(())
    }

    /// List the streamable-HTTP MCP server's tools and append them to the
    /// catalog, honoring `filter` like [`Agent::load_mcp_stdio_tools`].
    pub async fn load_mcp_http_tools(&mut self, filter: &[String]) -> Result<()> {
        let client = self
            .http_mcp
            .clone()
            .ok_or_else(|| Error::mcp("no streamable-HTTP MCP client connected"))?;
        let tools = client.list_tools().await?;
        let selected = apply_tool_filter(tools, filter)?;

        tracing::info!(agent = %self.name, count = selected.len(), "loaded HTTP MCP tools");
        self.tools.extend(selected);
        Ok(())
    }
}

fn apply_tool_filter(tools: Vec<ToolSpec>, filter: &[String]) -> Result<Vec<ToolSpec>> {
    if filter.is_empty() {
        return Ok(tools);
    }

    let selected: Vec<ToolSpec> = tools
        .into_iter()
        .filter(|tool| filter.iter().any(|name| name == &tool.name))
        .collect();

    if selected.is_empty() {
        return Err(Error::config(format!(
            "tool filter [{}] matched no MCP tools",
            filter.join(", ")
        )));
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolCall;
    use async_trait::async_trait;
    use serde_json::{Value, json};

    fn test_agent() -> Agent {
        let config = AgentConfig::builder()
            .model("test-model")
            .base_url("http://localhost:1234/v1")
            .build()
            .unwrap();
        Agent::new("Bob", config).unwrap()
    }

    fn spec(name: &str) -> ToolSpec {
        ToolSpec::new(name, format!("{name} tool"), json!({"type": "object"}))
    }

    struct FakeMcp {
        tools: Vec<ToolSpec>,
    }

    #[async_trait]
    impl McpToolClient for FakeMcp {
        async fn list_tools(&self) -> Result<Vec<ToolSpec>> {
            Ok(self.tools.clone())
        }

        async fn call_tool(&self, _name: &str, _arguments: Value) -> Result<String> {
            Ok("ok".to_string())
        }
    }

    #[test]
    fn test_system_instructions_seed_first_message() {
        let config = AgentConfig::builder()
            .model("m")
            .base_url("http://localhost:1234/v1")
            .system_instructions("You are Bob.")
            .build()
            .unwrap();
        let agent = Agent::new("Bob", config).unwrap();

        assert_eq!(agent.messages().len(), 1);
        assert_eq!(agent.messages()[0].role, MessageRole::System);
        assert_eq!(agent.messages()[0].content, "You are Bob.");
    }

    #[test]
    fn test_message_helpers() {
        let mut agent = test_agent();
        agent.add_user_message("first");
        agent.add_assistant_message("answer");
        agent.add_user_message("second");

        assert_eq!(agent.get_last_user_message_content(), Some("second"));
        assert_eq!(agent.get_last_assistant_message_content(), Some("answer"));
        assert!(agent.get_last_message(MessageRole::Tool).is_none());

        let removed = agent.remove_last_message(MessageRole::User).unwrap();
        assert_eq!(removed.content, "second");
        assert_eq!(agent.get_last_user_message_content(), Some("first"));

        agent.clear_messages();
        assert!(agent.messages().is_empty());
    }

    #[test]
    fn test_remove_message_bounds() {
        let mut agent = test_agent();
        agent.add_user_message("a");
        agent.add_user_message("b");

        assert!(agent.remove_message(5).is_none());
        let removed = agent.remove_message(0).unwrap();
        assert_eq!(removed.content, "a");
        assert_eq!(agent.messages().len(), 1);
    }

    #[test]
    fn test_tool_catalog_preserves_insertion_order() {
        let mut agent = test_agent();
        agent.add_tool(spec("zeta"));
        agent.add_tools([spec("alpha"), spec("mid")]);

        let names: Vec<&str> = agent.tools().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);

        agent.set_tools(vec![spec("only")]);
        assert_eq!(agent.tools().len(), 1);
    }

    #[test]
    fn test_duplicate_tool_message_pairing() {
        let mut agent = test_agent();
        let call = ToolCall::new("call_1", "add", r#"{"a":1,"b":2}"#);
        agent.add_message(Message {
            role: MessageRole::Assistant,
            content: String::new(),
            tool_calls: Some(vec![call]),
            tool_call_id: None,
        });
        agent.add_tool_message("3", "call_1");

        let last = agent.get_last_message(MessageRole::Tool).unwrap();
        assert_eq!(last.tool_call_id.as_deref(), Some("call_1"));
    }

    #[tokio::test]
    async fn test_load_mcp_tools_without_client_errors() {
        let mut agent = test_agent();
        let err = agent.load_mcp_stdio_tools(&[]).await.unwrap_err();
        assert!(matches!(err, Error::Mcp(_)));
    }

    #[tokio::test]
    async fn test_load_mcp_tools_empty_filter_loads_all() {
        let mut agent = test_agent();
        agent.set_stdio_mcp(Arc::new(FakeMcp {
            tools: vec![spec("roll_dice"), spec("hit_points")],
        }));

        agent.load_mcp_stdio_tools(&[]).await.unwrap();
        assert_eq!(agent.tools().len(), 2);
    }

    #[tokio::test]
    async fn test_load_mcp_tools_filter_selects_named() {
        let mut agent = test_agent();
        agent.set_http_mcp(Arc::new(FakeMcp {
            tools: vec![spec("roll_dice"), spec("hit_points")],
        }));

        agent
            .load_mcp_http_tools(&["hit_points".to_string()])
            .await
            .unwrap();
        assert_eq!(agent.tools().len(), 1);
        assert_eq!(agent.tools()[0].name, "hit_points");
    }

    #[tokio::test]
    async fn test_load_mcp_tools_filter_matching_nothing_fails() {
        let mut agent = test_agent();
        agent.set_stdio_mcp(Arc::new(FakeMcp {
            tools: vec![spec("roll_dice")],
        }));

        let err = agent
            .load_mcp_stdio_tools(&["no_such_tool".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(agent.tools().is_empty());
    }
}
