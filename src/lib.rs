//! # Magpie - Agent Construction Toolkit
//!
//! A toolkit for building LLM agents against local OpenAI-compatible servers
//! (Docker Model Runner, LM Studio, Ollama, llama.cpp, vLLM).
//!
//! ## Key Features
//!
//! - **Completion orchestration**: chat, streaming chat with cooperative
//!   cancellation, native tool-call detection, and a two-pass alternative
//!   detection protocol for models without function-calling support
//! - **Lifecycle hooks**: ordered before/after handler lists around every
//!   operation kind
//! - **Tool dispatch**: local async tool implementations plus remote tools
//!   over MCP (stdio and streamable HTTP)
//! - **Vector memory**: in-memory store with cosine search and JSON file
//!   persistence
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use magpie::{Agent, AgentConfig};
//!
//! #[tokio::main]
//! async fn main() -> magpie::Result<()> {
//!     let config = AgentConfig::builder()
//!         .model("qwen2.5:latest")
//!         .base_url("http://localhost:12434/engines/v1")
//!         .system_instructions("You are a useful AI agent.")
//!         .build()?;
//!
//!     let mut agent = Agent::new("Bob", config)?;
//!     agent.add_user_message("Who is James Bond?");
//!
//!     let answer = agent.chat_completion().await?;
//!     println!("{answer}");
//!     Ok(())
//! }
//! ```
//!
//! ## Tool Calling
//!
//! Detection and execution are separate: a `tools_completion` (or
//! `alternative_tools_completion` for models without native support) returns
//! the detected [`ToolCall`]s, and [`Agent::execute_tool_calls`] runs them
//! against a [`ToolBox`] of local implementations, feeding results back into
//! the conversation. MCP servers plug in the same way through
//! [`Agent::connect_mcp_stdio`] / [`Agent::connect_mcp_http`].
//!
//! ## Architecture
//!
//! - **agent**: conversation state, tool catalog, MCP wiring
//! - **completions**: the four orchestration operations
//! - **dispatch**: local and MCP tool execution
//! - **hooks**: per-operation lifecycle handler lists
//! - **client**: the OpenAI-compatible HTTP backend behind a trait
//! - **mcp**: rmcp-based MCP clients
//! - **rag**: vector memory store
//! - **config**, **types**, **error**: the supporting cast
//!
//! Logging goes through `tracing`; install whatever subscriber fits the
//! embedding process.

mod agent;
mod client;
mod completions;
mod config;
mod dispatch;
mod error;
mod hooks;
mod mcp;
mod rag;
mod types;

// --- Agent & Configuration ---

pub use agent::Agent;
pub use config::{AgentConfig, AgentConfigBuilder};

// --- Completion Backend ---

pub use client::{ChunkStream, CompletionBackend, HttpBackend};

// --- Error Handling ---

pub use error::{Error, Result, StreamFailure};

// --- Lifecycle Hooks ---

pub use hooks::{
    AlternativeToolsContext, AlternativeToolsHook, AlternativeToolsHookFn, ChatContext, ChatHook,
    ChatHookFn, ChatStreamContext, ChatStreamHook, ChatStreamHookFn, CompletionHooks, ToolsContext,
    ToolsHook, ToolsHookFn,
};

// --- Tool Dispatch ---

pub use dispatch::{ToolBox, ToolImplFn};

// --- MCP ---

pub use mcp::{McpToolClient, StdioMcp, StreamableHttpMcp};

// --- Vector Memory ---

pub use rag::{MemoryVectorStore, VectorRecord, cosine_similarity};

// --- Core Types ---

pub use types::{
    ChatChunk, ChatRequest, ChatResponse, Choice, ChunkChoice, Delta, EmbeddingData,
    EmbeddingRequest, EmbeddingResponse, FunctionCall, Message, MessageRole, ResponseFormat,
    ResponseMessage, ToolCall, ToolSpec,
};

/// Convenience module with the most commonly used items.
/// Import with `use magpie::prelude::*;`.
pub mod prelude {
    pub use crate::{
        Agent, AgentConfig, ChatContext, ChatHookFn, CompletionBackend, Error, Message,
        MessageRole, Result, StreamFailure, ToolBox, ToolCall, ToolSpec, ToolsContext,
        ToolsHookFn, VectorRecord,
    };
}
