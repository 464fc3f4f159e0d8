//! Lifecycle hooks wrapping every orchestration operation.
//!
//! Each operation kind (chat, streaming chat, native tool detection,
//! alternative tool detection) carries two ordered handler lists: before-hooks
//! run ahead of the network call and may mutate the agent's parameters,
//! messages, or the context's result slot; after-hooks run once the attempt
//! finishes — success or failure — and receive the populated context, typically
//! for logging or response post-processing.
//!
//! Handlers are capability objects implementing the per-kind hook trait.
//! Registration appends to the relevant list; every registered handler is
//! invoked on every call, in registration order. There is no de-duplication
//! and no removal API. Handlers share the same context object, so a later
//! handler sees every mutation an earlier one made.
//!
//! Plain closures can be registered through the `*HookFn` adapters:
//!
//! ```rust,no_run
//! use magpie::{Agent, ChatContext, ChatHookFn};
//!
//! # fn example(agent: &mut Agent) {
//! agent.add_after_chat_completion(ChatHookFn(|_agent: &mut Agent, ctx: &mut ChatContext| {
//!     ctx.response = ctx.response.trim().to_string();
//! }));
//! # }
//! ```

use crate::agent::Agent;
use crate::error::Error;
use crate::types::ToolCall;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-invocation context for `chat_completion`.
///
/// Created fresh for each call; lives exactly as long as the operation.
pub struct ChatContext {
    /// Instant the operation started.
    pub started_at: Instant,
    /// Wall-clock span of the client call, set once the attempt finishes.
    pub duration: Duration,
    /// Error of the attempt, `None` on success.
    pub error: Option<Error>,
    /// Result slot: the response text. After-hooks may rewrite it.
    pub response: String,
}

impl ChatContext {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            duration: Duration::ZERO,
            error: None,
            response: String::new(),
        }
    }
}

impl Default for ChatContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-invocation context for `chat_completion_stream`.
///
/// The result slot holds the text accumulated so far — possibly partial when
/// the callback cancelled the stream or the transport failed mid-way.
pub struct ChatStreamContext {
    pub started_at: Instant,
    pub duration: Duration,
    pub error: Option<Error>,
    /// Accumulated (possibly partial) response text.
    pub response: String,
}

impl ChatStreamContext {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            duration: Duration::ZERO,
            error: None,
            response: String::new(),
        }
    }
}

impl Default for ChatStreamContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-invocation context for `tools_completion`.
pub struct ToolsContext {
    pub started_at: Instant,
    pub duration: Duration,
    pub error: Option<Error>,
    /// Result slot: the detected tool calls.
    pub tool_calls: Vec<ToolCall>,
}

impl ToolsContext {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            duration: Duration::ZERO,
            error: None,
            tool_calls: Vec::new(),
        }
    }
}

impl Default for ToolsContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-invocation context for `alternative_tools_completion`.
///
/// After-hooks see only the final outcome; the two intermediate completions
/// inside the protocol are not individually exposed.
pub struct AlternativeToolsContext {
    pub started_at: Instant,
    pub duration: Duration,
    pub error: Option<Error>,
    /// Result slot: the synthesized tool calls.
    pub tool_calls: Vec<ToolCall>,
}

impl AlternativeToolsContext {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            duration: Duration::ZERO,
            error: None,
            tool_calls: Vec::new(),
        }
    }
}

impl Default for AlternativeToolsContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Handler capability for `chat_completion`.
///
/// Implement `on_before`, `on_after`, or both; the defaults do nothing. The
/// same handler instance may be registered into both lists.
pub trait ChatHook: Send + Sync {
    fn on_before(&self, _agent: &mut Agent, _ctx: &mut ChatContext) {}
    fn on_after(&self, _agent: &mut Agent, _ctx: &mut ChatContext) {}
}

/// Handler capability for `chat_completion_stream`.
pub trait ChatStreamHook: Send + Sync {
    fn on_before(&self, _agent: &mut Agent, _ctx: &mut ChatStreamContext) {}
    fn on_after(&self, _agent: &mut Agent, _ctx: &mut ChatStreamContext) {}
}

/// Handler capability for `tools_completion`.
pub trait ToolsHook: Send + Sync {
    fn on_before(&self, _agent: &mut Agent, _ctx: &mut ToolsContext) {}
    fn on_after(&self, _agent: &mut Agent, _ctx: &mut ToolsContext) {}
}

/// Handler capability for `alternative_tools_completion`.
pub trait AlternativeToolsHook: Send + Sync {
    fn on_before(&self, _agent: &mut Agent, _ctx: &mut AlternativeToolsContext) {}
    fn on_after(&self, _agent: &mut Agent, _ctx: &mut AlternativeToolsContext) {}
}

/// Adapter registering a plain closure as a [`ChatHook`].
///
/// The closure runs for whichever list it was registered into (before, after,
/// or both).
pub struct ChatHookFn<F>(pub F);

impl<F> ChatHook for ChatHookFn<F>
where
    F: Fn(&mut Agent, &mut ChatContext) + Send + Sync,
{
    fn on_before(&self, agent: &mut Agent, ctx: &mut ChatContext) {
        (self.0)(agent, ctx)
    }
    fn on_after(&self, agent: &mut Agent, ctx: &mut ChatContext) {
        (self.0)(agent, ctx)
    }
}

/// Adapter registering a plain closure as a [`ChatStreamHook`].
pub struct ChatStreamHookFn<F>(pub F);

impl<F> ChatStreamHook for ChatStreamHookFn<F>
where
    F: Fn(&mut Agent, &mut ChatStreamContext) + Send + Sync,
{
    fn on_before(&self, agent: &mut Agent, ctx: &mut ChatStreamContext) {
        (self.0)(agent, ctx)
    }
    fn on_after(&self, agent: &mut Agent, ctx: &mut ChatStreamContext) {
        (self.0)(agent, ctx)
    }
}

/// Adapter registering a plain closure as a [`ToolsHook`].
pub struct ToolsHookFn<F>(pub F);

impl<F> ToolsHook for ToolsHookFn<F>
where
    F: Fn(&mut Agent, &mut ToolsContext) + Send + Sync,
{
    fn on_before(&self, agent: &mut Agent, ctx: &mut ToolsContext) {
        (self.0)(agent, ctx)
    }
    fn on_after(&self, agent: &mut Agent, ctx: &mut ToolsContext) {
        (self.0)(agent, ctx)
    }
}

/// Adapter registering a plain closure as an [`AlternativeToolsHook`].
pub struct AlternativeToolsHookFn<F>(pub F);

impl<F> AlternativeToolsHook for AlternativeToolsHookFn<F>
where
    F: Fn(&mut Agent, &mut AlternativeToolsContext) + Send + Sync,
{
    fn on_before(&self, agent: &mut Agent, ctx: &mut AlternativeToolsContext) {
        (self.0)(agent, ctx)
    }
    fn on_after(&self, agent: &mut Agent, ctx: &mut AlternativeToolsContext) {
        (self.0)(agent, ctx)
    }
}

/// Ordered handler lists for every operation kind.
#[derive(Clone, Default)]
pub struct CompletionHooks {
    pub before_chat: Vec<Arc<dyn ChatHook>>,
    pub after_chat: Vec<Arc<dyn ChatHook>>,

    pub before_chat_stream: Vec<Arc<dyn ChatStreamHook>>,
    pub after_chat_stream: Vec<Arc<dyn ChatStreamHook>>,

    pub before_tools: Vec<Arc<dyn ToolsHook>>,
    pub after_tools: Vec<Arc<dyn ToolsHook>>,

    pub before_alternative_tools: Vec<Arc<dyn AlternativeToolsHook>>,
    pub after_alternative_tools: Vec<Arc<dyn AlternativeToolsHook>>,
}

impl CompletionHooks {
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for CompletionHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionHooks")
            .field("before_chat", &self.before_chat.len())
            .field("after_chat", &self.after_chat.len())
            .field("before_chat_stream", &self.before_chat_stream.len())
            .field("after_chat_stream", &self.after_chat_stream.len())
            .field("before_tools", &self.before_tools.len())
            .field("after_tools", &self.after_tools.len())
            .field(
                "before_alternative_tools",
                &self.before_alternative_tools.len(),
            )
            .field(
                "after_alternative_tools",
                &self.after_alternative_tools.len(),
            )
            .finish()
    }
}
