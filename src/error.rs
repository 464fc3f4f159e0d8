//! Error types for the magpie agent toolkit

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the toolkit.
///
/// Transport failures (`Http`, `Api`, `Stream`, `Mcp`) are surfaced verbatim and
/// never retried. Structural failures (`NoChoices`, `EmptyResponse`,
/// `NoToolCallsDetected`, `NoToolResponses`, `Json`) are sentinel values so
/// callers can distinguish what kind of emptiness or malformation they hit.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// API error from the model server
    #[error("API error: {0}")]
    Api(String),

    /// Streaming error
    #[error("Streaming error: {0}")]
    Stream(String),

    /// Tool execution error
    #[error("Tool execution error: {0}")]
    Tool(String),

    /// MCP client/transport error
    #[error("MCP error: {0}")]
    Mcp(String),

    /// The completion response carried an empty choice list
    #[error("no choices found")]
    NoChoices,

    /// The completion response carried an empty text body
    #[error("empty response content")]
    EmptyResponse,

    /// The completion response carried no tool calls
    #[error("no tool calls detected")]
    NoToolCallsDetected,

    /// A dispatch batch produced zero tool responses
    #[error("no tool responses found")]
    NoToolResponses,

    /// Other errors
    #[error("Error: {0}")]
    Other(String),
}

impl Error {
    /// Create a new config error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a new API error
    pub fn api(msg: impl Into<String>) -> Self {
        Error::Api(msg.into())
    }

    /// Create a new stream error
    pub fn stream(msg: impl Into<String>) -> Self {
        Error::Stream(msg.into())
    }

    /// Create a new tool error
    pub fn tool(msg: impl Into<String>) -> Self {
        Error::Tool(msg.into())
    }

    /// Create a new MCP error
    pub fn mcp(msg: impl Into<String>) -> Self {
        Error::Mcp(msg.into())
    }

    /// Create a new other error
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }
}

/// Failure of a streaming completion, carrying whatever text had been
/// accumulated before the stream stopped.
///
/// Streaming is the one operation where partial output matters: a callback may
/// cancel mid-stream, or the transport may die after several chunks were
/// already delivered. Callers get both the cause and the partial text.
#[derive(Debug)]
pub struct StreamFailure {
    /// Text accumulated from the chunks consumed before the failure.
    pub partial: String,
    /// The underlying error (callback cancellation or transport failure).
    pub error: Error,
}

impl std::fmt::Display for StreamFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "stream stopped after {} bytes of output: {}",
            self.partial.len(),
            self.error
        )
    }
}

impl std::error::Error for StreamFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
