//! Agent configuration with a validated builder.

use std::path::PathBuf;

/// Configuration for an agent.
///
/// Built through [`AgentConfig::builder`]; `build()` validates required fields
/// immediately and returns an error instead of deferring it to first use.
#[derive(Clone)]
pub struct AgentConfig {
    /// Model name (e.g., "qwen2.5:latest")
    pub model: String,

    /// OpenAI-compatible endpoint URL
    pub base_url: String,

    /// API key (most local servers don't need this)
    pub api_key: String,

    /// Sampling temperature
    pub temperature: Option<f64>,

    /// Maximum tokens to generate (None uses provider default)
    pub max_tokens: Option<u32>,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Model used for embedding requests (required for vector memory)
    pub embedding_model: Option<String>,

    /// Whether the server may emit parallel tool calls
    pub parallel_tool_calls: Option<bool>,

    /// Target file for vector store persistence
    pub store_path: Option<PathBuf>,

    /// System instructions seeded as the first message of the conversation
    pub system_instructions: Option<String>,
}

impl std::fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .field("embedding_model", &self.embedding_model)
            .field("parallel_tool_calls", &self.parallel_tool_calls)
            .field("store_path", &self.store_path)
            .finish()
    }
}

impl AgentConfig {
    /// Create a new builder for AgentConfig
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }
}

/// Builder for [`AgentConfig`]
#[derive(Debug, Default)]
pub struct AgentConfigBuilder {
    model: Option<String>,
    base_url: Option<String>,
    api_key: Option<String>,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
    timeout: Option<u64>,
    embedding_model: Option<String>,
    parallel_tool_calls: Option<bool>,
    store_path: Option<PathBuf>,
    system_instructions: Option<String>,
}

impl AgentConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn temperature(mut self, temp: f64) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self
    }

    pub fn parallel_tool_calls(mut self, enabled: bool) -> Self {
        self.parallel_tool_calls = Some(enabled);
        self
    }

    pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = Some(path.into());
        self
    }

    pub fn system_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.system_instructions = Some(instructions.into());
        self
    }

    pub fn build(self) -> crate::Result<AgentConfig> {
        let model = self
            .model
            .ok_or_else(|| crate::Error::config("model is required"))?;

        let base_url = self
            .base_url
            .ok_or_else(|| crate::Error::config("base_url is required"))?;

        Ok(AgentConfig {
            model,
            base_url,
            api_key: self.api_key.unwrap_or_else(|| "not-needed".to_string()),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout: self.timeout.unwrap_or(60),
            embedding_model: self.embedding_model,
            parallel_tool_calls: self.parallel_tool_calls,
            store_path: self.store_path,
            system_instructions: self.system_instructions,
        })
    }
}
