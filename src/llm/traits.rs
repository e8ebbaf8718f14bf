//! LLM Provider trait for abstracting different backends
//!
//! Enables swapping between OpenAI-compatible endpoints, Ollama, and the
//! scripted mock used in tests.

use async_trait::async_trait;

use crate::core::{Message, Result, ToolCall, ToolDefinition};

/// Response from an LLM provider
#[derive(Debug, Clone, Default)]
pub struct LLMResponse {
    /// Text content of the response
    pub content: String,
    /// Any tool calls the model wants to make (empty when it chose none)
    pub tool_calls: Vec<ToolCall>,
    /// Token usage information
    pub usage: Option<TokenUsage>,
    /// Model that generated the response
    pub model: String,
}

impl LLMResponse {
    /// A plain text response with no tool calls
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Token usage information
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    pub fn add(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// Trait for LLM providers
///
/// Model, temperature, token limit and timeout are fixed when the provider
/// is constructed; a call only carries the conversation and the tools the
/// model may use.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Generate a response; an empty `tools` slice means no tool binding
    async fn chat_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse>;

    /// Generate a plain text response
    async fn chat(&self, messages: &[Message]) -> Result<LLMResponse> {
        self.chat_with_tools(messages, &[]).await
    }

    /// Get the provider name
    fn name(&self) -> &str;

    /// Model identifier this provider talks to
    fn model(&self) -> &str;
}
