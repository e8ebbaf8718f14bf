//! LLM module - Language Model integrations
//!
//! Provides the provider abstraction, the OpenAI-compatible and Ollama
//! backends, a scripted mock, and the retrying completion client.

pub mod client;
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod traits;

use std::sync::Arc;

pub use client::CompletionClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiProvider;
pub use traits::{LLMProvider, LLMResponse, TokenUsage};

use crate::core::{LlmConfig, ProviderType, Result};

/// Create a new LLM provider based on configuration
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LLMProvider>> {
    let provider: Arc<dyn LLMProvider> = match config.provider {
        ProviderType::OpenAi => Arc::new(OpenAiProvider::from_config(config)?),
        ProviderType::Ollama => Arc::new(OllamaClient::from_config(config)?),
    };
    Ok(provider)
}
