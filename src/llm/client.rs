//! Completion client
//!
//! Thin adapter over an [`LLMProvider`]: binds an optional tool subset to a
//! call and retries transient transport failures with exponential backoff.

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::{LlmConfig, Message, Result, ToolDefinition};
use crate::llm::traits::{LLMProvider, LLMResponse};

/// The single boundary through which the agent talks to a language model
#[derive(Clone)]
pub struct CompletionClient {
    provider: Arc<dyn LLMProvider>,
    max_retries: u32,
    retry_base_delay: Duration,
    debug: bool,
}

impl CompletionClient {
    /// Wrap a provider using the retry settings of `config`
    pub fn new(provider: Arc<dyn LLMProvider>, config: &LlmConfig) -> Self {
        Self {
            provider,
            max_retries: config.max_retries,
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
            debug: false,
        }
    }

    /// Log full request and response bodies at debug level
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Provider name and model, for logging
    pub fn describe(&self) -> String {
        format!("{}/{}", self.provider.name(), self.provider.model())
    }

    /// Ask the model for its next turn. `None` leaves the call unbound;
    /// `Some(tools)` offers exactly those tools.
    pub async fn complete(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
    ) -> Result<LLMResponse> {
        let tools = tools.unwrap_or(&[]);
        let mut attempt: u32 = 0;

        if self.debug {
            debug!(
                messages = messages.len(),
                tools = tools.len(),
                "completion request: {}",
                serde_json::to_string(messages).unwrap_or_default()
            );
        }

        loop {
            match self.provider.chat_with_tools(messages, tools).await {
                Ok(response) => {
                    if self.debug {
                        debug!(
                            tool_calls = response.tool_calls.len(),
                            "completion response: {}",
                            response.content
                        );
                    }
                    return Ok(response);
                }
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.backoff(attempt);
                    warn!(
                        "Transient completion failure ({}), retry {}/{} in {:?}",
                        e, attempt, self.max_retries, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.retry_base_delay.as_millis() as u64;
        if base == 0 {
            return Duration::ZERO;
        }
        let exp = base.saturating_mul(1u64 << (attempt - 1).min(6));
        let jitter = rand::rng().random_range(0..=base / 2);
        Duration::from_millis(exp + jitter)
    }
}
