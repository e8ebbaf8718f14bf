//! Ollama client implementation
//!
//! Async HTTP client for the Ollama chat API with tool calling support.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::{LlmConfig, Message, PlanwiseError, Result, ToolCall, ToolDefinition};
use crate::llm::traits::{LLMProvider, LLMResponse, TokenUsage};

/// Ollama API client
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

/// Ollama chat request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
    options: OllamaOptions,
    stream: bool,
}

/// Ollama message format
#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OllamaToolCall>>,
}

/// Ollama tool call format
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaToolCall {
    function: OllamaFunction,
}

/// Ollama function in tool call
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OllamaFunction {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

/// Ollama generation options
#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama chat response (non-streaming)
#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: OllamaMessage,
    model: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

impl OllamaClient {
    /// Create a new Ollama client from configuration
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// Convert internal Message to Ollama format
    fn to_ollama_message(msg: &Message) -> OllamaMessage {
        let tool_calls = match msg {
            Message::Assistant { tool_calls, .. } if !tool_calls.is_empty() => Some(
                tool_calls
                    .iter()
                    .map(|tc| OllamaToolCall {
                        function: OllamaFunction {
                            name: tc.name.clone(),
                            arguments: tc.arguments.clone(),
                        },
                    })
                    .collect(),
            ),
            _ => None,
        };

        OllamaMessage {
            role: msg.role().to_string(),
            content: msg.content().to_string(),
            tool_calls,
        }
    }

    /// Convert Ollama response to LLMResponse. Ollama does not assign call
    /// ids, so each call gets a fresh one.
    fn to_llm_response(response: ChatResponse) -> LLMResponse {
        let tool_calls = response
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: format!("call_{}", uuid::Uuid::new_v4().simple()),
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        let usage = match (response.prompt_eval_count, response.eval_count) {
            (Some(prompt), Some(completion)) => Some(TokenUsage::new(prompt, completion)),
            _ => None,
        };

        LLMResponse {
            content: response.message.content,
            tool_calls,
            usage,
            model: response.model,
        }
    }
}

#[async_trait]
impl LLMProvider for OllamaClient {
    async fn chat_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        let request = ChatRequest {
            model: &self.model,
            messages: messages.iter().map(Self::to_ollama_message).collect(),
            tools: if tools.is_empty() { None } else { Some(tools) },
            options: OllamaOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
            stream: false, // Tool calling doesn't support streaming well
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    tracing::warn!("Cannot connect to Ollama at {}. Is it running?", self.base_url);
                }
                PlanwiseError::from(e)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PlanwiseError::LlmStatus {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let response_text = response.text().await?;
        let chat_response: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| PlanwiseError::llm(format!("Failed to parse Ollama response: {}", e)))?;

        Ok(Self::to_llm_response(chat_response))
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_conversion() {
        let msg = Message::user("Hello");
        let ollama_msg = OllamaClient::to_ollama_message(&msg);
        assert_eq!(ollama_msg.role, "user");
        assert_eq!(ollama_msg.content, "Hello");
        assert!(ollama_msg.tool_calls.is_none());

        let tool = OllamaClient::to_ollama_message(&Message::tool_result("42", "call_1"));
        assert_eq!(tool.role, "tool");
    }

    #[test]
    fn test_response_gets_call_ids() {
        let raw = json!({
            "model": "qwen3:8b",
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [
                    {"function": {"name": "list_files", "arguments": {"directory": "."}}},
                    {"function": {"name": "read_file_content", "arguments": {"file_path": "a"}}}
                ]
            },
            "prompt_eval_count": 7,
            "eval_count": 3
        });
        let parsed: ChatResponse = serde_json::from_value(raw).unwrap();
        let response = OllamaClient::to_llm_response(parsed);

        assert_eq!(response.tool_calls.len(), 2);
        assert!(response.tool_calls[0].id.starts_with("call_"));
        assert_ne!(response.tool_calls[0].id, response.tool_calls[1].id);
        assert_eq!(response.usage.unwrap().total_tokens, 10);
    }
}
