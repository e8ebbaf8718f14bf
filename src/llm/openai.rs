//! OpenAI-compatible provider
//!
//! Speaks the `/chat/completions` protocol, which covers OpenAI itself and
//! the many gateways that mirror it (DeepSeek, DashScope, vLLM, LiteLLM).

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use crate::core::{LlmConfig, Message, PlanwiseError, Result, ToolCall, ToolDefinition};
use crate::llm::traits::{LLMProvider, LLMResponse, TokenUsage};

/// OpenAI-compatible API client
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiProvider {
    /// Create a provider from the completion client configuration
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// Convert internal Message to the wire format
    fn to_wire_message(msg: &Message) -> Value {
        match msg {
            Message::System { content } => json!({"role": "system", "content": content}),
            Message::User { content } => json!({"role": "user", "content": content}),
            Message::Assistant {
                content,
                tool_calls,
            } if tool_calls.is_empty() => json!({"role": "assistant", "content": content}),
            Message::Assistant {
                content,
                tool_calls,
            } => {
                let calls: Vec<Value> = tool_calls
                    .iter()
                    .map(|tc| {
                        json!({
                            "id": tc.id,
                            "type": "function",
                            "function": {
                                "name": tc.name,
                                "arguments": tc.arguments.to_string(),
                            }
                        })
                    })
                    .collect();
                let content = if content.is_empty() {
                    Value::Null
                } else {
                    json!(content)
                };
                json!({"role": "assistant", "content": content, "tool_calls": calls})
            }
            Message::ToolResult { content, call_id } => json!({
                "role": "tool",
                "tool_call_id": call_id,
                "content": content,
            }),
        }
    }

    fn build_body(&self, messages: &[Message], tools: &[ToolDefinition]) -> Value {
        let wire: Vec<Value> = messages.iter().map(Self::to_wire_message).collect();

        let mut body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": wire,
        });

        // o-series and gpt-5 models reject max_tokens
        if uses_max_completion_tokens(&self.model) {
            body["max_completion_tokens"] = json!(self.max_tokens);
        } else {
            body["max_tokens"] = json!(self.max_tokens);
        }

        if !tools.is_empty() {
            body["tools"] = json!(tools);
        }

        body
    }

    /// Convert a `/chat/completions` response body to LLMResponse
    fn parse_response(data: &Value, fallback_model: &str) -> Result<LLMResponse> {
        let message = data
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .ok_or_else(|| PlanwiseError::llm("Response has no choices[0].message"))?;

        let content = message
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let tool_calls = message
            .get("tool_calls")
            .and_then(Value::as_array)
            .map(|calls| calls.iter().filter_map(parse_tool_call).collect())
            .unwrap_or_default();

        let usage = data.get("usage").map(|u| {
            TokenUsage::new(
                u["prompt_tokens"].as_u64().unwrap_or(0) as u32,
                u["completion_tokens"].as_u64().unwrap_or(0) as u32,
            )
        });

        Ok(LLMResponse {
            content,
            tool_calls,
            usage,
            model: data
                .get("model")
                .and_then(Value::as_str)
                .unwrap_or(fallback_model)
                .to_string(),
        })
    }
}

/// Parse one entry of `message.tool_calls`. Arguments arrive as a JSON
/// string; when that string is not valid JSON it is kept verbatim so the
/// tool can report the problem back to the model.
fn parse_tool_call(raw: &Value) -> Option<ToolCall> {
    let function = raw.get("function")?;
    let name = function.get("name")?.as_str()?.to_string();
    let id = raw
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));

    let arguments = match function.get("arguments") {
        Some(Value::String(s)) if s.trim().is_empty() => json!({}),
        Some(Value::String(s)) => {
            serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone()))
        }
        Some(other) => other.clone(),
        None => json!({}),
    };

    Some(ToolCall {
        id,
        name,
        arguments,
    })
}

fn uses_max_completion_tokens(model: &str) -> bool {
    let bare = model.rsplit('/').next().unwrap_or(model);
    bare.starts_with("o1") || bare.starts_with("o3") || bare.starts_with("o4") || bare.starts_with("gpt-5")
}

#[async_trait]
impl LLMProvider for OpenAiProvider {
    async fn chat_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        let body = self.build_body(messages, tools);

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);

        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PlanwiseError::LlmStatus {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let data: Value = response.json().await?;
        Self::parse_response(&data, &self.model)
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
