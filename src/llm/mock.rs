//! Mock LLM provider for deterministic testing.
//!
//! Returns pre-configured responses without making any HTTP calls and
//! records every request so tests can assert on the context it was given.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::core::{Message, PlanwiseError, Result, ToolCall, ToolDefinition};
use crate::llm::traits::{LLMProvider, LLMResponse};

/// One scripted turn of the mock provider
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Answer with this response
    Reply(LLMResponse),
    /// Fail with a non-retryable provider error
    Error(String),
    /// Fail with an HTTP status (503 and 429 count as transient)
    Status(u16),
}

impl MockResponse {
    /// A plain text turn with no tool calls
    pub fn text(text: impl Into<String>) -> Self {
        Self::Reply(LLMResponse::text(text))
    }

    /// A turn requesting a single tool call
    pub fn tool_call(id: &str, name: &str, arguments: serde_json::Value) -> Self {
        Self::tool_calls(vec![ToolCall::new(id, name, arguments)])
    }

    /// A turn requesting several tool calls at once
    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self::Reply(LLMResponse {
            tool_calls: calls,
            ..Default::default()
        })
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self::Error(msg.into())
    }
}

/// A request the mock received
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
}

/// A mock LLM provider that plays back scripted responses in order.
///
/// Once the script runs out it answers with an empty text turn, which ends
/// any tool loop.
///
/// # Example
/// ```
/// use planwise::llm::mock::{MockProvider, MockResponse};
/// let provider = MockProvider::new().with_response(MockResponse::text("Hello, world!"));
/// ```
#[derive(Clone, Default)]
pub struct MockProvider {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response (builder style)
    pub fn with_response(self, response: MockResponse) -> Self {
        self.push(response);
        self
    }

    /// Queue several responses (builder style)
    pub fn with_responses(self, responses: impl IntoIterator<Item = MockResponse>) -> Self {
        for response in responses {
            self.push(response);
        }
        self
    }

    /// Queue a response
    pub fn push(&self, response: MockResponse) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(response);
        }
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Number of completion calls made
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Responses not yet consumed
    pub fn remaining(&self) -> usize {
        self.responses.lock().map(|q| q.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LLMProvider for MockProvider {
    async fn chat_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LLMResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                messages: messages.to_vec(),
                tool_names: tools.iter().map(|t| t.name().to_string()).collect(),
            });
        }

        let next = self
            .responses
            .lock()
            .map_err(|_| PlanwiseError::llm("mock response queue poisoned"))?
            .pop_front();

        match next {
            Some(MockResponse::Reply(mut response)) => {
                response.model = "mock".to_string();
                Ok(response)
            }
            Some(MockResponse::Error(msg)) => Err(PlanwiseError::llm(msg)),
            Some(MockResponse::Status(status)) => Err(PlanwiseError::LlmStatus {
                status,
                message: "mock status".to_string(),
            }),
            None => Ok(LLMResponse::text("")),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock"
    }
}
