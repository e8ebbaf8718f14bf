//! Tool execution loop
//!
//! Asks the model for its next action, dispatches the requested tools one at
//! a time through the registry and feeds the results back, until the model
//! answers without requesting a tool.

use serde_json::json;
use tracing::{info, warn, Instrument};

use crate::agent::loop_state::{LoopExit, ToolLoopState};
use crate::core::{Message, Result, ToolCall};
use crate::llm::{CompletionClient, LLMResponse};
use crate::tools::{ToolKind, ToolRegistry};

/// Text some models emit instead of a structured tool call
pub const PSEUDO_TOOL_CALL_MARKER: &str = "<tool_call>";

/// Result of one tool loop
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    /// The model's last turn
    pub response: LLMResponse,
    /// The loop context including every assistant turn and tool result
    pub messages: Vec<Message>,
    pub state: ToolLoopState,
}

impl LoopOutcome {
    /// Text of the last turn, used as the phase summary
    pub fn summary(&self) -> &str {
        &self.response.content
    }
}

/// One configured tool loop
pub struct ToolLoop<'a> {
    client: &'a CompletionClient,
    registry: &'a ToolRegistry,
    tools: &'a [ToolKind],
    task_folder: Option<&'a str>,
    max_rounds: Option<usize>,
}

impl<'a> ToolLoop<'a> {
    pub fn new(
        client: &'a CompletionClient,
        registry: &'a ToolRegistry,
        tools: &'a [ToolKind],
    ) -> Self {
        Self {
            client,
            registry,
            tools,
            task_folder: None,
            max_rounds: None,
        }
    }

    /// Folder injected into tools that write task artifacts
    pub fn with_task_folder(mut self, task_folder: Option<&'a str>) -> Self {
        self.task_folder = task_folder;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: Option<usize>) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Run the loop starting from `context`
    pub async fn run(&self, mut context: Vec<Message>) -> Result<LoopOutcome> {
        let definitions = self.registry.definitions(self.tools);
        let mut state = ToolLoopState::new(self.max_rounds);

        loop {
            let response = self.client.complete(&context, Some(&definitions)).await?;
            state.record_usage(response.usage.as_ref());

            if response.has_tool_calls() {
                context.push(Message::assistant_with_tools(
                    response.content.clone(),
                    response.tool_calls.clone(),
                ));
                for call in &response.tool_calls {
                    let result = self.dispatch(call).await;
                    context.push(result);
                }
                state.record_round(response.tool_calls.len());

                if !state.should_continue() {
                    warn!(
                        rounds = state.round,
                        "Tool loop hit its round limit, using the last response"
                    );
                    return Ok(LoopOutcome {
                        response,
                        messages: context,
                        state,
                    });
                }
                continue;
            }

            if response.content.contains(PSEUDO_TOOL_CALL_MARKER) {
                warn!(
                    "Model wrote a {} marker instead of a structured call, ending loop",
                    PSEUDO_TOOL_CALL_MARKER
                );
                state.finish(LoopExit::PseudoToolCall);
            } else {
                state.finish(LoopExit::Finished);
            }

            return Ok(LoopOutcome {
                response,
                messages: context,
                state,
            });
        }
    }

    /// Execute one call and wrap its result for the model
    async fn dispatch(&self, call: &ToolCall) -> Message {
        let mut call = call.clone();
        let injects = ToolKind::from_name(&call.name).is_some_and(ToolKind::takes_task_folder);
        if let (true, Some(folder)) = (injects, self.task_folder) {
            call.set_argument("task_folder", json!(folder));
        }

        let span = tracing::info_span!("tool", name = %call.name, id = %call.id);
        let result = self
            .registry
            .dispatch(&call, self.tools)
            .instrument(span)
            .await;

        let content = format!(
            "tool_name:{},tool_args:{}\ntool_result:{}",
            call.name, call.arguments, result
        );
        info!("{}", content);

        Message::tool_result(content, call.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LlmConfig;
    use crate::llm::mock::{MockProvider, MockResponse};
    use crate::llm::TokenUsage;
    use crate::tools::{Workspace, EXECUTE_TOOLS, REPORT_TOOLS};
    use std::sync::Arc;

    fn client(mock: &MockProvider) -> CompletionClient {
        let config = LlmConfig {
            max_retries: 0,
            ..LlmConfig::default()
        };
        CompletionClient::new(Arc::new(mock.clone()), &config)
    }

    #[tokio::test]
    async fn test_loop_pairs_results_with_calls() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ToolRegistry::builtin(Workspace::new(dir.path(), "output"));
        let mock = MockProvider::new().with_responses([
            MockResponse::tool_calls(vec![
                ToolCall::new("c1", "list_files", json!({})),
                ToolCall::new("c2", "no_such_tool", json!({})),
            ]),
            MockResponse::text("all done"),
        ]);
        let client = client(&mock);

        let outcome = ToolLoop::new(&client, &registry, EXECUTE_TOOLS)
            .run(vec![Message::user("go")])
            .await
            .unwrap();

        assert_eq!(outcome.summary(), "all done");
        assert_eq!(outcome.state.exit, Some(LoopExit::Finished));
        assert_eq!(outcome.state.tool_calls, 2);

        let roles: Vec<&str> = outcome.messages.iter().map(|m| m.role()).collect();
        assert_eq!(roles, vec!["user", "assistant", "tool", "tool"]);
        match &outcome.messages[3] {
            Message::ToolResult { content, call_id } => {
                assert_eq!(call_id, "c2");
                assert!(content.starts_with("tool_name:no_such_tool"));
                assert!(content.contains("Unknown tool"));
            }
            other => panic!("expected a tool result, got {:?}", other),
        }

        // Second request sees the assistant turn and both results
        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].messages.len(), 4);
        assert_eq!(requests[0].tool_names.len(), EXECUTE_TOOLS.len());
    }

    #[tokio::test]
    async fn test_task_folder_injected_into_create_file() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ToolRegistry::builtin(Workspace::new(dir.path(), "output"));
        let mock = MockProvider::new().with_responses([
            MockResponse::tool_call(
                "c1",
                "create_file",
                json!({"file_name": "notes.md", "file_contents": "hi", "task_folder": "elsewhere"}),
            ),
            MockResponse::text("written"),
        ]);
        let client = client(&mock);

        let outcome = ToolLoop::new(&client, &registry, REPORT_TOOLS)
            .with_task_folder(Some("output/T1"))
            .run(Vec::new())
            .await
            .unwrap();

        assert!(outcome.messages[1].content().contains("\"task_folder\":\"output/T1\""));
        assert!(dir.path().join("output/T1/notes.md").is_file());
    }

    #[tokio::test]
    async fn test_usage_summed_over_rounds() {
        let registry = ToolRegistry::new();
        let turn = |calls: Vec<ToolCall>, prompt, completion| {
            MockResponse::Reply(LLMResponse {
                tool_calls: calls,
                usage: Some(TokenUsage::new(prompt, completion)),
                ..Default::default()
            })
        };
        let mock = MockProvider::new().with_responses([
            turn(vec![ToolCall::new("c1", "list_files", json!({}))], 100, 20),
            turn(Vec::new(), 150, 30),
        ]);
        let client = client(&mock);

        let outcome = ToolLoop::new(&client, &registry, REPORT_TOOLS)
            .run(Vec::new())
            .await
            .unwrap();

        assert_eq!(outcome.state.usage, TokenUsage::new(250, 50));
    }

    #[tokio::test]
    async fn test_pseudo_tool_call_marker_ends_loop() {
        let registry = ToolRegistry::new();
        let mock = MockProvider::new().with_responses([
            MockResponse::text("<tool_call>{\"name\": \"list_files\"}</tool_call>"),
            MockResponse::text("never reached"),
        ]);
        let client = client(&mock);

        let outcome = ToolLoop::new(&client, &registry, REPORT_TOOLS)
            .run(Vec::new())
            .await
            .unwrap();

        assert_eq!(outcome.state.exit, Some(LoopExit::PseudoToolCall));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_round_limit_stops_loop() {
        let registry = ToolRegistry::new();
        let mock = MockProvider::new().with_responses([
            MockResponse::tool_call("c1", "list_files", json!({})),
            MockResponse::tool_call("c2", "list_files", json!({})),
            MockResponse::text("never reached"),
        ]);
        let client = client(&mock);

        let outcome = ToolLoop::new(&client, &registry, REPORT_TOOLS)
            .with_max_rounds(Some(2))
            .run(Vec::new())
            .await
            .unwrap();

        assert_eq!(outcome.state.exit, Some(LoopExit::RoundLimit));
        assert_eq!(mock.call_count(), 2);
        assert!(outcome.response.has_tool_calls());
    }
}
