//! Shared types used across Planwise modules
//!
//! Contains the message log entries, tool calls and tool definitions.

use serde::{Deserialize, Serialize};

/// One entry of the conversation presented to the completion client.
///
/// Order is significant: a `ToolResult` always follows the `Assistant`
/// entry whose `tool_calls` contains the matching id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    ToolResult {
        content: String,
        call_id: String,
    },
}

impl Message {
    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::System {
            content: content.into(),
        }
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::User {
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Create an assistant message carrying the tool calls it requested
    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self::Assistant {
            content: content.into(),
            tool_calls,
        }
    }

    /// Create a tool result answering the call with `call_id`
    pub fn tool_result(content: impl Into<String>, call_id: impl Into<String>) -> Self {
        Self::ToolResult {
            content: content.into(),
            call_id: call_id.into(),
        }
    }

    /// Wire role name
    pub fn role(&self) -> &'static str {
        match self {
            Message::System { .. } => "system",
            Message::User { .. } => "user",
            Message::Assistant { .. } => "assistant",
            Message::ToolResult { .. } => "tool",
        }
    }

    /// Text content of the entry
    pub fn content(&self) -> &str {
        match self {
            Message::System { content }
            | Message::User { content }
            | Message::Assistant { content, .. }
            | Message::ToolResult { content, .. } => content,
        }
    }

    pub fn is_tool_result(&self) -> bool {
        matches!(self, Message::ToolResult { .. })
    }
}

/// A tool call made by the LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned id, echoed back by the matching tool result
    pub id: String,
    /// Name of the tool to invoke
    pub name: String,
    /// JSON arguments for the tool
    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Set (or overwrite) an argument. String-encoded object arguments are
    /// decoded first and missing arguments become an empty object. Arguments
    /// that are not an object are left as they are, so the handler can report
    /// the real problem.
    pub fn set_argument(&mut self, key: &str, value: serde_json::Value) {
        let replacement = match &self.arguments {
            serde_json::Value::Null => Some(serde_json::Value::Object(serde_json::Map::new())),
            serde_json::Value::String(s) => serde_json::from_str::<serde_json::Value>(s)
                .ok()
                .filter(serde_json::Value::is_object),
            _ => None,
        };
        if let Some(arguments) = replacement {
            self.arguments = arguments;
        }
        if let Some(map) = self.arguments.as_object_mut() {
            map.insert(key.to_string(), value);
        }
    }
}

/// Definition of a tool that can be called by the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Type of tool (always "function" for now)
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function details
    pub function: FunctionDefinition,
}

/// Function definition within a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Name of the function
    pub name: String,
    /// Description of what the function does
    pub description: String,
    /// JSON Schema for the parameters
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new function tool definition
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_roles() {
        assert_eq!(Message::system("s").role(), "system");
        assert_eq!(Message::user("u").role(), "user");
        assert_eq!(Message::assistant("a").role(), "assistant");
        assert_eq!(Message::tool_result("r", "call_1").role(), "tool");
    }

    #[test]
    fn test_message_serialization_is_tagged() {
        let msg = Message::tool_result("done", "call_7");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], "tool_result");
        assert_eq!(value["call_id"], "call_7");

        let plain = serde_json::to_value(Message::assistant("hi")).unwrap();
        assert!(plain.get("tool_calls").is_none());
    }

    #[test]
    fn test_set_argument_overwrites() {
        let mut call = ToolCall::new(
            "call_1",
            "create_file",
            json!({"file_name": "a.md", "task_folder": "elsewhere"}),
        );
        call.set_argument("task_folder", json!("output/T1"));
        assert_eq!(call.arguments["task_folder"], "output/T1");
        assert_eq!(call.arguments["file_name"], "a.md");

        let mut missing = ToolCall::new("call_2", "create_file", serde_json::Value::Null);
        missing.set_argument("task_folder", json!("output/T1"));
        assert_eq!(missing.arguments, json!({"task_folder": "output/T1"}));

        let mut encoded = ToolCall::new("call_3", "create_file", json!("{\"file_name\":\"b.md\"}"));
        encoded.set_argument("task_folder", json!("output/T1"));
        assert_eq!(encoded.arguments, json!({"file_name": "b.md", "task_folder": "output/T1"}));
    }

    #[test]
    fn test_set_argument_keeps_undecodable_arguments() {
        let mut garbled = ToolCall::new("call_4", "create_file", json!("{file_name: b.md"));
        garbled.set_argument("task_folder", json!("output/T1"));
        assert_eq!(garbled.arguments, json!("{file_name: b.md"));

        let mut list = ToolCall::new("call_5", "create_file", json!(["b.md"]));
        list.set_argument("task_folder", json!("output/T1"));
        assert_eq!(list.arguments, json!(["b.md"]));
    }
}
