//! Tool registry - manages and dispatches tool calls
//!
//! Maps each [`ToolKind`] to a handler. Handlers never raise to the caller:
//! a failure comes back as a JSON payload with a top-level `error` key, and
//! the agent hands it to the model like any other result.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{PlanwiseError, Result, ToolCall, ToolDefinition};
use crate::tools::data::{
    CategoryAnalysisTool, CorrelationAnalysisTool, OutlierDetectionTool, ReadCsvTool,
    StatisticsTool, TrendAnalysisTool, VisualizationTool,
};
use crate::tools::files::{
    CreateFileTool, DataExportTool, ListFilesTool, ReadFileTool, StrReplaceTool,
};
use crate::tools::kind::ToolKind;
use crate::tools::shell::ShellExecTool;
use crate::tools::workspace::Workspace;

/// A tool implementation
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Which tool this handler implements
    fn kind(&self) -> ToolKind;

    /// Run the tool with the model-supplied arguments
    async fn invoke(&self, args: Value) -> Result<Value>;
}

/// Deserialize tool arguments into the handler's typed argument struct
pub fn parse_args<T: DeserializeOwned>(kind: ToolKind, args: Value) -> Result<T> {
    let args = match args {
        Value::Null => json!({}),
        // Some models double-encode arguments as a JSON string
        Value::String(s) => serde_json::from_str(&s).map_err(|e| {
            PlanwiseError::tool(format!("{}: arguments are not a JSON object: {}", kind, e))
        })?,
        other => other,
    };
    serde_json::from_value(args)
        .map_err(|e| PlanwiseError::tool(format!("{}: invalid arguments: {}", kind, e)))
}

/// Registry of available tools
#[derive(Default)]
pub struct ToolRegistry {
    handlers: HashMap<ToolKind, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every built-in tool bound to `workspace`
    pub fn builtin(workspace: Workspace) -> Self {
        let mut registry = Self::new();
        registry.register(CreateFileTool::new(workspace.clone()));
        registry.register(StrReplaceTool::new(workspace.clone()));
        registry.register(ShellExecTool::new(workspace.clone()));
        registry.register(ReadCsvTool::new(workspace.clone()));
        registry.register(StatisticsTool::new(workspace.clone()));
        registry.register(VisualizationTool::new(workspace.clone()));
        registry.register(TrendAnalysisTool::new(workspace.clone()));
        registry.register(CategoryAnalysisTool::new(workspace.clone()));
        registry.register(CorrelationAnalysisTool::new(workspace.clone()));
        registry.register(OutlierDetectionTool::new(workspace.clone()));
        registry.register(DataExportTool::new(workspace.clone()));
        registry.register(ReadFileTool::new(workspace.clone()));
        registry.register(ListFilesTool::new(workspace));
        registry
    }

    /// Register a handler, replacing any previous handler of the same kind
    pub fn register(&mut self, handler: impl ToolHandler + 'static) {
        let kind = handler.kind();
        if self.handlers.insert(kind, Arc::new(handler)).is_some() {
            tracing::debug!("Replaced handler for {}", kind);
        }
    }

    pub fn contains(&self, kind: ToolKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Fail unless every tool of `subset` has a handler
    pub fn ensure_bound(&self, subset: &[ToolKind]) -> Result<()> {
        let missing: Vec<&str> = subset
            .iter()
            .filter(|k| !self.contains(**k))
            .map(|k| k.name())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(PlanwiseError::config(format!(
                "No handler registered for: {}",
                missing.join(", ")
            )))
        }
    }

    /// Tool definitions for `subset`, in subset order
    pub fn definitions(&self, subset: &[ToolKind]) -> Vec<ToolDefinition> {
        subset
            .iter()
            .filter(|k| self.contains(**k))
            .map(|k| k.definition())
            .collect()
    }

    /// Execute a tool call restricted to `subset`.
    ///
    /// Unknown names, tools outside the subset and handler failures all
    /// produce an `{"error": ...}` payload.
    pub async fn dispatch(&self, call: &ToolCall, subset: &[ToolKind]) -> Value {
        let Some(kind) = ToolKind::from_name(&call.name) else {
            return error_payload(format!("Unknown tool: {}", call.name));
        };

        if !subset.contains(&kind) {
            return error_payload(format!("Tool {} is not available in this phase", kind));
        }

        let Some(handler) = self.handlers.get(&kind) else {
            return error_payload(format!("No handler registered for {}", kind));
        };

        match handler.invoke(call.arguments.clone()).await {
            Ok(value) => value,
            Err(e) => error_payload(e.to_string()),
        }
    }
}

/// Build the failure payload tools return instead of raising
pub fn error_payload(message: impl Into<String>) -> Value {
    json!({ "error": message.into() })
}
