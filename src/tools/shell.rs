//! Shell command execution

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::process::Stdio;
use tokio::process::Command;

use crate::core::{PlanwiseError, Result};
use crate::tools::kind::ToolKind;
use crate::tools::registry::{parse_args, ToolHandler};
use crate::tools::workspace::Workspace;

/// Runs `sh -c <command>` in the workspace root
pub struct ShellExecTool {
    workspace: Workspace,
}

#[derive(Deserialize)]
struct ShellArgs {
    command: String,
}

impl ShellExecTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl ToolHandler for ShellExecTool {
    fn kind(&self) -> ToolKind {
        ToolKind::ShellExec
    }

    async fn invoke(&self, args: Value) -> Result<Value> {
        let args: ShellArgs = parse_args(self.kind(), args)?;
        tracing::debug!(command = %args.command, "shell_exec");

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&args.command);
        cmd.current_dir(self.workspace.root());
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let output = cmd
            .output()
            .await
            .map_err(|e| PlanwiseError::tool(format!("Failed to run '{}': {}", args.command, e)))?;

        Ok(json!({
            "messages": {
                "stdout": String::from_utf8_lossy(&output.stdout),
                "stderr": String::from_utf8_lossy(&output.stderr),
            },
            "exit_code": output.status.code(),
        }))
    }
}
