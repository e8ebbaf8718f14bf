//! Tools module - Tool implementations for the agent
//!
//! Contains the closed tool set, the registry that dispatches calls, file
//! and shell tools, CSV analysis tools, and workspace/task folder handling.

pub mod data;
pub mod files;
pub mod kind;
pub mod registry;
pub mod shell;
pub mod workspace;

pub use kind::{ToolKind, EXECUTE_TOOLS, REPORT_TOOLS};
pub use registry::{error_payload, ToolHandler, ToolRegistry};
pub use workspace::{TaskFolders, Workspace};
