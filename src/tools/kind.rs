//! Closed set of tools the agent can offer to the model
//!
//! Every tool the orchestrator knows is a [`ToolKind`] variant; the wire name
//! and JSON schema are derived from it, so a name the model invents can never
//! reach a handler.

use serde_json::json;
use std::fmt;

use crate::core::ToolDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolKind {
    CreateFile,
    StrReplace,
    ShellExec,
    ReadCsvData,
    DataStatisticsAnalysis,
    CreateVisualization,
    TrendAnalysis,
    CategoryAnalysis,
    CorrelationAnalysis,
    OutlierDetection,
    DataExport,
    ReadFileContent,
    ListFiles,
}

/// Tools bound during step execution
pub const EXECUTE_TOOLS: &[ToolKind] = &[
    ToolKind::CreateFile,
    ToolKind::StrReplace,
    ToolKind::ShellExec,
    ToolKind::ReadCsvData,
    ToolKind::DataStatisticsAnalysis,
    ToolKind::CreateVisualization,
    ToolKind::TrendAnalysis,
    ToolKind::CategoryAnalysis,
    ToolKind::CorrelationAnalysis,
    ToolKind::OutlierDetection,
    ToolKind::DataExport,
    ToolKind::ReadFileContent,
    ToolKind::ListFiles,
];

/// Tools bound while writing the final report
pub const REPORT_TOOLS: &[ToolKind] = &[
    ToolKind::CreateFile,
    ToolKind::ShellExec,
    ToolKind::DataExport,
    ToolKind::ReadFileContent,
    ToolKind::ListFiles,
];

impl ToolKind {
    pub const ALL: &'static [ToolKind] = EXECUTE_TOOLS;

    /// Name used on the wire
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::CreateFile => "create_file",
            ToolKind::StrReplace => "str_replace",
            ToolKind::ShellExec => "shell_exec",
            ToolKind::ReadCsvData => "read_csv_data",
            ToolKind::DataStatisticsAnalysis => "data_statistics_analysis",
            ToolKind::CreateVisualization => "create_visualization",
            ToolKind::TrendAnalysis => "trend_analysis",
            ToolKind::CategoryAnalysis => "category_analysis",
            ToolKind::CorrelationAnalysis => "correlation_analysis",
            ToolKind::OutlierDetection => "outlier_detection",
            ToolKind::DataExport => "data_export",
            ToolKind::ReadFileContent => "read_file_content",
            ToolKind::ListFiles => "list_files",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }

    /// Whether the orchestrator fills in the run's task folder for this tool
    pub fn takes_task_folder(self) -> bool {
        matches!(self, ToolKind::CreateFile)
    }

    /// Function definition offered to the model
    pub fn definition(self) -> ToolDefinition {
        let task_folder = json!({
            "type": "string",
            "description": "Task output folder (optional)"
        });

        let (description, parameters) = match self {
            ToolKind::CreateFile => (
                "Create a file with the given contents inside the task output folder",
                json!({
                    "type": "object",
                    "properties": {
                        "file_name": {"type": "string", "description": "Name of the file to create"},
                        "file_contents": {"type": "string", "description": "Content to write"},
                        "task_folder": task_folder,
                        "append": {"type": "boolean", "description": "Append instead of overwrite"}
                    },
                    "required": ["file_name", "file_contents"]
                }),
            ),
            ToolKind::StrReplace => (
                "Replace the first occurrence of a text in a file",
                json!({
                    "type": "object",
                    "properties": {
                        "file_name": {"type": "string", "description": "Path of the target file"},
                        "old_str": {"type": "string", "description": "Text to be replaced"},
                        "new_str": {"type": "string", "description": "Replacement text"}
                    },
                    "required": ["file_name", "old_str", "new_str"]
                }),
            ),
            ToolKind::ShellExec => (
                "Execute a shell command in the workspace and return stdout and stderr",
                json!({
                    "type": "object",
                    "properties": {
                        "command": {"type": "string", "description": "Shell command to run"}
                    },
                    "required": ["command"]
                }),
            ),
            ToolKind::ReadCsvData => (
                "Read a CSV file and return its columns, row count and a preview",
                json!({
                    "type": "object",
                    "properties": {
                        "file_path": {"type": "string", "description": "Path of the CSV file"},
                        "preview_rows": {"type": "integer", "description": "Rows to preview (default 5)"}
                    },
                    "required": ["file_path"]
                }),
            ),
            ToolKind::DataStatisticsAnalysis => (
                "Compute descriptive statistics for every column of a CSV file",
                json!({
                    "type": "object",
                    "properties": {
                        "file_path": {"type": "string", "description": "Path of the CSV file"},
                        "task_folder": task_folder
                    },
                    "required": ["file_path"]
                }),
            ),
            ToolKind::CreateVisualization => (
                "Create a chart specification (bar, line, pie, scatter, hist) from a CSV file",
                json!({
                    "type": "object",
                    "properties": {
                        "file_path": {"type": "string", "description": "Path of the CSV file"},
                        "chart_type": {"type": "string", "enum": ["bar", "line", "pie", "scatter", "hist"]},
                        "x_column": {"type": "string", "description": "Column for the x axis / categories"},
                        "y_column": {"type": "string", "description": "Column for the y axis / values"},
                        "title": {"type": "string", "description": "Chart title"},
                        "task_folder": task_folder,
                        "save_name": {"type": "string", "description": "Output file name"}
                    },
                    "required": ["file_path", "chart_type", "x_column"]
                }),
            ),
            ToolKind::TrendAnalysis => (
                "Aggregate a value column over a date column and describe the trend",
                json!({
                    "type": "object",
                    "properties": {
                        "file_path": {"type": "string", "description": "Path of the CSV file"},
                        "date_column": {"type": "string", "description": "Date or period column"},
                        "value_column": {"type": "string", "description": "Numeric column to aggregate"},
                        "task_folder": task_folder
                    },
                    "required": ["file_path", "date_column", "value_column"]
                }),
            ),
            ToolKind::CategoryAnalysis => (
                "Group rows by a category column and rank categories",
                json!({
                    "type": "object",
                    "properties": {
                        "file_path": {"type": "string", "description": "Path of the CSV file"},
                        "category_column": {"type": "string", "description": "Column to group by"},
                        "value_column": {"type": "string", "description": "Numeric column to sum (optional)"},
                        "top_n": {"type": "integer", "description": "Categories to return (default 10)"},
                        "task_folder": task_folder
                    },
                    "required": ["file_path", "category_column"]
                }),
            ),
            ToolKind::CorrelationAnalysis => (
                "Compute Pearson correlations between numeric columns",
                json!({
                    "type": "object",
                    "properties": {
                        "file_path": {"type": "string", "description": "Path of the CSV file"},
                        "columns": {"type": "array", "items": {"type": "string"}, "description": "Columns to include (default: all numeric)"},
                        "task_folder": task_folder
                    },
                    "required": ["file_path"]
                }),
            ),
            ToolKind::OutlierDetection => (
                "Detect outliers in a numeric column using IQR and/or z-score",
                json!({
                    "type": "object",
                    "properties": {
                        "file_path": {"type": "string", "description": "Path of the CSV file"},
                        "column_name": {"type": "string", "description": "Numeric column to inspect"},
                        "method": {"type": "string", "enum": ["iqr", "zscore", "both"]},
                        "threshold": {"type": "number", "description": "z-score threshold (default 3.0)"},
                        "task_folder": task_folder
                    },
                    "required": ["file_path", "column_name"]
                }),
            ),
            ToolKind::DataExport => (
                "Export structured data to a json, csv or md file",
                json!({
                    "type": "object",
                    "properties": {
                        "data_dict": {"description": "Data to export (object, array, or JSON string)"},
                        "file_name": {"type": "string", "description": "Output file name without extension"},
                        "export_format": {"type": "string", "enum": ["json", "csv", "md"]},
                        "task_folder": task_folder
                    },
                    "required": ["data_dict", "file_name"]
                }),
            ),
            ToolKind::ReadFileContent => (
                "Read the text content of a file",
                json!({
                    "type": "object",
                    "properties": {
                        "file_path": {"type": "string", "description": "Path of the file"},
                        "max_chars": {"type": "integer", "description": "Maximum characters to return"}
                    },
                    "required": ["file_path"]
                }),
            ),
            ToolKind::ListFiles => (
                "List the entries of a directory",
                json!({
                    "type": "object",
                    "properties": {
                        "directory": {"type": "string", "description": "Directory to list (default: workspace root)"}
                    }
                }),
            ),
        };

        ToolDefinition::function(self.name(), description, parameters)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
