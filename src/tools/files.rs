//! File tools: create, edit, read, list and export
//!
//! All paths resolve against the workspace; artifacts land in the task folder.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::core::{PlanwiseError, Result};
use crate::tools::kind::ToolKind;
use crate::tools::registry::{parse_args, ToolHandler};
use crate::tools::workspace::Workspace;

const DEFAULT_MAX_CHARS: usize = 20_000;

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    Ok(())
}

/// Writes a file into the task folder
pub struct CreateFileTool {
    workspace: Workspace,
}

#[derive(Deserialize)]
struct CreateFileArgs {
    file_name: String,
    file_contents: String,
    #[serde(default)]
    task_folder: Option<String>,
    #[serde(default)]
    append: bool,
}

impl CreateFileTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl ToolHandler for CreateFileTool {
    fn kind(&self) -> ToolKind {
        ToolKind::CreateFile
    }

    async fn invoke(&self, args: Value) -> Result<Value> {
        let args: CreateFileArgs = parse_args(self.kind(), args)?;
        let path = self
            .workspace
            .artifact_path(args.task_folder.as_deref(), &args.file_name);

        ensure_parent(&path).await.map_err(|e| {
            PlanwiseError::tool(format!("Error creating file {}: {}", path.display(), e))
        })?;

        let write = async {
            let mut file = fs::OpenOptions::new()
                .create(true)
                .write(true)
                .append(args.append)
                .truncate(!args.append)
                .open(&path)
                .await?;
            file.write_all(args.file_contents.as_bytes()).await?;
            file.flush().await
        };
        write.await.map_err(|e| {
            PlanwiseError::tool(format!("Error creating file {}: {}", path.display(), e))
        })?;

        Ok(json!({
            "messages": format!("Successfully created file at {}.", path.display()),
            "path": path.display().to_string(),
        }))
    }
}

/// Replaces the first occurrence of a string in a file
pub struct StrReplaceTool {
    workspace: Workspace,
}

#[derive(Deserialize)]
struct StrReplaceArgs {
    file_name: String,
    old_str: String,
    new_str: String,
}

impl StrReplaceTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl ToolHandler for StrReplaceTool {
    fn kind(&self) -> ToolKind {
        ToolKind::StrReplace
    }

    async fn invoke(&self, args: Value) -> Result<Value> {
        let args: StrReplaceArgs = parse_args(self.kind(), args)?;
        let path = self.workspace.resolve(&args.file_name);

        let content = fs::read_to_string(&path).await.map_err(|e| {
            PlanwiseError::tool(format!("Error reading {}: {}", path.display(), e))
        })?;

        if args.old_str.is_empty() || !content.contains(&args.old_str) {
            return Err(PlanwiseError::tool(format!(
                "'{}' not found in {}",
                args.old_str,
                path.display()
            )));
        }

        let updated = content.replacen(&args.old_str, &args.new_str, 1);
        fs::write(&path, updated).await.map_err(|e| {
            PlanwiseError::tool(format!("Error writing {}: {}", path.display(), e))
        })?;

        Ok(json!({
            "messages": format!(
                "Successfully replaced '{}' with '{}' in '{}'",
                args.old_str,
                args.new_str,
                path.display()
            )
        }))
    }
}

/// Reads a text file, truncated to `max_chars`
pub struct ReadFileTool {
    workspace: Workspace,
}

#[derive(Deserialize)]
struct ReadFileArgs {
    file_path: String,
    #[serde(default)]
    max_chars: Option<usize>,
}

impl ReadFileTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl ToolHandler for ReadFileTool {
    fn kind(&self) -> ToolKind {
        ToolKind::ReadFileContent
    }

    async fn invoke(&self, args: Value) -> Result<Value> {
        let args: ReadFileArgs = parse_args(self.kind(), args)?;
        let path = self.workspace.resolve(&args.file_path);
        let limit = args.max_chars.unwrap_or(DEFAULT_MAX_CHARS);

        let content = fs::read_to_string(&path).await.map_err(|e| {
            PlanwiseError::tool(format!("Error reading {}: {}", path.display(), e))
        })?;

        let total_chars = content.chars().count();
        let truncated = total_chars > limit;
        let content: String = if truncated {
            content.chars().take(limit).collect()
        } else {
            content
        };

        Ok(json!({
            "file_path": path.display().to_string(),
            "content": content,
            "total_chars": total_chars,
            "truncated": truncated,
        }))
    }
}

/// Lists a directory
pub struct ListFilesTool {
    workspace: Workspace,
}

#[derive(Deserialize)]
struct ListFilesArgs {
    #[serde(default)]
    directory: Option<String>,
}

impl ListFilesTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl ToolHandler for ListFilesTool {
    fn kind(&self) -> ToolKind {
        ToolKind::ListFiles
    }

    async fn invoke(&self, args: Value) -> Result<Value> {
        let args: ListFilesArgs = parse_args(self.kind(), args)?;
        let dir = self
            .workspace
            .resolve(args.directory.as_deref().unwrap_or("."));

        let mut reader = fs::read_dir(&dir).await.map_err(|e| {
            PlanwiseError::tool(format!("Error listing {}: {}", dir.display(), e))
        })?;

        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let meta = entry.metadata().await?;
            entries.push(json!({
                "name": entry.file_name().to_string_lossy(),
                "is_dir": meta.is_dir(),
                "size": meta.len(),
            }));
        }
        entries.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));

        Ok(json!({
            "directory": dir.display().to_string(),
            "entries": entries,
        }))
    }
}

/// Exports structured data as json, csv or markdown
pub struct DataExportTool {
    workspace: Workspace,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
enum ExportFormat {
    #[default]
    Json,
    Csv,
    #[serde(alias = "markdown")]
    Md,
}

impl ExportFormat {
    fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Md => "md",
        }
    }
}

#[derive(Deserialize)]
struct DataExportArgs {
    data_dict: Value,
    file_name: String,
    #[serde(default)]
    export_format: ExportFormat,
    #[serde(default)]
    task_folder: Option<String>,
}

impl DataExportTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl ToolHandler for DataExportTool {
    fn kind(&self) -> ToolKind {
        ToolKind::DataExport
    }

    async fn invoke(&self, args: Value) -> Result<Value> {
        let args: DataExportArgs = parse_args(self.kind(), args)?;

        let data = match args.data_dict {
            // Free text that is not JSON is exported as a single value
            Value::String(s) => serde_json::from_str(&s).unwrap_or(Value::String(s)),
            other => other,
        };

        let ext = args.export_format.extension();
        let file_name = if args.file_name.ends_with(&format!(".{}", ext)) {
            args.file_name.clone()
        } else {
            format!("{}.{}", args.file_name, ext)
        };

        let body = match args.export_format {
            ExportFormat::Json => serde_json::to_string_pretty(&data)?,
            ExportFormat::Csv => to_csv(&data),
            ExportFormat::Md => to_markdown(&data),
        };

        let path = self
            .workspace
            .artifact_path(args.task_folder.as_deref(), &file_name);
        ensure_parent(&path).await?;
        fs::write(&path, body).await.map_err(|e| {
            PlanwiseError::tool(format!("Error exporting to {}: {}", path.display(), e))
        })?;

        Ok(json!({
            "messages": format!("Data exported to {}", path.display()),
            "path": path.display().to_string(),
            "format": ext,
        }))
    }
}

/// Rows for tabular export: an array of objects becomes one row per
/// element, an object becomes key/value rows, anything else a single cell.
fn tabulate(data: &Value) -> (Vec<String>, Vec<Vec<String>>) {
    match data {
        Value::Array(items) if items.iter().all(Value::is_object) && !items.is_empty() => {
            let mut header: Vec<String> = Vec::new();
            for item in items {
                if let Some(obj) = item.as_object() {
                    for key in obj.keys() {
                        if !header.contains(key) {
                            header.push(key.clone());
                        }
                    }
                }
            }
            let rows = items
                .iter()
                .map(|item| {
                    header
                        .iter()
                        .map(|h| cell(item.get(h).unwrap_or(&Value::Null)))
                        .collect()
                })
                .collect();
            (header, rows)
        }
        Value::Object(map) => (
            vec!["key".to_string(), "value".to_string()],
            flatten(map, "")
                .into_iter()
                .map(|(k, v)| vec![k, v])
                .collect(),
        ),
        Value::Array(items) => (
            vec!["value".to_string()],
            items.iter().map(|v| vec![cell(v)]).collect(),
        ),
        other => (vec!["value".to_string()], vec![vec![cell(other)]]),
    }
}

fn flatten(map: &Map<String, Value>, prefix: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for (key, value) in map {
        let full = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            Value::Object(inner) => out.extend(flatten(inner, &full)),
            other => out.push((full, cell(other))),
        }
    }
    out
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn to_csv(data: &Value) -> String {
    let (header, rows) = tabulate(data);
    let mut out = String::new();
    out.push_str(&header.iter().map(|h| csv_escape(h)).collect::<Vec<_>>().join(","));
    out.push('\n');
    for row in rows {
        out.push_str(&row.iter().map(|c| csv_escape(c)).collect::<Vec<_>>().join(","));
        out.push('\n');
    }
    out
}

fn to_markdown(data: &Value) -> String {
    let (header, rows) = tabulate(data);
    let escape = |s: &str| s.replace('|', "\\|").replace('\n', " ");
    let mut out = format!("| {} |\n", header.iter().map(|h| escape(h)).collect::<Vec<_>>().join(" | "));
    out.push_str(&format!("|{}\n", " --- |".repeat(header.len())));
    for row in rows {
        out.push_str(&format!(
            "| {} |\n",
            row.iter().map(|c| escape(c)).collect::<Vec<_>>().join(" | ")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace() -> (tempfile::TempDir, Workspace) {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path(), "output");
        (dir, ws)
    }

    #[tokio::test]
    async fn test_create_file_in_task_folder() {
        let (dir, ws) = workspace();
        let tool = CreateFileTool::new(ws);

        let out = tool
            .invoke(json!({
                "file_name": "summary.md",
                "file_contents": "# Summary",
                "task_folder": "output/T1"
            }))
            .await
            .unwrap();

        assert!(out["messages"].as_str().unwrap().starts_with("Successfully created file"));
        let written = std::fs::read_to_string(dir.path().join("output/T1/summary.md")).unwrap();
        assert_eq!(written, "# Summary");
    }

    #[tokio::test]
    async fn test_create_file_append() {
        let (dir, ws) = workspace();
        let tool = CreateFileTool::new(ws);

        for part in ["a", "b"] {
            tool.invoke(json!({"file_name": "log.txt", "file_contents": part, "append": true}))
                .await
                .unwrap();
        }
        let written = std::fs::read_to_string(dir.path().join("output/log.txt")).unwrap();
        assert_eq!(written, "ab");
    }

    #[tokio::test]
    async fn test_str_replace_first_occurrence_only() {
        let (dir, ws) = workspace();
        std::fs::write(dir.path().join("notes.txt"), "foo foo").unwrap();
        let tool = StrReplaceTool::new(ws);

        tool.invoke(json!({"file_name": "notes.txt", "old_str": "foo", "new_str": "bar"}))
            .await
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("notes.txt")).unwrap(),
            "bar foo"
        );

        let missing = tool
            .invoke(json!({"file_name": "notes.txt", "old_str": "zzz", "new_str": "y"}))
            .await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn test_read_file_truncates() {
        let (dir, ws) = workspace();
        std::fs::write(dir.path().join("long.txt"), "abcdef").unwrap();
        let tool = ReadFileTool::new(ws);

        let out = tool
            .invoke(json!({"file_path": "long.txt", "max_chars": 3}))
            .await
            .unwrap();
        assert_eq!(out["content"], "abc");
        assert_eq!(out["truncated"], true);
        assert_eq!(out["total_chars"], 6);
    }

    #[tokio::test]
    async fn test_list_files_sorted() {
        let (dir, ws) = workspace();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("c")).unwrap();
        let tool = ListFilesTool::new(ws);

        let out = tool.invoke(json!({})).await.unwrap();
        let names: Vec<&str> = out["entries"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c"]);
        assert_eq!(out["entries"][2]["is_dir"], true);
    }

    #[tokio::test]
    async fn test_data_export_csv() {
        let (dir, ws) = workspace();
        let tool = DataExportTool::new(ws);

        tool.invoke(json!({
            "data_dict": [{"brand": "A", "units": 3}, {"brand": "B, Inc", "units": 5}],
            "file_name": "brands",
            "export_format": "csv",
            "task_folder": "T1"
        }))
        .await
        .unwrap();

        let csv = std::fs::read_to_string(dir.path().join("output/T1/brands.csv")).unwrap();
        assert_eq!(csv, "brand,units\nA,3\n\"B, Inc\",5\n");
    }

    #[tokio::test]
    async fn test_data_export_json_from_string() {
        let (dir, ws) = workspace();
        let tool = DataExportTool::new(ws);

        tool.invoke(json!({"data_dict": "{\"total\": 10}", "file_name": "results"}))
            .await
            .unwrap();

        let text = std::fs::read_to_string(dir.path().join("output/results.json")).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["total"], 10);
    }

    #[test]
    fn test_markdown_key_value_table() {
        let md = to_markdown(&json!({"stats": {"mean": 2.5}, "rows": 4}));
        assert!(md.starts_with("| key | value |\n| --- | --- |\n"));
        assert!(md.contains("| stats.mean | 2.5 |"));
        assert!(md.contains("| rows | 4 |"));
    }
}
