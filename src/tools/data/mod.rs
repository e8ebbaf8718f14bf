//! CSV data analysis tools
//!
//! Every analysis loads the CSV fresh, returns its findings as JSON and,
//! when a task folder is given, also saves them next to the other task
//! artifacts.

mod analysis;
mod chart;
pub mod stats;
pub mod table;

pub use analysis::{
    CategoryAnalysisTool, CorrelationAnalysisTool, OutlierDetectionTool, ReadCsvTool,
    StatisticsTool, TrendAnalysisTool,
};
pub use chart::VisualizationTool;
pub use table::Table;

use serde_json::Value;

use crate::core::{PlanwiseError, Result};
use crate::tools::workspace::Workspace;

async fn load_table(workspace: &Workspace, file_path: &str) -> Result<Table> {
    Table::load(&workspace.resolve(file_path)).await
}

/// Save `result` under the task folder and record where it went.
/// Without a task folder nothing is written.
async fn save_result(
    workspace: &Workspace,
    task_folder: Option<&str>,
    file_name: &str,
    result: &mut Value,
) -> Result<()> {
    if task_folder.map(|f| f.trim().is_empty()).unwrap_or(true) {
        return Ok(());
    }

    let path = workspace.artifact_path(task_folder, file_name);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let body = serde_json::to_string_pretty(result)?;
    tokio::fs::write(&path, body).await.map_err(|e| {
        PlanwiseError::tool(format!("Error saving {}: {}", path.display(), e))
    })?;

    if let Value::Object(map) = result {
        map.insert("saved_to".into(), Value::String(path.display().to_string()));
    }
    Ok(())
}

/// File-name friendly form of a column name
fn file_stem(column: &str) -> String {
    column
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}
