//! Chart specifications
//!
//! Charts are written as Vega-Lite JSON with the data inlined, so any
//! Vega-Lite viewer can render them later.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::path::Path;

use super::table::{parse_number, Table};
use super::{file_stem, load_table};
use crate::core::{PlanwiseError, Result};
use crate::tools::kind::ToolKind;
use crate::tools::registry::{parse_args, ToolHandler};
use crate::tools::workspace::Workspace;

const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";
const MAX_POINTS: usize = 5_000;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
enum ChartType {
    Bar,
    Line,
    Pie,
    Scatter,
    #[serde(alias = "histogram")]
    Hist,
}

impl ChartType {
    fn as_str(self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Line => "line",
            ChartType::Pie => "pie",
            ChartType::Scatter => "scatter",
            ChartType::Hist => "hist",
        }
    }
}

#[derive(Deserialize)]
struct VisualizationArgs {
    file_path: String,
    chart_type: ChartType,
    x_column: String,
    #[serde(default)]
    y_column: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    task_folder: Option<String>,
    #[serde(default)]
    save_name: Option<String>,
}

pub struct VisualizationTool {
    workspace: Workspace,
}

impl VisualizationTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

fn field_type(table: &Table, column: &str) -> Result<&'static str> {
    Ok(if table.is_numeric(table.column_index(column)?) {
        "quantitative"
    } else {
        "nominal"
    })
}

fn cell_value(cell: &str) -> Value {
    match parse_number(cell) {
        Some(n) => json!(n),
        None => Value::String(cell.trim().to_string()),
    }
}

/// Build the Vega-Lite document for `args` over `table`
fn build_spec(table: &Table, args: &VisualizationArgs) -> Result<Value> {
    let x_idx = table.column_index(&args.x_column)?;
    let y_idx = args
        .y_column
        .as_deref()
        .map(|y| table.column_index(y))
        .transpose()?;

    if matches!(args.chart_type, ChartType::Line | ChartType::Scatter) && y_idx.is_none() {
        return Err(PlanwiseError::tool(format!(
            "{} chart requires y_column",
            args.chart_type.as_str()
        )));
    }
    if args.chart_type == ChartType::Hist && !table.is_numeric(x_idx) {
        return Err(PlanwiseError::tool(format!(
            "Column '{}' is not numeric",
            args.x_column
        )));
    }

    let values: Vec<Value> = table
        .rows
        .iter()
        .take(MAX_POINTS)
        .map(|row| {
            let mut point = Map::new();
            point.insert(args.x_column.clone(), cell_value(&row[x_idx]));
            if let (Some(i), Some(y)) = (y_idx, &args.y_column) {
                point.insert(y.clone(), cell_value(&row[i]));
            }
            Value::Object(point)
        })
        .collect();

    let x = &args.x_column;
    let y_field = |agg: &str| match args.y_column.as_deref() {
        Some(y) => json!({"field": y, "type": "quantitative", "aggregate": agg}),
        None => json!({"aggregate": "count", "type": "quantitative"}),
    };

    let (mark, encoding) = match args.chart_type {
        ChartType::Bar => (
            json!("bar"),
            json!({"x": {"field": x, "type": field_type(table, x)?}, "y": y_field("sum")}),
        ),
        ChartType::Line => (
            json!({"type": "line", "point": true}),
            json!({"x": {"field": x, "type": field_type(table, x)?}, "y": y_field("sum")}),
        ),
        ChartType::Scatter => {
            let y = args.y_column.as_deref().unwrap_or_default();
            (
                json!("point"),
                json!({
                    "x": {"field": x, "type": field_type(table, x)?},
                    "y": {"field": y, "type": field_type(table, y)?},
                }),
            )
        }
        ChartType::Pie => (
            json!("arc"),
            json!({"theta": y_field("sum"), "color": {"field": x, "type": "nominal"}}),
        ),
        ChartType::Hist => (
            json!("bar"),
            json!({
                "x": {"field": x, "type": "quantitative", "bin": true},
                "y": {"aggregate": "count", "type": "quantitative"},
            }),
        ),
    };

    let title = args.title.clone().unwrap_or_else(|| match &args.y_column {
        Some(y) => format!("{} by {}", y, x),
        None => format!("{} distribution", x),
    });

    Ok(json!({
        "$schema": VEGA_LITE_SCHEMA,
        "title": title,
        "data": {"values": values},
        "mark": mark,
        "encoding": encoding,
    }))
}

/// `<stem>.vl.json`, whatever extension the model asked for
fn output_name(args: &VisualizationArgs) -> String {
    let stem = match args.save_name.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(name) => {
            let name = name.trim_end_matches(".vl.json");
            Path::new(name)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| name.to_string())
        }
        None => format!("{}_{}", args.chart_type.as_str(), file_stem(&args.x_column)),
    };
    format!("{}.vl.json", stem)
}

#[async_trait]
impl ToolHandler for VisualizationTool {
    fn kind(&self) -> ToolKind {
        ToolKind::CreateVisualization
    }

    async fn invoke(&self, args: Value) -> Result<Value> {
        let args: VisualizationArgs = parse_args(self.kind(), args)?;
        let table = load_table(&self.workspace, &args.file_path).await?;
        let spec = build_spec(&table, &args)?;

        let path = self
            .workspace
            .artifact_path(args.task_folder.as_deref(), &output_name(&args));
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, serde_json::to_string_pretty(&spec)?)
            .await
            .map_err(|e| PlanwiseError::tool(format!("Error saving chart {}: {}", path.display(), e)))?;

        Ok(json!({
            "messages": format!("Chart saved to {}", path.display()),
            "path": path.display().to_string(),
            "chart_type": args.chart_type.as_str(),
            "points": table.row_count().min(MAX_POINTS),
        }))
    }
}
