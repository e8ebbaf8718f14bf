//! Tabular analyses: preview, statistics, trend, category, correlation, outliers

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

use super::stats::{self, round4};
use super::table::parse_number;
use super::{file_stem, load_table, save_result};
use crate::core::{PlanwiseError, Result};
use crate::tools::kind::ToolKind;
use crate::tools::registry::{parse_args, ToolHandler};
use crate::tools::workspace::Workspace;

const STRONG_CORRELATION: f64 = 0.7;
const IQR_FENCE: f64 = 1.5;

fn num(v: Option<f64>) -> Value {
    v.map(|x| json!(round4(x))).unwrap_or(Value::Null)
}

macro_rules! data_tool {
    ($name:ident) => {
        pub struct $name {
            workspace: Workspace,
        }

        impl $name {
            pub fn new(workspace: Workspace) -> Self {
                Self { workspace }
            }
        }
    };
}

data_tool!(ReadCsvTool);
data_tool!(StatisticsTool);
data_tool!(TrendAnalysisTool);
data_tool!(CategoryAnalysisTool);
data_tool!(CorrelationAnalysisTool);
data_tool!(OutlierDetectionTool);

// ---- read_csv_data ----

#[derive(Deserialize)]
struct ReadCsvArgs {
    file_path: String,
    #[serde(default)]
    preview_rows: Option<usize>,
}

#[async_trait]
impl ToolHandler for ReadCsvTool {
    fn kind(&self) -> ToolKind {
        ToolKind::ReadCsvData
    }

    async fn invoke(&self, args: Value) -> Result<Value> {
        let args: ReadCsvArgs = parse_args(self.kind(), args)?;
        let table = load_table(&self.workspace, &args.file_path).await?;

        let columns: Vec<Value> = table
            .headers
            .iter()
            .enumerate()
            .map(|(i, name)| {
                json!({
                    "name": name,
                    "numeric": table.is_numeric(i),
                    "missing": table.missing_count(i),
                })
            })
            .collect();

        let preview_rows = args.preview_rows.unwrap_or(5).min(table.row_count());
        let preview: Vec<Value> = (0..preview_rows).map(|i| table.row_json(i)).collect();

        Ok(json!({
            "file_path": args.file_path,
            "rows": table.row_count(),
            "columns": columns,
            "preview": preview,
        }))
    }
}

// ---- data_statistics_analysis ----

#[derive(Deserialize)]
struct StatisticsArgs {
    file_path: String,
    #[serde(default)]
    task_folder: Option<String>,
}

#[async_trait]
impl ToolHandler for StatisticsTool {
    fn kind(&self) -> ToolKind {
        ToolKind::DataStatisticsAnalysis
    }

    async fn invoke(&self, args: Value) -> Result<Value> {
        let args: StatisticsArgs = parse_args(self.kind(), args)?;
        let table = load_table(&self.workspace, &args.file_path).await?;

        let mut numeric = Map::new();
        let mut categorical = Map::new();
        let mut missing = Map::new();

        for (idx, name) in table.headers.iter().enumerate() {
            missing.insert(name.clone(), json!(table.missing_count(idx)));

            if table.is_numeric(idx) {
                let values = table.numeric(name)?;
                let sorted = stats::sorted(&values);
                numeric.insert(
                    name.clone(),
                    json!({
                        "count": values.len(),
                        "mean": num(stats::mean(&values)),
                        "std": num(stats::std_dev(&values)),
                        "min": num(stats::min(&values)),
                        "25%": num(stats::quantile(&sorted, 0.25)),
                        "50%": num(stats::quantile(&sorted, 0.5)),
                        "75%": num(stats::quantile(&sorted, 0.75)),
                        "max": num(stats::max(&values)),
                    }),
                );
            } else {
                let mut freq: HashMap<&str, usize> = HashMap::new();
                for row in &table.rows {
                    let cell = row[idx].trim();
                    if !cell.is_empty() {
                        *freq.entry(cell).or_default() += 1;
                    }
                }
                let count: usize = freq.values().sum();
                let top = freq
                    .iter()
                    .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
                    .map(|(v, n)| (v.to_string(), *n));
                categorical.insert(
                    name.clone(),
                    json!({
                        "count": count,
                        "unique": freq.len(),
                        "top": top.as_ref().map(|t| t.0.clone()),
                        "freq": top.map(|t| t.1),
                    }),
                );
            }
        }

        let mut result = json!({
            "file_path": args.file_path,
            "rows": table.row_count(),
            "columns": table.headers.len(),
            "numeric": numeric,
            "categorical": categorical,
            "missing": missing,
        });
        save_result(
            &self.workspace,
            args.task_folder.as_deref(),
            "statistics_analysis.json",
            &mut result,
        )
        .await?;
        Ok(result)
    }
}

// ---- trend_analysis ----

#[derive(Deserialize)]
struct TrendArgs {
    file_path: String,
    date_column: String,
    value_column: String,
    #[serde(default)]
    task_folder: Option<String>,
}

fn parse_date(s: &str) -> Option<NaiveDateTime> {
    const DATETIME: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"];
    const DATE: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%Y%m%d"];

    let s = s.trim();
    DATETIME
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .or_else(|| {
            DATE.iter()
                .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[async_trait]
impl ToolHandler for TrendAnalysisTool {
    fn kind(&self) -> ToolKind {
        ToolKind::TrendAnalysis
    }

    async fn invoke(&self, args: Value) -> Result<Value> {
        let args: TrendArgs = parse_args(self.kind(), args)?;
        let table = load_table(&self.workspace, &args.file_path).await?;
        let d_idx = table.column_index(&args.date_column)?;
        let v_idx = table.column_index(&args.value_column)?;
        if !table.is_numeric(v_idx) {
            return Err(PlanwiseError::tool(format!(
                "Column '{}' is not numeric",
                args.value_column
            )));
        }

        let mut totals: HashMap<String, f64> = HashMap::new();
        for row in &table.rows {
            let period = row[d_idx].trim();
            if period.is_empty() {
                continue;
            }
            if let Some(v) = parse_number(&row[v_idx]) {
                *totals.entry(period.to_string()).or_default() += v;
            }
        }
        if totals.is_empty() {
            return Err(PlanwiseError::tool(
                "No rows with both a period and a numeric value",
            ));
        }

        let mut periods: Vec<(String, f64)> = totals.into_iter().collect();
        if periods.iter().all(|(p, _)| parse_date(p).is_some()) {
            periods.sort_by_key(|(p, _)| parse_date(p));
        } else {
            periods.sort_by(|a, b| a.0.cmp(&b.0));
        }

        let values: Vec<f64> = periods.iter().map(|(_, v)| *v).collect();
        let first = values[0];
        let last = values[values.len() - 1];
        let slope = stats::slope(&values);
        let direction = match slope {
            Some(s) if s > 1e-9 => "increasing",
            Some(s) if s < -1e-9 => "decreasing",
            _ => "flat",
        };
        let peak = periods
            .iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(p, v)| json!({"period": p, "value": round4(*v)}));
        let trough = periods
            .iter()
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(p, v)| json!({"period": p, "value": round4(*v)}));

        let mut result = json!({
            "date_column": args.date_column,
            "value_column": args.value_column,
            "periods": periods
                .iter()
                .map(|(p, v)| json!({"period": p, "value": round4(*v)}))
                .collect::<Vec<_>>(),
            "first": round4(first),
            "last": round4(last),
            "change": round4(last - first),
            "change_pct": num((first != 0.0).then(|| (last - first) / first.abs() * 100.0)),
            "slope": num(slope),
            "direction": direction,
            "peak": peak,
            "trough": trough,
        });
        save_result(
            &self.workspace,
            args.task_folder.as_deref(),
            &format!("trend_{}.json", file_stem(&args.value_column)),
            &mut result,
        )
        .await?;
        Ok(result)
    }
}

// ---- category_analysis ----

#[derive(Deserialize)]
struct CategoryArgs {
    file_path: String,
    category_column: String,
    #[serde(default)]
    value_column: Option<String>,
    #[serde(default)]
    top_n: Option<usize>,
    #[serde(default)]
    task_folder: Option<String>,
}

#[async_trait]
impl ToolHandler for CategoryAnalysisTool {
    fn kind(&self) -> ToolKind {
        ToolKind::CategoryAnalysis
    }

    async fn invoke(&self, args: Value) -> Result<Value> {
        let args: CategoryArgs = parse_args(self.kind(), args)?;
        let table = load_table(&self.workspace, &args.file_path).await?;
        let c_idx = table.column_index(&args.category_column)?;
        let v_idx = match args.value_column.as_deref() {
            Some(col) => {
                let idx = table.column_index(col)?;
                if !table.is_numeric(idx) {
                    return Err(PlanwiseError::tool(format!("Column '{}' is not numeric", col)));
                }
                Some(idx)
            }
            None => None,
        };

        let mut groups: HashMap<String, (usize, f64)> = HashMap::new();
        for row in &table.rows {
            let key = match row[c_idx].trim() {
                "" => "(missing)".to_string(),
                k => k.to_string(),
            };
            let entry = groups.entry(key).or_default();
            entry.0 += 1;
            if let Some(v) = v_idx.and_then(|i| parse_number(&row[i])) {
                entry.1 += v;
            }
        }

        let weight = |(count, total): (usize, f64)| {
            if v_idx.is_some() {
                total
            } else {
                count as f64
            }
        };
        let grand_total: f64 = groups.values().map(|g| weight(*g)).sum();

        let mut ranked: Vec<(String, (usize, f64))> = groups.into_iter().collect();
        ranked.sort_by(|a, b| {
            weight(b.1)
                .total_cmp(&weight(a.1))
                .then_with(|| a.0.cmp(&b.0))
        });
        let total_categories = ranked.len();
        ranked.truncate(args.top_n.unwrap_or(10));

        let categories: Vec<Value> = ranked
            .into_iter()
            .map(|(name, (count, total))| {
                let mut entry = json!({
                    "category": name,
                    "count": count,
                    "share_pct": num(
                        (grand_total != 0.0).then(|| weight((count, total)) / grand_total * 100.0)
                    ),
                });
                if v_idx.is_some() {
                    entry["total"] = json!(round4(total));
                    entry["mean"] = json!(round4(total / count as f64));
                }
                entry
            })
            .collect();

        let mut result = json!({
            "category_column": args.category_column,
            "value_column": args.value_column,
            "total_categories": total_categories,
            "categories": categories,
        });
        save_result(
            &self.workspace,
            args.task_folder.as_deref(),
            &format!("category_{}.json", file_stem(&args.category_column)),
            &mut result,
        )
        .await?;
        Ok(result)
    }
}

// ---- correlation_analysis ----

#[derive(Deserialize)]
struct CorrelationArgs {
    file_path: String,
    #[serde(default)]
    columns: Option<Vec<String>>,
    #[serde(default)]
    task_folder: Option<String>,
}

#[async_trait]
impl ToolHandler for CorrelationAnalysisTool {
    fn kind(&self) -> ToolKind {
        ToolKind::CorrelationAnalysis
    }

    async fn invoke(&self, args: Value) -> Result<Value> {
        let args: CorrelationArgs = parse_args(self.kind(), args)?;
        let table = load_table(&self.workspace, &args.file_path).await?;

        let columns: Vec<String> = match args.columns.filter(|c| !c.is_empty()) {
            Some(cols) => {
                for col in &cols {
                    if !table.is_numeric(table.column_index(col)?) {
                        return Err(PlanwiseError::tool(format!("Column '{}' is not numeric", col)));
                    }
                }
                cols
            }
            None => table.numeric_columns().into_iter().map(String::from).collect(),
        };
        if columns.len() < 2 {
            return Err(PlanwiseError::tool(
                "Correlation needs at least two numeric columns",
            ));
        }

        let indices: Vec<usize> = columns
            .iter()
            .map(|c| table.column_index(c))
            .collect::<Result<_>>()?;

        let mut matrix = Map::new();
        let mut strong = Vec::new();
        for (i, a) in columns.iter().enumerate() {
            let mut row = Map::new();
            for (j, b) in columns.iter().enumerate() {
                let (xs, ys): (Vec<f64>, Vec<f64>) = table
                    .rows
                    .iter()
                    .filter_map(|r| Some((parse_number(&r[indices[i]])?, parse_number(&r[indices[j]])?)))
                    .unzip();
                let r = stats::pearson(&xs, &ys);
                if let Some(r) = r.filter(|r| j > i && r.abs() >= STRONG_CORRELATION) {
                    strong.push(json!({"a": a, "b": b, "r": round4(r)}));
                }
                row.insert(b.clone(), num(r));
            }
            matrix.insert(a.clone(), Value::Object(row));
        }
        strong.sort_by(|x, y| {
            let rx = x["r"].as_f64().unwrap_or(0.0).abs();
            let ry = y["r"].as_f64().unwrap_or(0.0).abs();
            ry.total_cmp(&rx)
        });

        let mut result = json!({
            "columns": columns,
            "matrix": matrix,
            "strong_pairs": strong,
        });
        save_result(
            &self.workspace,
            args.task_folder.as_deref(),
            "correlation_analysis.json",
            &mut result,
        )
        .await?;
        Ok(result)
    }
}

// ---- outlier_detection ----

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
enum OutlierMethod {
    Iqr,
    #[serde(alias = "z-score", alias = "z_score")]
    Zscore,
    #[default]
    Both,
}

#[derive(Deserialize)]
struct OutlierArgs {
    file_path: String,
    column_name: String,
    #[serde(default)]
    method: OutlierMethod,
    #[serde(default)]
    threshold: Option<f64>,
    #[serde(default)]
    task_folder: Option<String>,
}

fn listed(points: &[(usize, f64)], keep: impl Fn(f64) -> bool) -> Vec<Value> {
    points
        .iter()
        .filter(|(_, v)| keep(*v))
        .map(|(row, v)| json!({"row": row, "value": round4(*v)}))
        .collect()
}

#[async_trait]
impl ToolHandler for OutlierDetectionTool {
    fn kind(&self) -> ToolKind {
        ToolKind::OutlierDetection
    }

    async fn invoke(&self, args: Value) -> Result<Value> {
        let args: OutlierArgs = parse_args(self.kind(), args)?;
        let table = load_table(&self.workspace, &args.file_path).await?;
        let idx = table.column_index(&args.column_name)?;
        if !table.is_numeric(idx) {
            return Err(PlanwiseError::tool(format!(
                "Column '{}' is not numeric",
                args.column_name
            )));
        }

        // 1-based data row numbers
        let points: Vec<(usize, f64)> = table
            .rows
            .iter()
            .enumerate()
            .filter_map(|(i, r)| parse_number(&r[idx]).map(|v| (i + 1, v)))
            .collect();
        let values: Vec<f64> = points.iter().map(|(_, v)| *v).collect();

        let mut result = json!({
            "column": args.column_name,
            "count": values.len(),
        });

        if matches!(args.method, OutlierMethod::Iqr | OutlierMethod::Both) {
            let sorted = stats::sorted(&values);
            if let (Some(q1), Some(q3)) = (stats::quantile(&sorted, 0.25), stats::quantile(&sorted, 0.75)) {
                let iqr = q3 - q1;
                let (lower, upper) = (q1 - IQR_FENCE * iqr, q3 + IQR_FENCE * iqr);
                let outliers = listed(&points, |v| v < lower || v > upper);
                result["iqr"] = json!({
                    "q1": round4(q1),
                    "q3": round4(q3),
                    "iqr": round4(iqr),
                    "lower_bound": round4(lower),
                    "upper_bound": round4(upper),
                    "outlier_count": outliers.len(),
                    "outliers": outliers,
                });
            }
        }

        if matches!(args.method, OutlierMethod::Zscore | OutlierMethod::Both) {
            let threshold = args.threshold.unwrap_or(3.0);
            let mean = stats::mean(&values).unwrap_or(0.0);
            let std = stats::std_dev(&values).filter(|s| *s > 0.0);
            let outliers = match std {
                Some(s) => listed(&points, |v| ((v - mean) / s).abs() > threshold),
                None => Vec::new(),
            };
            result["zscore"] = json!({
                "mean": round4(mean),
                "std": num(std),
                "threshold": threshold,
                "outlier_count": outliers.len(),
                "outliers": outliers,
            });
        }

        save_result(
            &self.workspace,
            args.task_folder.as_deref(),
            &format!("outliers_{}.json", file_stem(&args.column_name)),
            &mut result,
        )
        .await?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALES: &str = "date,region,units,price\n\
        2024-01-02,north,10,2.5\n\
        2024-01-01,south,4,3.0\n\
        2024-01-03,north,12,2.0\n\
        2024-01-03,west,,4.0\n\
        2024-01-04,south,100,1.0\n";

    fn setup() -> (tempfile::TempDir, Workspace) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sales.csv"), SALES).unwrap();
        let ws = Workspace::new(dir.path(), "output");
        (dir, ws)
    }

    #[tokio::test]
    async fn test_read_csv_preview() {
        let (_dir, ws) = setup();
        let out = ReadCsvTool::new(ws)
            .invoke(json!({"file_path": "sales.csv", "preview_rows": 2}))
            .await
            .unwrap();

        assert_eq!(out["rows"], 5);
        assert_eq!(out["columns"][1], json!({"name": "region", "numeric": false, "missing": 0}));
        assert_eq!(out["columns"][2]["missing"], 1);
        assert_eq!(out["preview"].as_array().unwrap().len(), 2);
        assert_eq!(out["preview"][0]["region"], "north");
    }

    #[tokio::test]
    async fn test_statistics_saved_to_task_folder() {
        let (dir, ws) = setup();
        let out = StatisticsTool::new(ws)
            .invoke(json!({"file_path": "sales.csv", "task_folder": "output/T1"}))
            .await
            .unwrap();

        assert_eq!(out["numeric"]["units"]["count"], 4);
        assert_eq!(out["numeric"]["units"]["max"], 100.0);
        assert_eq!(out["categorical"]["region"]["unique"], 3);
        assert_eq!(out["categorical"]["region"]["top"], "north");
        assert!(dir.path().join("output/T1/statistics_analysis.json").is_file());
        assert!(out["saved_to"].as_str().unwrap().ends_with("statistics_analysis.json"));
    }

    #[tokio::test]
    async fn test_statistics_without_folder_writes_nothing() {
        let (dir, ws) = setup();
        let out = StatisticsTool::new(ws)
            .invoke(json!({"file_path": "sales.csv"}))
            .await
            .unwrap();
        assert!(out.get("saved_to").is_none());
        assert!(!dir.path().join("output").exists());
    }

    #[tokio::test]
    async fn test_trend_sorts_dates() {
        let (_dir, ws) = setup();
        let out = TrendAnalysisTool::new(ws)
            .invoke(json!({"file_path": "sales.csv", "date_column": "date", "value_column": "units"}))
            .await
            .unwrap();

        let periods: Vec<&str> = out["periods"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["period"].as_str().unwrap())
            .collect();
        assert_eq!(periods, vec!["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04"]);
        assert_eq!(out["first"], 4.0);
        assert_eq!(out["last"], 100.0);
        assert_eq!(out["direction"], "increasing");
        assert_eq!(out["peak"]["period"], "2024-01-04");
    }

    #[tokio::test]
    async fn test_category_ranking() {
        let (_dir, ws) = setup();
        let out = CategoryAnalysisTool::new(ws)
            .invoke(json!({
                "file_path": "sales.csv",
                "category_column": "region",
                "value_column": "units",
                "top_n": 2
            }))
            .await
            .unwrap();

        assert_eq!(out["total_categories"], 3);
        let cats = out["categories"].as_array().unwrap();
        assert_eq!(cats.len(), 2);
        assert_eq!(cats[0]["category"], "south");
        assert_eq!(cats[0]["total"], 104.0);
        assert_eq!(cats[1]["category"], "north");
        assert_eq!(cats[1]["count"], 2);
    }

    #[tokio::test]
    async fn test_correlation_matrix() {
        let (_dir, ws) = setup();
        let out = CorrelationAnalysisTool::new(ws)
            .invoke(json!({"file_path": "sales.csv"}))
            .await
            .unwrap();

        assert_eq!(out["columns"], json!(["units", "price"]));
        assert_eq!(out["matrix"]["units"]["units"], 1.0);
        let r = out["matrix"]["units"]["price"].as_f64().unwrap();
        assert!(r < -0.7);
        assert_eq!(out["strong_pairs"][0]["a"], "units");
    }

    #[tokio::test]
    async fn test_correlation_needs_two_columns() {
        let (_dir, ws) = setup();
        let err = CorrelationAnalysisTool::new(ws)
            .invoke(json!({"file_path": "sales.csv", "columns": ["units"]}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("at least two"));
    }

    #[tokio::test]
    async fn test_outliers_iqr() {
        let (_dir, ws) = setup();
        let out = OutlierDetectionTool::new(ws)
            .invoke(json!({"file_path": "sales.csv", "column_name": "units", "method": "iqr"}))
            .await
            .unwrap();

        assert_eq!(out["iqr"]["outlier_count"], 1);
        assert_eq!(out["iqr"]["outliers"][0], json!({"row": 5, "value": 100.0}));
        assert!(out.get("zscore").is_none());
    }

    #[tokio::test]
    async fn test_outliers_rejects_text_column() {
        let (_dir, ws) = setup();
        let err = OutlierDetectionTool::new(ws)
            .invoke(json!({"file_path": "sales.csv", "column_name": "region"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not numeric"));
    }
}
