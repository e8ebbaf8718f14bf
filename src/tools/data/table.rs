//! In-memory CSV table
//!
//! A small quote-aware reader: comma separated, `"` quoting with `""`
//! escapes, quoted fields may span lines. Cells stay strings; a column is
//! numeric when every non-empty cell parses as `f64`.

use serde_json::{Map, Value};
use std::path::Path;

use crate::core::{PlanwiseError, Result};

#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut records = split_records(text)?.into_iter();

        let headers: Vec<String> = records
            .next()
            .ok_or_else(|| PlanwiseError::tool("CSV file is empty"))?
            .into_iter()
            .map(|h| h.trim().to_string())
            .collect();

        let width = headers.len();
        let rows = records
            .map(|mut record| {
                record.resize(width, String::new());
                record
            })
            .collect();

        Ok(Self { headers, rows })
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            PlanwiseError::tool(format!("Error reading CSV {}: {}", path.display(), e))
        })?;
        Self::parse(&text)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| {
                PlanwiseError::tool(format!(
                    "Column '{}' not found. Available columns: {}",
                    name,
                    self.headers.join(", ")
                ))
            })
    }

    pub fn column(&self, name: &str) -> Result<Vec<&str>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| r[idx].as_str()).collect())
    }

    /// Values of a numeric column, skipping empty cells
    pub fn numeric(&self, name: &str) -> Result<Vec<f64>> {
        let idx = self.column_index(name)?;
        if !self.is_numeric(idx) {
            return Err(PlanwiseError::tool(format!("Column '{}' is not numeric", name)));
        }
        Ok(self
            .rows
            .iter()
            .filter_map(|r| parse_number(&r[idx]))
            .collect())
    }

    pub fn is_numeric(&self, idx: usize) -> bool {
        let mut seen = false;
        for row in &self.rows {
            let cell = row[idx].trim();
            if cell.is_empty() {
                continue;
            }
            if parse_number(cell).is_none() {
                return false;
            }
            seen = true;
        }
        seen
    }

    pub fn numeric_columns(&self) -> Vec<&str> {
        (0..self.headers.len())
            .filter(|&i| self.is_numeric(i))
            .map(|i| self.headers[i].as_str())
            .collect()
    }

    pub fn missing_count(&self, idx: usize) -> usize {
        self.rows.iter().filter(|r| r[idx].trim().is_empty()).count()
    }

    /// A row as a JSON object; numeric cells become numbers
    pub fn row_json(&self, row: usize) -> Value {
        let mut obj = Map::new();
        for (h, cell) in self.headers.iter().zip(&self.rows[row]) {
            let value = match parse_number(cell) {
                Some(n) => serde_json::Number::from_f64(n)
                    .map(Value::Number)
                    .unwrap_or_else(|| Value::String(cell.clone())),
                None if cell.is_empty() => Value::Null,
                None => Value::String(cell.clone()),
            };
            obj.insert(h.clone(), value);
        }
        Value::Object(obj)
    }
}

pub fn parse_number(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    cell.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn split_records(text: &str) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                other => field.push(other),
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                push_record(&mut records, std::mem::take(&mut record));
            }
            other => field.push(other),
        }
    }

    if in_quotes {
        return Err(PlanwiseError::tool("CSV has an unterminated quoted field"));
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        push_record(&mut records, record);
    }
    Ok(records)
}

fn push_record(records: &mut Vec<Vec<String>>, record: Vec<String>) {
    let blank = record.iter().all(|f| f.trim().is_empty());
    if !blank {
        records.push(record);
    }
}
