use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use std::io;

use crate::columns::ColumnMeta;
use crate::value::{Row, Value};

#[derive(Debug, Clone)]
pub struct CsvData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub enum ColumnSelector {
    Index(usize),
    Name(String),
}

pub fn read_csv_from_stdin() -> Result<CsvData> {
    read_csv(io::stdin())
}

pub fn read_csv<R: io::Read>(input: R) -> Result<CsvData> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV headers")?
        .iter()
        .map(|s| s.trim().to_string())
        .collect();

    if headers.is_empty() || headers.iter().all(String::is_empty) {
        return Err(anyhow!("CSV must start with a header row"));
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.context("Failed to read CSV record")?;
        let row: Vec<String> = record.iter().map(|s| s.to_string()).collect();
        rows.push(row);
    }

    Ok(CsvData { headers, rows })
}

pub fn parse_column_selector(input: &str) -> ColumnSelector {
    match input.parse::<usize>() {
        Ok(index) => ColumnSelector::Index(index),
        Err(_) => ColumnSelector::Name(input.to_string()),
    }
}

/// A CSV cell parsed as a typed value. Blank cells are null; anything
/// that reads as a finite number is a number.
pub fn parse_cell(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => Value::Number(n),
        _ => Value::Text(raw.to_string()),
    }
}

impl CsvData {
    /// The header name a selector refers to.
    pub fn resolve_column(&self, selector: ColumnSelector) -> Result<String> {
        match selector {
            ColumnSelector::Index(idx) => self.headers.get(idx).cloned().ok_or_else(|| {
                anyhow!(
                    "Column index {} out of bounds (available columns: {})",
                    idx,
                    self.headers.len()
                )
            }),
            // An exact match wins over a case-insensitive one
            ColumnSelector::Name(name) => self
                .headers
                .iter()
                .find(|h| **h == name)
                .or_else(|| self.headers.iter().find(|h| h.eq_ignore_ascii_case(&name)))
                .cloned()
                .ok_or_else(|| {
                    anyhow!(
                        "Column '{}' not found. Available columns: {}",
                        name,
                        self.headers.join(", ")
                    )
                }),
        }
    }

    /// Rows keyed by header. Short records read as null in missing columns.
    pub fn to_rows(&self) -> Vec<Row> {
        self.rows
            .iter()
            .map(|record| {
                self.headers
                    .iter()
                    .enumerate()
                    .map(|(i, header)| {
                        let value = record.get(i).map_or(Value::Null, |raw| parse_cell(raw));
                        (header.clone(), value)
                    })
                    .collect()
            })
            .collect()
    }

    /// Column metadata from the cells: `integer` when every non-blank cell
    /// is a whole number, `number` when every one is numeric, else `string`.
    pub fn infer_columns(&self) -> Vec<ColumnMeta> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let mut cells = self
                    .rows
                    .iter()
                    .filter_map(|record| record.get(i))
                    .map(|raw| parse_cell(raw))
                    .filter(|v| !v.is_null())
                    .peekable();
                let column_type = if cells.peek().is_none() {
                    "string"
                } else {
                    let mut all_integer = true;
                    let mut all_numeric = true;
                    for value in cells {
                        match value {
                            Value::Number(n) => all_integer &= n.fract() == 0.0,
                            _ => {
                                all_numeric = false;
                                break;
                            }
                        }
                    }
                    match (all_numeric, all_integer) {
                        (true, true) => "integer",
                        (true, false) => "number",
                        _ => "string",
                    }
                };
                ColumnMeta {
                    name: header.clone(),
                    column_type: column_type.to_string(),
                    display_name: None,
                }
            })
            .collect()
    }
}
