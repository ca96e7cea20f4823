use std::path::Path;

use crate::error::LoadError;

/// Raw tabular feed: header names and row-major string cells.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl LoadedTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// A single cell after type detection. Numbers are detected per cell; anything
/// that does not parse stays text.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Missing,
    Number(f64),
    Text(String),
}

pub fn parse_cell(raw: &str) -> CellValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return CellValue::Missing;
    }
    match trimmed.parse::<f64>() {
        Ok(v) => CellValue::Number(v),
        Err(_) => CellValue::Text(trimmed.to_string()),
    }
}

/// Load a CSV or Excel file. The first row is the header.
pub fn load_table(path: &Path) -> Result<LoadedTable, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let table = match ext.as_str() {
        "csv" => load_csv(path)?,
        "xls" | "xlsx" => load_excel(path)?,
        _ => return Err(LoadError::UnsupportedFormat(ext)),
    };
    tracing::debug!(
        "Read {} rows x {} columns from {}",
        table.row_count(),
        table.columns.len(),
        path.display()
    );
    Ok(table)
}

fn load_csv(path: &Path) -> Result<LoadedTable, LoadError> {
    let content = std::fs::read(path)?;
    // Fall back to latin1 when the file is not valid UTF-8.
    let text = match String::from_utf8(content) {
        Ok(s) => s,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    };
    parse_csv(&text, &path.display().to_string())
}

pub(crate) fn parse_csv(text: &str, source: &str) -> Result<LoadedTable, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|s| s.trim().to_string())
        .collect();
    if columns.is_empty() {
        return Err(LoadError::Empty(source.to_string()));
    }

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for result in reader.records() {
        match result {
            Ok(record) => {
                let mut row: Vec<String> = record.iter().map(|s| s.to_string()).collect();
                row.resize(columns.len(), String::new());
                rows.push(row);
            }
            Err(e) => {
                skipped += 1;
                tracing::warn!("Skipping malformed row in {source}: {e}");
            }
        }
    }

    if rows.is_empty() {
        return Err(LoadError::Empty(source.to_string()));
    }
    if skipped > 0 {
        tracing::warn!("Skipped {skipped} malformed rows in {source}");
    }

    Ok(LoadedTable { columns, rows })
}

fn load_excel(path: &Path) -> Result<LoadedTable, LoadError> {
    use calamine::{open_workbook_auto, Data, Reader};

    let source = path.display().to_string();
    let mut workbook = open_workbook_auto(path)?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| LoadError::Empty(source.clone()))?;

    let range = workbook.worksheet_range(&sheet_name)?;

    let mut all_rows = range.rows().map(|row| {
        row.iter()
            .map(|cell| match cell {
                Data::Empty => String::new(),
                Data::String(s) => s.clone(),
                Data::Float(f) => f.to_string(),
                Data::Int(i) => i.to_string(),
                Data::Bool(b) => b.to_string(),
                Data::DateTime(dt) => dt.to_string(),
                Data::DateTimeIso(s) => s.clone(),
                Data::DurationIso(s) => s.clone(),
                Data::Error(e) => format!("{e:?}"),
            })
            .collect::<Vec<String>>()
    });

    let columns: Vec<String> = all_rows
        .next()
        .ok_or_else(|| LoadError::Empty(source.clone()))?
        .iter()
        .map(|s| s.trim().to_string())
        .collect();

    let rows: Vec<Vec<String>> = all_rows
        .map(|mut row| {
            row.resize(columns.len(), String::new());
            row
        })
        .collect();

    if rows.is_empty() {
        return Err(LoadError::Empty(source));
    }

    Ok(LoadedTable { columns, rows })
}
