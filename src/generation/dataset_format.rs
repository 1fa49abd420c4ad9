//! Recognition of dataset text as JSON or CSV

use crate::generation::types::Record;
use crate::generation::{GenerationError, GenerationResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How many leading lines are compared when sniffing CSV
const CSV_PROBE_LINES: usize = 5;

/// Detected layout of a dataset string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetFormat {
    Json,
    Csv,
    Unknown,
}

impl DatasetFormat {
    /// A JSON array is tried first, then a comma-separated table with a
    /// stable column count over the first lines.
    pub fn detect(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return DatasetFormat::Unknown;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Array(_)) => return DatasetFormat::Json,
            Ok(_) => return DatasetFormat::Unknown,
            Err(_) => {}
        }
        if looks_like_csv(trimmed) {
            DatasetFormat::Csv
        } else {
            DatasetFormat::Unknown
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, DatasetFormat::Unknown)
    }
}

fn looks_like_csv(text: &str) -> bool {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(CSV_PROBE_LINES)
        .collect();
    let Some(first) = lines.first() else {
        return false;
    };
    let width = split_csv_line(first).len();
    if width < 2 {
        return false;
    }
    lines.iter().all(|l| split_csv_line(l).len() == width)
}

/// Split one CSV line, honouring double-quoted fields and `""` escapes.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields.into_iter().map(|f| f.trim().to_string()).collect()
}

/// Parse dataset text into records.
///
/// JSON must be an array of objects. For CSV the first line is the header
/// and every value is kept as a string.
pub fn parse_records(text: &str) -> GenerationResult<Vec<Record>> {
    match DatasetFormat::detect(text) {
        DatasetFormat::Json => parse_json_records(text.trim()),
        DatasetFormat::Csv => Ok(parse_csv_records(text)),
        DatasetFormat::Unknown => Err(GenerationError::invalid_data(
            "Dataset is neither a JSON array nor CSV text",
        )),
    }
}

fn parse_json_records(text: &str) -> GenerationResult<Vec<Record>> {
    let items = match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => items,
        Ok(_) => {
            return Err(GenerationError::invalid_data(
                "JSON dataset must be an array of objects",
            ))
        }
        Err(e) => return Err(GenerationError::invalid_data(format!("Invalid JSON: {}", e))),
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(record) => Ok(record),
            _ => Err(GenerationError::invalid_data(
                "JSON dataset must be an array of objects",
            )),
        })
        .collect()
}

fn parse_csv_records(text: &str) -> Vec<Record> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    let Some(header_line) = lines.next() else {
        return Vec::new();
    };
    let header = split_csv_line(header_line);

    lines
        .map(|line| {
            let values = split_csv_line(line);
            header
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let value = values.get(i).cloned().unwrap_or_default();
                    (name.clone(), Value::String(value))
                })
                .collect()
        })
        .collect()
}

/// Cut `text` to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
