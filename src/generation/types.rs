//! Data model shared by the generation components

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A generated row: column name to scalar value.
///
/// The shape is whatever the model returned; it is expected to match the
/// requested columns by convention only.
pub type Record = Map<String, Value>;

/// One column of an inferred or user-declared schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name, non-empty
    pub name: String,
    /// Free-form semantic tag such as "email" or "integer"
    #[serde(rename = "type")]
    pub column_type: String,
    /// Optional description of the column content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Schema, row count and topic inferred from a free-text prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferredSchema {
    pub columns: Vec<ColumnSpec>,
    /// Requested number of rows
    #[serde(rename = "count", deserialize_with = "coerce_count")]
    pub row_count: i64,
    #[serde(default)]
    pub topic: String,
}

impl InferredSchema {
    /// Checks the preconditions for dispatching batches.
    ///
    /// Returns the row count, which must be at most `max_rows`.
    pub fn validate(&self, max_rows: usize) -> Result<usize, String> {
        if self.columns.is_empty() {
            return Err("the inferred schema has no columns".to_string());
        }
        if self.columns.iter().any(|c| c.name.trim().is_empty()) {
            return Err("the inferred schema contains a column without a name".to_string());
        }
        if self.row_count <= 0 {
            return Err(format!(
                "the inferred row count must be positive, got {}",
                self.row_count
            ));
        }
        let rows = usize::try_from(self.row_count).unwrap_or(usize::MAX);
        if rows > max_rows {
            return Err(format!(
                "the inferred row count {} exceeds the limit of {}",
                self.row_count, max_rows
            ));
        }
        Ok(rows)
    }
}

/// Models return counts as numbers or numeric strings.
fn coerce_count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .ok_or_else(|| serde::de::Error::custom(format!("invalid row count: {}", n))),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(|f| f.trunc() as i64)
            .map_err(|_| serde::de::Error::custom(format!("invalid row count: {:?}", s))),
        other => Err(serde::de::Error::custom(format!(
            "row count must be a number, got {}",
            other
        ))),
    }
}

/// One bounded slice of the requested rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    /// 1-based index, used for diagnostics and ordering
    pub index: usize,
    pub size: usize,
}

/// Outcome of one batch after it settled
#[derive(Debug)]
pub enum BatchResult {
    Success(Vec<Record>),
    Failure {
        batch_index: usize,
        cause: crate::generation::GenerationError,
    },
}

/// Splits `row_count` rows into batches of at most `cap` rows.
///
/// Returns an empty plan for a zero row count or a zero cap.
pub fn plan_batches(row_count: usize, cap: usize) -> Vec<BatchRequest> {
    if row_count == 0 || cap == 0 {
        return Vec::new();
    }
    let num_batches = row_count.div_ceil(cap);
    (0..num_batches)
        .map(|i| BatchRequest {
            index: i + 1,
            size: cap.min(row_count - i * cap),
        })
        .collect()
}

/// The final artifact of a generation request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedDataset {
    pub records: Vec<Record>,
    pub requested_count: usize,
    pub actual_count: usize,
    /// Indices of batches that failed terminally
    pub failed_batches: Vec<usize>,
    pub topic: String,
    pub columns: Vec<ColumnSpec>,
}

impl GeneratedDataset {
    /// True when some batches were dropped.
    pub fn is_partial(&self) -> bool {
        !self.failed_batches.is_empty() || self.actual_count < self.requested_count
    }

    /// Wire form: a pretty-printed JSON array of records.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.records).unwrap_or_else(|_| "[]".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plan_batches_sizes() {
        let plan = plan_batches(120, 50);
        let sizes: Vec<usize> = plan.iter().map(|b| b.size).collect();
        assert_eq!(sizes, vec![50, 50, 20]);
        assert_eq!(plan.iter().map(|b| b.index).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_plan_batches_invariants() {
        for cap in [1usize, 7, 50] {
            for rows in 1usize..=260 {
                let plan = plan_batches(rows, cap);
                assert_eq!(plan.len(), rows.div_ceil(cap));
                assert_eq!(plan.iter().map(|b| b.size).sum::<usize>(), rows);
                assert!(plan.iter().all(|b| b.size >= 1 && b.size <= cap));
                let last = plan.last().unwrap();
                assert_eq!(last.size, rows - (plan.len() - 1) * cap);
            }
        }
    }

    #[test]
    fn test_plan_batches_even_split_keeps_cap() {
        let plan = plan_batches(100, 50);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[1].size, 50);
        assert!(plan_batches(0, 50).is_empty());
    }

    #[test]
    fn test_inferred_schema_coerces_string_count() {
        let schema: InferredSchema = serde_json::from_value(json!({
            "columns": [{"name": "name", "type": "fullName"}],
            "count": "120",
            "topic": "users"
        }))
        .unwrap();
        assert_eq!(schema.row_count, 120);
        assert_eq!(schema.validate(1_000), Ok(120));
    }

    #[test]
    fn test_inferred_schema_validation() {
        let empty = InferredSchema {
            columns: vec![],
            row_count: 5,
            topic: "x".into(),
        };
        assert!(empty.validate(1_000).is_err());

        let zero = InferredSchema {
            columns: vec![ColumnSpec::new("a", "integer")],
            row_count: 0,
            topic: "x".into(),
        };
        assert!(zero.validate(1_000).is_err());

        let huge = InferredSchema {
            columns: vec![ColumnSpec::new("a", "integer")],
            row_count: i64::MAX,
            topic: "x".into(),
        };
        assert!(huge.validate(1_000).is_err());
        assert_eq!(InferredSchema { row_count: 1_000, ..huge }.validate(1_000), Ok(1_000));
    }

    #[test]
    fn test_column_spec_wire_names() {
        let column = ColumnSpec::new("email", "email").with_description("contact address");
        let value = serde_json::to_value(&column).unwrap();
        assert_eq!(value["type"], "email");
        assert_eq!(value["description"], "contact address");
    }
}
