//! Column specifications and type inference.
//!
//! Two probes feed the transfer pipeline: the database side maps native
//! ClickHouse type names onto the semantic [`ColumnType`] enumeration, and
//! the file side infers per-column types from a bounded sample of rows.
//! Both are lossy by design; an unmapped or mixed column lands on a string
//! type, never an error.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Number of data rows sampled when inferring a file schema.
pub const INFERENCE_SAMPLE_ROWS: usize = 100;

/// Semantic column type shared by both sides of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    String,
    Int64,
    Float64,
    Date,
    /// Fallback for native types without a semantic mapping.
    Unknown,
}

impl ColumnType {
    /// Name used in reports and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "String",
            ColumnType::Int64 => "Int64",
            ColumnType::Float64 => "Float64",
            ColumnType::Date => "Date",
            ColumnType::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named column with its semantic type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Map a native ClickHouse type name to a semantic [`ColumnType`].
///
/// `Nullable(...)` and `LowCardinality(...)` wrappers are stripped first.
/// Anything unmapped falls back to [`ColumnType::Unknown`].
pub fn map_clickhouse_type(native: &str) -> ColumnType {
    let inner = strip_type_wrappers(native);

    match inner {
        "String" | "FixedString" | "UUID" | "IPv4" | "IPv6" => ColumnType::String,
        t if t.starts_with("FixedString(") => ColumnType::String,
        t if t.starts_with("Enum") => ColumnType::String,
        "Int8" | "Int16" | "Int32" | "Int64" | "UInt8" | "UInt16" | "UInt32" | "UInt64" => {
            ColumnType::Int64
        }
        "Float32" | "Float64" => ColumnType::Float64,
        t if t.starts_with("Decimal") => ColumnType::Float64,
        "Date" | "Date32" => ColumnType::Date,
        t if t.starts_with("DateTime") => ColumnType::Date,
        _ => ColumnType::Unknown,
    }
}

/// Strip `Nullable(...)` / `LowCardinality(...)` wrappers, innermost first.
fn strip_type_wrappers(native: &str) -> &str {
    let mut inner = native.trim();
    loop {
        let next = inner
            .strip_prefix("Nullable(")
            .or_else(|| inner.strip_prefix("LowCardinality("))
            .and_then(|rest| rest.strip_suffix(')'));
        match next {
            Some(stripped) => inner = stripped,
            None => return inner,
        }
    }
}

/// Infer per-column types from sampled rows of field strings.
///
/// For each column the narrowest type matching every sampled value wins:
/// Int64, then Float64, then Date (`%Y-%m-%d`), then String. Empty fields
/// are skipped so sparse columns still infer from their populated values.
/// A column with no samples at all infers String. Inference never fails.
pub fn infer_column_types(header: &[String], sample: &[Vec<String>]) -> Vec<ColumnSpec> {
    header
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let ty = infer_one_column(sample.iter().filter_map(|row| row.get(idx)));
            ColumnSpec::new(name.clone(), ty)
        })
        .collect()
}

fn infer_one_column<'a>(values: impl Iterator<Item = &'a String>) -> ColumnType {
    let mut saw_value = false;
    let mut int_ok = true;
    let mut float_ok = true;
    let mut date_ok = true;

    for value in values {
        let v = value.trim();
        if v.is_empty() {
            continue;
        }
        saw_value = true;
        if int_ok && v.parse::<i64>().is_err() {
            int_ok = false;
        }
        if float_ok && v.parse::<f64>().is_err() {
            float_ok = false;
        }
        if date_ok && NaiveDate::parse_from_str(v, "%Y-%m-%d").is_err() {
            date_ok = false;
        }
        if !int_ok && !float_ok && !date_ok {
            break;
        }
    }

    if !saw_value {
        ColumnType::String
    } else if int_ok {
        ColumnType::Int64
    } else if float_ok {
        ColumnType::Float64
    } else if date_ok {
        ColumnType::Date
    } else {
        ColumnType::String
    }
}
