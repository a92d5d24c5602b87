//! Scalar value types for database-agnostic row transfer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single scalar cell within a row.
///
/// Values are positional: a [`Row`] aligns with the column list of the
/// selection that produced it. Text is the common denominator between the
/// file side and the database side, so every variant renders to a field
/// string losslessly via [`Value::to_field`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int64(i64),
    Float64(f64),
    String(String),
    Date(NaiveDate),
}

impl Value {
    /// Render this value as a delimited-file field.
    ///
    /// NULL renders as the empty string, matching what a header-and-rows
    /// flat file can represent.
    pub fn to_field(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Int64(v) => v.to_string(),
            Value::Float64(v) => v.to_string(),
            Value::String(v) => v.clone(),
            Value::Date(v) => v.format("%Y-%m-%d").to_string(),
        }
    }

    /// Check if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

/// An ordered sequence of scalar values aligned with a column selection.
pub type Row = Vec<Value>;

/// Convert a JSON scalar (one JSONEachRow cell) into a [`Value`].
///
/// Arrays and objects have no flat-file representation and are carried as
/// their JSON text.
pub fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::String(b.to_string()),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int64(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float64(f)
            } else {
                Value::String(n.to_string())
            }
        }
        serde_json::Value::String(s) => Value::String(s.clone()),
        other => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_field() {
        assert_eq!(Value::Null.to_field(), "");
        assert_eq!(Value::Int64(42).to_field(), "42");
        assert_eq!(Value::String("x".into()).to_field(), "x");
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(Value::Date(d).to_field(), "2024-01-02");
    }

    #[test]
    fn test_json_to_value() {
        assert_eq!(json_to_value(&serde_json::json!(null)), Value::Null);
        assert_eq!(json_to_value(&serde_json::json!(7)), Value::Int64(7));
        assert_eq!(json_to_value(&serde_json::json!(2.5)), Value::Float64(2.5));
        assert_eq!(
            json_to_value(&serde_json::json!("hi")),
            Value::String("hi".into())
        );
        assert_eq!(
            json_to_value(&serde_json::json!([1, 2])),
            Value::String("[1,2]".into())
        );
    }
}
