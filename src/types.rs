//! Core data model types for record ingestion.
//!
//! Every decoded line becomes a [`Record`]: an insertion-ordered map from field name to a typed
//! [`Value`]. Records are produced fresh per line and never shared between lines.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A structured record destined for the sink.
pub type Record = IndexMap<String, Value>;

/// A single typed value in a [`Record`].
///
/// Mirrors the JSON data model so that merge and evaluation logic can pattern-match on the shape
/// of a field instead of guessing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing/explicit `null` value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit float (also used for integers outside the `i64` range).
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Ordered sequence of values.
    Array(Vec<Value>),
    /// Nested object.
    Object(Record),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the string slice if this is a [`Value::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Short name of the value's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) | Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                // u64 beyond i64::MAX and real numbers both land here.
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => Value::Object(record_from_json(map)),
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect()),
            Value::Object(record) => serde_json::Value::Object(
                record
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Convert a decoded JSON object into a [`Record`], preserving field order.
pub fn record_from_json(map: serde_json::Map<String, serde_json::Value>) -> Record {
    map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_numbers_map_to_int_or_float() {
        assert_eq!(Value::from(json!(7)), Value::Int(7));
        assert_eq!(Value::from(json!(2.5)), Value::Float(2.5));
        assert_eq!(Value::from(json!(u64::MAX)), Value::Float(u64::MAX as f64));
    }

    #[test]
    fn nested_objects_keep_field_order() {
        let v = Value::from(json!({"z": 1, "a": {"y": [true, null], "b": "x"}}));
        let Value::Object(record) = v else {
            panic!("expected object");
        };
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["z", "a"]);
        let Value::Object(inner) = &record["a"] else {
            panic!("expected nested object");
        };
        assert_eq!(inner.keys().collect::<Vec<_>>(), vec!["y", "b"]);
        assert_eq!(inner["y"], Value::Array(vec![Value::Bool(true), Value::Null]));
    }

    #[test]
    fn non_finite_float_serializes_as_null() {
        assert_eq!(serde_json::Value::from(&Value::Float(f64::NAN)), serde_json::Value::Null);
    }

    #[test]
    fn serializes_untagged() {
        let mut record = Record::new();
        record.insert("id".to_string(), Value::from("123"));
        record.insert("n".to_string(), Value::Int(3));
        record.insert("none".to_string(), Value::Null);
        let text = serde_json::to_string(&record).unwrap();
        assert_eq!(text, r#"{"id":"123","n":3,"none":null}"#);
    }
}
