//! Record decoding.
//!
//! Every physical line is one independent JSON value whose top level must be an object:
//!
//! ```text
//! {"id":"1","title":"first"}
//! {"id":"2","title":"second"}
//! ```
//!
//! There is no whole-file parse; a malformed line fails only itself.

use crate::error::DecodeError;
use crate::types::{record_from_json, Record, Value};

/// Decode one line into a [`Record`].
pub fn decode_line(line: &str) -> Result<Record, DecodeError> {
    match serde_json::from_str::<serde_json::Value>(line)? {
        serde_json::Value::Object(map) => Ok(record_from_json(map)),
        other => Err(DecodeError::NotAnObject {
            found: Value::from(other).kind(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_object_line() {
        let record = decode_line(r#"{"id":"123","title":"Test","n":2,"tags":["a"]}"#).unwrap();
        assert_eq!(record["id"], Value::from("123"));
        assert_eq!(record["title"], Value::from("Test"));
        assert_eq!(record["n"], Value::Int(2));
        assert_eq!(record["tags"], Value::Array(vec![Value::from("a")]));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = decode_line(r#"{"id": "#).unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
        assert!(err.to_string().starts_with("invalid json"));
    }

    #[test]
    fn rejects_empty_line() {
        assert!(matches!(decode_line("").unwrap_err(), DecodeError::Json(_)));
    }

    #[test]
    fn rejects_non_object_top_level() {
        let err = decode_line("[1,2]").unwrap_err();
        assert_eq!(err.to_string(), "expected a json object, got array");
        assert!(matches!(decode_line("42").unwrap_err(), DecodeError::NotAnObject { found: "number" }));
    }

    #[test]
    fn does_not_parse_across_lines() {
        assert!(decode_line("{\"a\":1}\n{\"a\":2}").is_err());
    }
}
