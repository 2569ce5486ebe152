//! Run configuration surface.
//!
//! [`DataStoreParams`] is the caller-supplied parameter set. A handful of keys are recognized by
//! the connector; everything else passes through unchanged into the merge context of every
//! record.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::{Record, Value};

/// Comma-separated list of file paths. Takes precedence over [`DIRS_PARAM`].
pub const FILES_PARAM: &str = "files";
/// Comma-separated list of directories, scanned non-recursively.
pub const DIRS_PARAM: &str = "directories";
/// Text encoding used to read the selected files.
pub const FILE_ENCODING_PARAM: &str = "fileEncoding";
/// Script type hint passed to the expression evaluator.
pub const SCRIPT_TYPE_PARAM: &str = "script_type";

/// Keys consumed by the connector itself; they are not copied into emitted records.
pub const RECOGNIZED_PARAMS: [&str; 4] = [FILES_PARAM, DIRS_PARAM, FILE_ENCODING_PARAM, SCRIPT_TYPE_PARAM];

pub const DEFAULT_FILE_ENCODING: &str = "UTF-8";
pub const DEFAULT_SCRIPT_TYPE: &str = "rhai";

/// Ordered string-to-string parameter map supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataStoreParams {
    values: IndexMap<String, String>,
}

impl DataStoreParams {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a parameter, keeping its original position on replace.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Raw value for `key`, blank or not.
    pub fn get_as_string(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Returns the value for `key`, or `default` when it is missing or blank.
    pub fn get_as_string_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        match self.get_as_string(key) {
            Some(v) if !v.trim().is_empty() => v,
            _ => default,
        }
    }

    /// The parameters as a record of string fields, in insertion order.
    pub fn as_record(&self) -> Record {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect()
    }

    /// The parameters that are not recognized by the connector, as a record of string fields.
    pub fn pass_through(&self) -> Record {
        self.values
            .iter()
            .filter(|(k, _)| !RECOGNIZED_PARAMS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect()
    }

    /// Iterate parameters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when no parameter is set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DataStoreParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Encoding name for this run (`fileEncoding`, defaulting to UTF-8).
pub fn file_encoding(params: &DataStoreParams) -> &str {
    params.get_as_string_or(FILE_ENCODING_PARAM, DEFAULT_FILE_ENCODING)
}

/// Script type hint for this run (`script_type`, defaulting to `rhai`).
pub fn script_type(params: &DataStoreParams) -> &str {
    params.get_as_string_or(SCRIPT_TYPE_PARAM, DEFAULT_SCRIPT_TYPE)
}

/// Identity of the data configuration being crawled.
///
/// Attached to every failure record so failures can be traced back to the configuration that
/// produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataConfig {
    pub id: String,
    pub name: String,
}

impl DataConfig {
    /// Create a configuration identity from an id and a display name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}
