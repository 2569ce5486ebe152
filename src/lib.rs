//! `json-datastore` ingests JSON and JSON-Lines files into an external indexing sink, one record
//! per line, with per-record fault isolation.
//!
//! The primary entrypoint is [`JsonDataStore::store_data`], which:
//!
//! - selects files from the `files` or `directories` parameter ([`ingestion::selection`])
//! - decodes every line as an independent JSON object ([`ingestion::json`])
//! - merges defaults, parameters, decoded fields and script results ([`ingestion::merge`])
//! - hands each record to an [`IndexSink`], recording stats and failures along the way
//!
//! A malformed line, a failing script or a sink rejection affects only that line. The run fails
//! only when neither `files` nor `directories` is configured.
//!
//! ## Parameters
//!
//! | Key | Meaning |
//! |-----|---------|
//! | `files` | comma-separated file paths (wins over `directories`) |
//! | `directories` | comma-separated directories, scanned non-recursively, oldest file first |
//! | `fileEncoding` | text encoding (`UTF-8` by default, `ISO-8859-1`, `US-ASCII`) |
//! | `script_type` | script type hint for the evaluator (`rhai` by default) |
//!
//! All other parameters pass through into the merge context of every record.
//!
//! ## Quick example
//!
//! ```no_run
//! use json_datastore::{DataConfig, DataStoreParams, JsonDataStore, MemorySink, Record, ScriptMap, Value};
//!
//! # fn main() -> Result<(), json_datastore::DataStoreError> {
//! let params = DataStoreParams::new()
//!     .with("files", "/data/articles.jsonl")
//!     .with("site", "docs");
//!
//! let mut scripts = ScriptMap::new();
//! scripts.insert("url".to_string(), r#""https://example.com/" + id"#.to_string());
//! scripts.insert("title".to_string(), "title".to_string());
//!
//! let mut defaults = Record::new();
//! defaults.insert("lang".to_string(), Value::from("en"));
//!
//! let mut sink = MemorySink::new();
//! let report = JsonDataStore::new().store_data(
//!     &DataConfig::new("articles", "Articles"),
//!     &mut sink,
//!     &params,
//!     &scripts,
//!     &defaults,
//! )?;
//! println!("stored={} faults={}", report.stored(), report.faults());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`connector`]: the [`JsonDataStore`] facade
//! - [`ingestion`]: file selection, decoding, merging, the ingestion loop and observability hooks
//! - [`script`]: expression evaluation ([`script::RhaiEvaluator`])
//! - [`sink`]: the [`IndexSink`] interface
//! - [`config`]: recognized parameters and [`DataConfig`]
//! - [`types`]: [`Value`] and [`Record`]
//! - [`error`]: run-level errors and per-line [`Fault`]s

pub mod config;
pub mod connector;
pub mod error;
pub mod ingestion;
pub mod script;
pub mod sink;
pub mod types;

pub use config::{DataConfig, DataStoreParams};
pub use connector::JsonDataStore;
pub use error::{
    DataStoreError, DataStoreResult, DecodeError, EmitError, EvaluationError, Fault, FaultKind, OpenError,
};
pub use ingestion::{IngestionReport, ScriptMap};
pub use sink::{IndexSink, MemorySink};
pub use types::{Record, Value};
