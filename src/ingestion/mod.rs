//! Ingestion building blocks.
//!
//! Most callers should use [`crate::JsonDataStore`], which wires these together:
//!
//! - [`selection`]: resolve `files` / `directories` into an ordered file list
//! - [`reader`]: open a file with the configured encoding and read lines
//! - [`json`]: decode one line into a [`crate::types::Record`]
//! - [`merge`]: combine decoded fields, parameters, defaults and script results
//! - [`pipeline`]: the per-line decode → merge → emit loop with fault isolation
//! - [`observability`]: stats and failure-recording collaborators

pub mod json;
pub mod merge;
pub mod observability;
pub mod pipeline;
pub mod reader;
pub mod selection;

pub use json::decode_line;
pub use merge::{build_context, overlay_fields, FieldMerger, ScriptMap};
pub use observability::{
    CompositeStats, CountingStats, CrawlerStats, FailureEntry, FailureRecorder, FileFailureRecorder,
    MemoryFailureRecorder, StatsAction, StatsKey, StatsSnapshot, TracingFailureRecorder, TracingStats,
};
pub use pipeline::{FileReport, IngestionLoop, IngestionReport};
pub use reader::{LineReader, TextEncoding};
pub use selection::{is_desired_file, select_files, CandidateFile, FileSuffixes};
