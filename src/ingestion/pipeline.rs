//! The per-file ingestion loop.
//!
//! ```text
//! OPENING → READING → (DECODING → MERGING → EMITTING → RECORDING)* → CLOSED
//! ```
//!
//! Any decode, evaluation or emit failure on a line is recorded and the loop moves on to the next
//! line. A file that cannot be opened is logged and skipped. Nothing raised by a single line
//! stops the run, including errors raised on purpose by a collaborator.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::{DataConfig, DataStoreParams};
use crate::error::Fault;
use crate::sink::IndexSink;
use crate::types::{Record, Value};

use super::json::decode_line;
use super::merge::{build_context, overlay_fields, FieldMerger};
use super::observability::{CrawlerStats, FailureRecorder, StatsAction, StatsKey};
use super::reader::LineReader;
use super::selection::CandidateFile;

/// Outcome of processing one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileReport {
    pub path: PathBuf,
    /// `false` when the file could not be opened.
    pub opened: bool,
    pub lines: usize,
    pub stored: usize,
    pub faults: usize,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestionReport {
    pub files: Vec<FileReport>,
}

impl IngestionReport {
    /// Lines read across all files.
    pub fn lines(&self) -> usize {
        self.files.iter().map(|f| f.lines).sum()
    }

    /// Records accepted by the sink.
    pub fn stored(&self) -> usize {
        self.files.iter().map(|f| f.stored).sum()
    }

    /// Lines that ended in a fault.
    pub fn faults(&self) -> usize {
        self.files.iter().map(|f| f.faults).sum()
    }
}

/// Drives decode → merge → emit for every line of every selected file.
pub struct IngestionLoop<'a> {
    data_config: &'a DataConfig,
    params: &'a DataStoreParams,
    merger: FieldMerger<'a>,
    stats: &'a dyn CrawlerStats,
    failures: &'a dyn FailureRecorder,
}

impl<'a> IngestionLoop<'a> {
    /// Create a loop over borrowed configuration and collaborators.
    pub fn new(
        data_config: &'a DataConfig,
        params: &'a DataStoreParams,
        merger: FieldMerger<'a>,
        stats: &'a dyn CrawlerStats,
        failures: &'a dyn FailureRecorder,
    ) -> Self {
        Self {
            data_config,
            params,
            merger,
            stats,
            failures,
        }
    }

    /// Process `files` in order. An empty list touches no collaborator.
    pub fn run(&self, sink: &mut dyn IndexSink, files: &[CandidateFile], encoding: &str) -> IngestionReport {
        if files.is_empty() {
            warn!("No files to process");
            return IngestionReport::default();
        }

        let files = files
            .iter()
            .map(|file| self.process_file(sink, &file.path, encoding))
            .collect();
        IngestionReport { files }
    }

    /// Process one file. An open failure is logged and yields a report with `opened == false`.
    pub fn process_file(&self, sink: &mut dyn IndexSink, path: &Path, encoding: &str) -> FileReport {
        let path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        let mut report = FileReport {
            path: path.clone(),
            ..Default::default()
        };

        info!("Loading {}", path.display());
        let mut reader = match LineReader::open(&path, encoding) {
            Ok(reader) => reader,
            Err(e) => {
                warn!(error = %e, "Source file {} could not be opened.", path.display());
                return report;
            }
        };
        report.opened = true;

        loop {
            let line = match reader.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "IO Error occurred while reading {}.", path.display());
                    break;
                }
            };
            report.lines += 1;

            let mut key = StatsKey::for_line(&path, report.lines);
            let mut data = self.merger.base_record();
            self.stats.begin(&key);
            match self.process_line(sink, &mut key, &line, &mut data) {
                Ok(()) => report.stored += 1,
                Err(fault) => {
                    report.faults += 1;
                    self.handle_fault(&key, &data, &fault);
                }
            }
            self.stats.done(&key);
        }

        info!(
            lines = report.lines,
            stored = report.stored,
            faults = report.faults,
            "Loaded {}",
            path.display()
        );
        report
    }

    fn process_line(
        &self,
        sink: &mut dyn IndexSink,
        key: &mut StatsKey,
        line: &str,
        data: &mut Record,
    ) -> Result<(), Fault> {
        let source = decode_line(line)?;
        let context = build_context(self.params, &source);
        overlay_fields(data, self.params, source);
        self.stats.record(key, StatsAction::Prepared);

        self.merger.apply_scripts(&context, data)?;
        self.stats.record(key, StatsAction::Evaluated);

        if let Some(Value::String(url)) = data.get("url") {
            key.set_url(url.clone());
        }

        sink.store(self.params, data)?;
        self.stats.record(key, StatsAction::Finished);
        Ok(())
    }

    fn handle_fault(&self, key: &StatsKey, data: &Record, fault: &Fault) {
        let state = serde_json::to_string(data).unwrap_or_else(|_| format!("{data:?}"));
        warn!(key = key.id(), error = %fault, "Crawling Access Exception at : {state}");
        self.failures
            .record(self.data_config, fault.classification(), key.id(), fault);
        self.stats.record(key, StatsAction::Exception);
    }
}
