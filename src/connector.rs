//! Connector entry point.

use std::fmt;
use std::sync::Arc;

use crate::config::{self, DataConfig, DataStoreParams};
use crate::error::DataStoreResult;
use crate::ingestion::merge::{FieldMerger, ScriptMap};
use crate::ingestion::observability::{CrawlerStats, FailureRecorder, TracingFailureRecorder, TracingStats};
use crate::ingestion::pipeline::{IngestionLoop, IngestionReport};
use crate::ingestion::selection::{select_files, FileSuffixes};
use crate::script::{ExpressionEvaluator, RhaiEvaluator};
use crate::sink::IndexSink;
use crate::types::Record;

/// JSON / JSON-Lines file connector.
///
/// Collaborators default to `tracing`-backed stats and failure recording and a Rhai expression
/// evaluator; replace them with the `with_*` methods.
///
/// # Example
///
/// ```no_run
/// use json_datastore::{DataConfig, DataStoreParams, JsonDataStore, MemorySink, Record, ScriptMap};
///
/// # fn main() -> Result<(), json_datastore::DataStoreError> {
/// let store = JsonDataStore::new();
/// let params = DataStoreParams::new().with("directories", "/var/data/feeds");
/// let mut scripts = ScriptMap::new();
/// scripts.insert("title".to_string(), "name + \" - feed\"".to_string());
///
/// let mut sink = MemorySink::new();
/// let report = store.store_data(&DataConfig::new("feeds", "Feeds"), &mut sink, &params, &scripts, &Record::new())?;
/// println!("stored={} faults={}", report.stored(), report.faults());
/// # Ok(())
/// # }
/// ```
pub struct JsonDataStore {
    file_suffixes: FileSuffixes,
    stats: Arc<dyn CrawlerStats>,
    failures: Arc<dyn FailureRecorder>,
    evaluator: Arc<dyn ExpressionEvaluator>,
}

impl JsonDataStore {
    pub const NAME: &'static str = "JsonDataStore";

    /// Create a connector with the default suffixes and collaborators.
    pub fn new() -> Self {
        Self {
            file_suffixes: FileSuffixes::default(),
            stats: Arc::new(TracingStats),
            failures: Arc::new(TracingFailureRecorder),
            evaluator: Arc::new(RhaiEvaluator::new()),
        }
    }

    /// Replace the stats recorder.
    pub fn with_stats(mut self, stats: Arc<dyn CrawlerStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Replace the failure recorder.
    pub fn with_failure_recorder(mut self, failures: Arc<dyn FailureRecorder>) -> Self {
        self.failures = failures;
        self
    }

    /// Replace the expression evaluator used for script mappings.
    pub fn with_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Connector name, always [`JsonDataStore::NAME`].
    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    /// Replace the suffixes a file name must end with to be selected.
    pub fn set_file_suffixes<I, S>(&mut self, suffixes: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.file_suffixes = FileSuffixes::new(suffixes);
    }

    /// Suffixes currently used to select files.
    pub fn file_suffixes(&self) -> &FileSuffixes {
        &self.file_suffixes
    }

    /// Ingest every selected file into `sink`.
    ///
    /// Fails only when file selection fails (both `files` and `directories` blank). Per-file and
    /// per-line problems are logged, recorded and counted in the returned report.
    pub fn store_data(
        &self,
        data_config: &DataConfig,
        sink: &mut dyn IndexSink,
        params: &DataStoreParams,
        scripts: &ScriptMap,
        defaults: &Record,
    ) -> DataStoreResult<IngestionReport> {
        let encoding = config::file_encoding(params);
        let files = select_files(params, &self.file_suffixes)?;

        let merger = FieldMerger::new(self.evaluator.as_ref(), config::script_type(params), scripts, defaults);
        let ingestion = IngestionLoop::new(data_config, params, merger, self.stats.as_ref(), self.failures.as_ref());
        Ok(ingestion.run(sink, &files, encoding))
    }
}

impl Default for JsonDataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for JsonDataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonDataStore")
            .field("file_suffixes", &self.file_suffixes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_fixed() {
        assert_eq!(JsonDataStore::new().name(), "JsonDataStore");
    }

    #[test]
    fn suffixes_can_be_replaced() {
        let mut store = JsonDataStore::new();
        assert_eq!(store.file_suffixes(), &FileSuffixes::default());
        store.set_file_suffixes([".NDJSON"]);
        assert_eq!(store.file_suffixes().as_slice(), &[".ndjson".to_string()]);
    }
}
