//! Per-record statistics and failure recording.
//!
//! Two collaborator interfaces are driven by the ingestion loop for every line:
//!
//! - [`CrawlerStats`]: `begin` → `record(PREPARED | EVALUATED | FINISHED | EXCEPTION)` → `done`
//! - [`FailureRecorder`]: called once per per-line fault
//!
//! Implementations here cover logging via `tracing`, in-process counters, fan-out, and simple
//! in-memory / append-to-file failure stores.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::DataConfig;
use crate::error::Fault;

/// Phase of a record's processing reported to [`CrawlerStats::record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatsAction {
    /// Decoded and merge context built.
    Prepared,
    /// Script mapping evaluated.
    Evaluated,
    /// Stored by the sink.
    Finished,
    /// Processing failed.
    Exception,
}

impl fmt::Display for StatsAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatsAction::Prepared => "prepared",
            StatsAction::Evaluated => "evaluated",
            StatsAction::Finished => "finished",
            StatsAction::Exception => "exception",
        };
        f.write_str(s)
    }
}

/// Correlation key for one input line: `<absolute path>@<line>`, plus the record's url once known.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatsKey {
    id: String,
    url: Option<String>,
}

impl StatsKey {
    /// Create a key with the given id and no url.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), url: None }
    }

    /// Key for the 1-based `line` of `path`.
    pub fn for_line(path: &Path, line: usize) -> Self {
        Self::new(format!("{}@{line}", path.display()))
    }

    /// The correlation id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The record's url, once the merged record carried one.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Attach the record's url.
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = Some(url.into());
    }
}

/// Execution statistics hook.
pub trait CrawlerStats: Send + Sync {
    fn begin(&self, _key: &StatsKey) {}

    fn record(&self, _key: &StatsKey, _action: StatsAction) {}

    /// Always called last for a key, whether the line succeeded or not.
    fn done(&self, _key: &StatsKey) {}
}

/// Persists per-record failures for later inspection.
pub trait FailureRecorder: Send + Sync {
    fn record(&self, config: &DataConfig, classification: &str, correlation_id: &str, fault: &Fault);
}

/// Emits stats events as `tracing` debug events.
#[derive(Debug, Default)]
pub struct TracingStats;

impl CrawlerStats for TracingStats {
    fn begin(&self, key: &StatsKey) {
        debug!(key = key.id(), "record begin");
    }

    fn record(&self, key: &StatsKey, action: StatsAction) {
        debug!(key = key.id(), url = key.url(), %action, "record stats");
    }

    fn done(&self, key: &StatsKey) {
        debug!(key = key.id(), "record done");
    }
}

/// Fans out callbacks to a list of stats recorders.
#[derive(Default)]
pub struct CompositeStats {
    recorders: Vec<Arc<dyn CrawlerStats>>,
}

impl CompositeStats {
    /// Create a composite recorder from a list of recorders.
    pub fn new(recorders: Vec<Arc<dyn CrawlerStats>>) -> Self {
        Self { recorders }
    }
}

impl fmt::Debug for CompositeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeStats")
            .field("recorders_len", &self.recorders.len())
            .finish()
    }
}

impl CrawlerStats for CompositeStats {
    fn begin(&self, key: &StatsKey) {
        for r in &self.recorders {
            r.begin(key);
        }
    }

    fn record(&self, key: &StatsKey, action: StatsAction) {
        for r in &self.recorders {
            r.record(key, action);
        }
    }

    fn done(&self, key: &StatsKey) {
        for r in &self.recorders {
            r.done(key);
        }
    }
}

/// Running counters for a connector. Snapshot at any time with [`CountingStats::snapshot`].
#[derive(Debug, Default)]
pub struct CountingStats {
    begun: AtomicU64,
    prepared: AtomicU64,
    evaluated: AtomicU64,
    finished: AtomicU64,
    exceptions: AtomicU64,
    done: AtomicU64,
}

impl CountingStats {
    /// Create a recorder with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every counter at once.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            begun: self.begun.load(Ordering::SeqCst),
            prepared: self.prepared.load(Ordering::SeqCst),
            evaluated: self.evaluated.load(Ordering::SeqCst),
            finished: self.finished.load(Ordering::SeqCst),
            exceptions: self.exceptions.load(Ordering::SeqCst),
            done: self.done.load(Ordering::SeqCst),
        }
    }
}

impl CrawlerStats for CountingStats {
    fn begin(&self, _key: &StatsKey) {
        let _ = self.begun.fetch_add(1, Ordering::SeqCst);
    }

    fn record(&self, _key: &StatsKey, action: StatsAction) {
        let counter = match action {
            StatsAction::Prepared => &self.prepared,
            StatsAction::Evaluated => &self.evaluated,
            StatsAction::Finished => &self.finished,
            StatsAction::Exception => &self.exceptions,
        };
        let _ = counter.fetch_add(1, Ordering::SeqCst);
    }

    fn done(&self, _key: &StatsKey) {
        let _ = self.done.fetch_add(1, Ordering::SeqCst);
    }
}

/// Immutable snapshot of [`CountingStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub begun: u64,
    pub prepared: u64,
    pub evaluated: u64,
    pub finished: u64,
    pub exceptions: u64,
    pub done: u64,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "begun={}, prepared={}, evaluated={}, finished={}, exceptions={}, done={}",
            self.begun, self.prepared, self.evaluated, self.finished, self.exceptions, self.done
        )
    }
}

/// One recorded per-line failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureEntry {
    pub config_id: String,
    pub classification: String,
    pub correlation_id: String,
    pub message: String,
}

impl FailureEntry {
    fn new(config: &DataConfig, classification: &str, correlation_id: &str, fault: &Fault) -> Self {
        Self {
            config_id: config.id.clone(),
            classification: classification.to_string(),
            correlation_id: correlation_id.to_string(),
            message: fault.to_string(),
        }
    }
}

/// Logs failures as `tracing` warnings.
#[derive(Debug, Default)]
pub struct TracingFailureRecorder;

impl FailureRecorder for TracingFailureRecorder {
    fn record(&self, config: &DataConfig, classification: &str, correlation_id: &str, fault: &Fault) {
        warn!(
            config = %config.id,
            classification,
            key = correlation_id,
            error = %fault,
            "record failed"
        );
    }
}

/// Keeps failures in memory.
#[derive(Debug, Default)]
pub struct MemoryFailureRecorder {
    entries: Mutex<Vec<FailureEntry>>,
}

impl MemoryFailureRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every failure recorded so far, oldest first.
    pub fn entries(&self) -> Vec<FailureEntry> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl FailureRecorder for MemoryFailureRecorder {
    fn record(&self, config: &DataConfig, classification: &str, correlation_id: &str, fault: &Fault) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(FailureEntry::new(config, classification, correlation_id, fault));
    }
}

/// Appends failures to a local file, one JSON object per line.
#[derive(Debug)]
pub struct FileFailureRecorder {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileFailureRecorder {
    /// Writes are best-effort; failures to open/write the file are logged and otherwise ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut f| writeln!(f, "{line}"));
        if let Err(e) = written {
            warn!(path = %self.path.display(), error = %e, "failed to append failure record");
        }
    }
}

#[derive(Serialize)]
struct StampedEntry<'a> {
    ts: u64,
    #[serde(flatten)]
    entry: &'a FailureEntry,
}

impl FailureRecorder for FileFailureRecorder {
    fn record(&self, config: &DataConfig, classification: &str, correlation_id: &str, fault: &Fault) {
        let entry = FailureEntry::new(config, classification, correlation_id, fault);
        let stamped = StampedEntry { ts: unix_ts(), entry: &entry };
        match serde_json::to_string(&stamped) {
            Ok(line) => self.append_line(&line),
            Err(e) => warn!(error = %e, "failed to serialize failure record"),
        }
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
