//! Indexing sink interface.

use crate::config::DataStoreParams;
use crate::error::EmitError;
use crate::types::Record;

/// Receives every successfully merged record, in file-then-line order.
pub trait IndexSink {
    /// Store one record. An error becomes a fault for that line only.
    fn store(&mut self, params: &DataStoreParams, record: &Record) -> Result<(), EmitError>;
}

impl<F> IndexSink for F
where
    F: FnMut(&DataStoreParams, &Record) -> Result<(), EmitError>,
{
    fn store(&mut self, params: &DataStoreParams, record: &Record) -> Result<(), EmitError> {
        self(params, record)
    }
}

/// Collects stored records in memory.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MemorySink {
    pub records: Vec<Record>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }
}

impl IndexSink for MemorySink {
    fn store(&mut self, _params: &DataStoreParams, record: &Record) -> Result<(), EmitError> {
        self.records.push(record.clone());
        Ok(())
    }
}
