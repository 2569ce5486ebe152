use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type for run-level operations.
pub type DataStoreResult<T> = Result<T, DataStoreError>;

/// Error type that escapes a run.
///
/// Only file selection can fail a run; every per-line problem is absorbed as a [`Fault`].
#[derive(Debug, Error)]
pub enum DataStoreError {
    /// Required configuration is missing (e.g. neither `files` nor `directories` is set).
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

/// A selected file could not be opened for reading. The file is skipped.
#[derive(Debug, Error)]
pub enum OpenError {
    /// The configured `fileEncoding` is not a supported text encoding.
    #[error("unsupported file encoding '{0}'")]
    UnsupportedEncoding(String),

    /// The file is missing or unreadable.
    #[error("failed to open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A line is not a JSON object.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Malformed JSON.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    /// Well-formed JSON whose top level is not an object.
    #[error("expected a json object, got {found}")]
    NotAnObject { found: &'static str },
}

/// A script expression failed against the merge context.
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// The evaluator does not understand the requested script type.
    #[error("unsupported script type '{0}'")]
    UnsupportedScriptType(String),

    /// The expression failed to compile or raised while running.
    #[error("failed to evaluate '{expression}': {message}")]
    Script { expression: String, message: String },
}

/// The sink rejected a record.
#[derive(Debug, Error)]
pub enum EmitError {
    /// The sink refused the record.
    #[error("sink rejected record: {message}")]
    Rejected { message: String },

    /// The sink failed while writing the record.
    #[error("sink io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EmitError {
    /// Build a [`EmitError::Rejected`] from a message.
    pub fn rejected(message: impl Into<String>) -> Self {
        EmitError::Rejected {
            message: message.into(),
        }
    }
}

/// Classification of a per-line [`Fault`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// The line is not a JSON object.
    Decode,
    /// A script expression failed.
    Evaluation,
    /// The sink did not accept the record.
    Emit,
}

/// Any failure isolated to the processing of one line.
///
/// Decode, evaluation and emit failures share one control-flow path; only the classification
/// handed to the failure recorder differs.
#[derive(Debug, Error)]
pub enum Fault {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Emit(#[from] EmitError),
}

impl Fault {
    /// Which stage of the line's processing failed.
    pub fn kind(&self) -> FaultKind {
        match self {
            Fault::Decode(_) => FaultKind::Decode,
            Fault::Evaluation(_) => FaultKind::Evaluation,
            Fault::Emit(_) => FaultKind::Emit,
        }
    }

    /// Stable classification string recorded alongside the failure.
    pub fn classification(&self) -> &'static str {
        match self.kind() {
            FaultKind::Decode => "json_datastore::DecodeError",
            FaultKind::Evaluation => "json_datastore::EvaluationError",
            FaultKind::Emit => "json_datastore::EmitError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_follows_kind() {
        let decode = Fault::from(DecodeError::NotAnObject { found: "array" });
        let emit = Fault::from(EmitError::rejected("full"));
        assert_eq!(decode.kind(), FaultKind::Decode);
        assert_eq!(decode.classification(), "json_datastore::DecodeError");
        assert_eq!(emit.classification(), "json_datastore::EmitError");
        assert_eq!(emit.to_string(), "sink rejected record: full");
    }
}
