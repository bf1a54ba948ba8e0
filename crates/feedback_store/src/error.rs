use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedbackStoreError {
    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse feedback collection at {path}: {source}")]
    JsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize feedback collection for {path}: {source}")]
    JsonSerialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} has unsupported feedback schema version {found}; expected 1")]
    UnsupportedVersion { path: PathBuf, found: u32 },

    #[error("{path} holds collection '{found}', expected '{expected}'")]
    WrongCollection {
        path: PathBuf,
        found: String,
        expected: &'static str,
    },

    #[error("feedback record {index} has invalid RFC3339 timestamp: {value}")]
    InvalidTimestamp { index: usize, value: String },

    #[error("storage is unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("failed to persist {pending} pending feedback record(s): {source}")]
    PersistFailed {
        pending: usize,
        #[source]
        source: Box<FeedbackStoreError>,
    },

    #[error("malformed feedback table at line {line}: {reason}")]
    MalformedTable { line: usize, reason: String },

    #[error("failed to format current UTC timestamp as RFC3339: {0}")]
    ClockFormat(#[source] time::error::Format),
}

impl FeedbackStoreError {
    #[must_use]
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn persist_failed(pending: usize, source: FeedbackStoreError) -> Self {
        Self::PersistFailed {
            pending,
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedTable {
            line,
            reason: reason.into(),
        }
    }
}
