//! Error types for queue persistence.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while reading or writing a state file.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to access state file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("state file {} is not a json object: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A single persisted record that could not be restored.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record {index}: {source}")]
    Malformed {
        index: usize,
        source: serde_json::Error,
    },

    #[error("record {index}: {field} value {value} is out of range")]
    OutOfRange {
        index: usize,
        field: &'static str,
        value: f64,
    },
}
