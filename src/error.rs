//! Error types for the strata snapshot engine.

use crate::types::Hash;
use std::path::PathBuf;
use thiserror::Error;

/// Object store, path index and metadata cache failures
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    ObjectNotFound(Hash),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Failed to encode or decode stored record: {0}")]
    Codec(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

/// Malformed serialized snapshot or hash text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("Empty snapshot record")]
    Empty,

    #[error("Invalid hash: {0:?}")]
    InvalidHash(String),

    #[error("Unknown snapshot kind: {0:?}")]
    UnknownKind(String),

    #[error("Invalid file mode: {0:?}")]
    InvalidMode(String),

    #[error("Wrong number of fields on line {line}: {text:?}")]
    FieldCount { line: usize, text: String },

    #[error("Unexpected line {line}: {text:?}")]
    UnexpectedLine { line: usize, text: String },

    #[error("Invalid entry name: {0:?}")]
    InvalidName(String),

    #[error("Snapshot record is not valid UTF-8")]
    NotUtf8,
}

/// Top-level errors surfaced by snapshot, history, merge and export operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Corrupt snapshot: {0}")]
    Format(#[from] FormatError),

    #[error("Unable to resolve {0:?} to a hash or a snapshotted path")]
    Resolution(String),

    #[error("No common ancestor between {ours} and {theirs}")]
    UnrelatedHistories { ours: Hash, theirs: Hash },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Destination already exists: {0}")]
    DestinationExists(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EngineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EngineError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<config::ConfigError> for EngineError {
    fn from(err: config::ConfigError) -> Self {
        EngineError::Config(err.to_string())
    }
}
