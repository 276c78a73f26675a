//! Error types for the record store

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while materializing records
#[derive(Error, Debug)]
pub enum StoreError {
    /// File system operation failed
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Record could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Target already present; never overwritten
    #[error("Target already exists: {0}")]
    AlreadyExists(PathBuf),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}
