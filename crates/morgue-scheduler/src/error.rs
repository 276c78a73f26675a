//! Error types for scheduler runs
//!
//! Only run-level faults live here. Per-document failures never surface as
//! errors; they become [`Outcome`](morgue_domain::Outcome)s.

use morgue_store::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Faults that abort a whole run
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Destination root could not be created
    #[error("Cannot prepare destination root: {0}")]
    Destination(#[from] StoreError),

    /// Source root missing or unreadable
    #[error("Cannot read source root {path}: {message}")]
    SourceRoot {
        /// Configured source root
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
