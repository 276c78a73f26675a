//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Run-level scheduler fault
    #[error("Run aborted: {0}")]
    Scheduler(#[from] morgue_scheduler::SchedulerError),

    /// Store setup error
    #[error("Store error: {0}")]
    Store(#[from] morgue_store::StoreError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}
