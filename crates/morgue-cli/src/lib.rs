//! Morgue CLI - command-line front end for the archive extraction pipeline.
//!
//! ```text
//! morgue <SOURCE> <DEST> [--concurrency N] [--strategy evaluate|pattern-scan] [--dry-run]
//! ```
//!
//! Settings are read from `~/.morgue/config.toml` (or `--config`) and
//! overridden by flags.

#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod run;

pub use cli::Cli;
pub use config::Config;
pub use error::{CliError, Result};
pub use output::Formatter;
pub use run::execute_run;
