//! CLI argument definitions and parsing.

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Morgue - extract and deduplicate articles from an archived HTML tree.
#[derive(Debug, Parser)]
#[command(name = "morgue")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory of archived pages
    #[arg(env = "MORGUE_SOURCE")]
    pub source: PathBuf,

    /// Destination root for extracted records (created if absent)
    #[arg(env = "MORGUE_DEST")]
    pub dest: PathBuf,

    /// Maximum documents processed at once
    #[arg(short = 'j', long, env = "MORGUE_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Time budget for one body script evaluation, in milliseconds
    #[arg(long, env = "MORGUE_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Body extraction strategy
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, env = "MORGUE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Extract and deduplicate without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Default log filter for the verbosity level
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
}

/// Body strategy options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum StrategyArg {
    /// Evaluate the page state script
    Evaluate,
    /// Scan the page state script without evaluating it
    PatternScan,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
        }
    }
}

impl From<StrategyArg> for morgue_extractor::BodyStrategy {
    fn from(strategy: StrategyArg) -> Self {
        match strategy {
            StrategyArg::Evaluate => morgue_extractor::BodyStrategy::Evaluate,
            StrategyArg::PatternScan => morgue_extractor::BodyStrategy::PatternScan,
        }
    }
}
