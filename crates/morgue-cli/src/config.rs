//! Configuration management for the CLI.

use crate::cli::Cli;
use crate::error::{CliError, Result};
use morgue_domain::ResolverConfig;
use morgue_extractor::ExtractorConfig;
use morgue_scheduler::SchedulerConfig;
use morgue_store::StoreConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// CLI configuration.
///
/// Every section is optional in the file; missing values fall back to the
/// section defaults.
///
/// ```toml
/// [extractor]
/// body_strategy = "pattern_scan"
/// evaluation_timeout_ms = 500
///
/// [resolver]
/// canonical_host = "tw.appledaily.com"
///
/// [store]
/// file_name = "index.json"
///
/// [scheduler]
/// concurrency = 8
///
/// [settings]
/// color = false
/// format = "json"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Content extraction
    pub extractor: ExtractorConfig,

    /// Canonical identity
    pub resolver: ResolverConfig,

    /// Record layout
    pub store: StoreConfig,

    /// Task scheduling
    pub scheduler: SchedulerConfig,

    /// Global settings
    pub settings: Settings,
}

/// Global CLI settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
}

impl Config {
    /// Get the default configuration file path.
    pub fn path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".morgue").join("config.toml"))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. The default path is optional; without it
    /// the defaults apply.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => {
                let path = Self::path()?;
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| CliError::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Apply command-line overrides. Flags win over file values.
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(concurrency) = cli.concurrency {
            self.scheduler.concurrency = Some(concurrency);
        }
        if let Some(timeout_ms) = cli.timeout_ms {
            self.extractor.evaluation_timeout_ms = timeout_ms;
        }
        if let Some(strategy) = cli.strategy {
            self.extractor.body_strategy = strategy.into();
        }
        if let Some(format) = cli.format {
            self.settings.format = format.into();
        }
        if cli.no_color {
            self.settings.color = false;
        }
        if cli.dry_run {
            self.scheduler.dry_run = true;
        }
        if self.extractor.path_prefix.is_none() {
            self.extractor.path_prefix = Some(cli.source.clone());
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        let section = |name: &str, result: std::result::Result<(), String>| {
            result.map_err(|e| CliError::Config(format!("[{}] {}", name, e)))
        };
        section("extractor", self.extractor.validate())?;
        section("store", self.store.validate())?;
        section("scheduler", self.scheduler.validate())?;
        if self.resolver.source_domain.trim().is_empty() {
            return Err(CliError::Config("[resolver] source_domain cannot be empty".into()));
        }
        if self.resolver.canonical_host.trim().is_empty() {
            return Err(CliError::Config("[resolver] canonical_host cannot be empty".into()));
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}
