//! Configuration for scheduler runs

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// Configuration for the Scheduler
///
/// # Examples
///
/// ```
/// use morgue_scheduler::SchedulerConfig;
///
/// let config = SchedulerConfig::default();
/// assert!(config.concurrency.is_none());
/// assert!(config.effective_concurrency(3) <= 3);
///
/// let config = SchedulerConfig::sequential();
/// assert_eq!(config.effective_concurrency(100), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum tasks in flight; defaults to available parallelism
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// File extensions treated as source documents (case-insensitive)
    pub extensions: Vec<String>,

    /// Extract, resolve and claim, but write nothing
    pub dry_run: bool,
}

impl SchedulerConfig {
    /// Run one task at a time
    pub fn sequential() -> Self {
        Self {
            concurrency: Some(1),
            ..Self::default()
        }
    }

    /// Concurrency budget for a run of `tasks` tasks
    ///
    /// Never more than the number of tasks, never less than one.
    pub fn effective_concurrency(&self, tasks: usize) -> usize {
        let budget = self.concurrency.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        });
        budget.min(tasks).max(1)
    }

    /// Whether `extension` is one of the configured source extensions
    pub fn accepts_extension(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(extension))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency == Some(0) {
            return Err("concurrency must be greater than 0".to_string());
        }
        if self.extensions.is_empty() {
            return Err("extensions cannot be empty".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: None,
            extensions: vec!["html".to_string()],
            dry_run: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SchedulerConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.dry_run);
        assert!(config.effective_concurrency(1000) >= 1);
    }

    #[test]
    fn test_concurrency_capped_by_tasks() {
        let config = SchedulerConfig {
            concurrency: Some(8),
            ..Default::default()
        };
        assert_eq!(config.effective_concurrency(3), 3);
        assert_eq!(config.effective_concurrency(20), 8);
        assert_eq!(config.effective_concurrency(0), 1);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = SchedulerConfig {
            concurrency: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_extension_matching() {
        let config = SchedulerConfig {
            extensions: vec![".html".to_string(), "htm".to_string()],
            ..Default::default()
        };
        assert!(config.accepts_extension("HTML"));
        assert!(config.accepts_extension("htm"));
        assert!(!config.accepts_extension("json"));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = SchedulerConfig {
            concurrency: Some(4),
            dry_run: true,
            ..Default::default()
        };
        let parsed = SchedulerConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(config, parsed);
        assert_eq!(SchedulerConfig::from_toml("").unwrap(), SchedulerConfig::default());
    }
}
