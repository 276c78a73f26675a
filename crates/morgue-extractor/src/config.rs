//! Configuration for the Extractor

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// How the body script is turned into content elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyStrategy {
    /// Evaluate the script with the restricted literal evaluator and walk
    /// `globalContent.content_elements`
    #[default]
    Evaluate,
    /// Scan the script text for `type`/`content` pairs without evaluating it
    PatternScan,
}

/// Configuration for the Extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Body extraction strategy
    pub body_strategy: BodyStrategy,

    /// Time budget for a single script evaluation (milliseconds)
    pub evaluation_timeout_ms: u64,

    /// Maximum literal nesting depth accepted by the evaluator
    pub max_nesting_depth: usize,

    /// `id` attribute of the body script element
    pub body_script_id: String,

    /// Content element kinds whose `content` is collected
    pub content_kinds: Vec<String>,

    /// Fragments dropped from the body when matched exactly
    pub sentinels: Vec<String>,

    /// Prefix stripped from document paths when deriving a fallback identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<PathBuf>,
}

impl ExtractorConfig {
    /// Get the evaluation timeout as a Duration
    pub fn evaluation_timeout(&self) -> Duration {
        Duration::from_millis(self.evaluation_timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.evaluation_timeout_ms == 0 {
            return Err("evaluation_timeout_ms must be greater than 0".to_string());
        }
        if self.max_nesting_depth == 0 {
            return Err("max_nesting_depth must be greater than 0".to_string());
        }
        if self.body_script_id.trim().is_empty() {
            return Err("body_script_id cannot be empty".to_string());
        }
        if self.content_kinds.is_empty() {
            return Err("content_kinds cannot be empty".to_string());
        }
        Ok(())
    }

    /// Pattern-scan preset: never evaluates the body script
    pub fn pattern_scan() -> Self {
        Self {
            body_strategy: BodyStrategy::PatternScan,
            ..Self::default()
        }
    }

    /// Lenient preset: generous evaluation budget for very large pages
    pub fn lenient() -> Self {
        Self {
            evaluation_timeout_ms: 10_000,
            max_nesting_depth: 1024,
            ..Self::default()
        }
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

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            body_strategy: BodyStrategy::Evaluate,
            evaluation_timeout_ms: 2_000,
            max_nesting_depth: 256,
            body_script_id: "fusion-metadata".to_string(),
            content_kinds: vec!["raw_html".to_string(), "text".to_string()],
            sentinels: vec!["在APP內訂閱".to_string(), "<div style=\\".to_string()],
            path_prefix: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ExtractorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.evaluation_timeout(), Duration::from_secs(2));
        assert_eq!(config.body_strategy, BodyStrategy::Evaluate);
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(ExtractorConfig::pattern_scan().validate().is_ok());
        assert!(ExtractorConfig::lenient().validate().is_ok());
        assert_eq!(
            ExtractorConfig::pattern_scan().body_strategy,
            BodyStrategy::PatternScan
        );
    }

    #[test]
    fn test_invalid_timeout() {
        let mut config = ExtractorConfig::default();
        config.evaluation_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_kinds_rejected() {
        let mut config = ExtractorConfig::default();
        config.content_kinds.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = ExtractorConfig::from_toml(
            r#"
            body_strategy = "pattern_scan"
            evaluation_timeout_ms = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.body_strategy, BodyStrategy::PatternScan);
        assert_eq!(config.evaluation_timeout_ms, 500);
        assert_eq!(config.body_script_id, "fusion-metadata");
        assert_eq!(config.sentinels.len(), 2);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ExtractorConfig::lenient();
        let toml_str = config.to_toml().unwrap();
        let parsed = ExtractorConfig::from_toml(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }
}
