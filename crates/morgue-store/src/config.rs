//! Configuration for the record store

use serde::{Deserialize, Serialize};

/// Configuration for the record store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// File name written inside each `<category>/<date>/<hash>/` directory
    pub file_name: String,
}

impl StoreConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        let name = self.file_name.trim();
        if name.is_empty() {
            return Err("file_name cannot be empty".to_string());
        }
        if name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(format!("file_name must be a plain file name, got '{}'", name));
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

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            file_name: "index.json".to_string(),
        }
    }
}
