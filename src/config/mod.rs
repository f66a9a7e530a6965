//! Configuration management for the module manager
//!
//! Handles configuration loading and the enable/disable filter applied to
//! module names before a load pass.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration file errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Module system configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    /// List of enabled modules (empty = all registered modules)
    pub enabled_modules: Vec<String>,

    /// Modules that are never loaded, even if listed in `enabled_modules`
    pub disabled_modules: Vec<String>,

    /// Module-specific configuration, handed to the module through its environment
    pub module_configs: HashMap<String, HashMap<String, String>>,
}

impl ModuleConfig {
    /// Whether a module with this name may be loaded
    pub fn is_enabled(&self, name: &str) -> bool {
        if self.disabled_modules.iter().any(|m| m == name) {
            return false;
        }
        self.enabled_modules.is_empty() || self.enabled_modules.iter().any(|m| m == name)
    }

    /// Configuration values for one module (empty if none configured)
    pub fn config_for(&self, name: &str) -> HashMap<String, String> {
        self.module_configs.get(name).cloned().unwrap_or_default()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log filter (e.g. "info", "bllvm_modules=debug"); RUST_LOG takes precedence
    pub filter: Option<String>,

    /// Emit JSON lines instead of human-readable output
    pub json_format: bool,
}

/// Top-level manager configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Module system configuration
    pub modules: ModuleConfig,

    /// Logging configuration
    pub logging: Option<LoggingConfig>,
}

impl ManagerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: ManagerConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let modules = &self.modules;
        if let Some(name) = modules
            .enabled_modules
            .iter()
            .chain(modules.disabled_modules.iter())
            .find(|name| name.trim().is_empty())
        {
            return Err(ConfigError::Invalid(format!(
                "Module names in enabled/disabled lists cannot be empty (got {:?})",
                name
            )));
        }
        Ok(())
    }
}
