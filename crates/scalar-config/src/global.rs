//! Global Configuration (~/.scalar/config.toml)
//!
//! Handles user-level defaults shared by every project on the machine.

use crate::toolchain::ToolchainVersion;
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global user configuration from ~/.scalar/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Default settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,
}

/// Default settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct DefaultsConfig {
    /// Scala version for projects that do not configure one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scala_version: Option<String>,

    /// JVM launcher for projects that do not configure one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub java: Option<PathBuf>,

    /// Flat artifact directories appended after the project's own
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<PathBuf>,
}

impl GlobalConfig {
    /// Load global configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the global configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(version) = self.default_scala_version() {
            ToolchainVersion::new(version).validate()?;
        }
        Ok(())
    }

    /// Get the global config file path (~/.scalar/config.toml)
    pub fn global_config_path() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".scalar").join("config.toml"))
    }

    /// Get the default Scala version
    pub fn default_scala_version(&self) -> Option<&str> {
        self.defaults
            .as_ref()
            .and_then(|d| d.scala_version.as_deref())
    }

    /// Get the default JVM launcher
    pub fn default_java(&self) -> Option<&Path> {
        self.defaults.as_ref().and_then(|d| d.java.as_deref())
    }

    /// Get the default artifact repositories
    pub fn repositories(&self) -> &[PathBuf] {
        self.defaults
            .as_ref()
            .map(|d| d.repositories.as_slice())
            .unwrap_or(&[])
    }
}
