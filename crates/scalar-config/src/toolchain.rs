//! Scala toolchain version handling

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scala version assumed when a project does not configure one.
pub const DEFAULT_SCALA_VERSION: &str = "2.12.8";

/// A configured Scala toolchain version, e.g. `2.13.8` or `3.1.0`.
///
/// The string is kept verbatim; validation only happens when a derived value
/// (the major version) is requested.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolchainVersion(String);

impl ToolchainVersion {
    /// Create a version from its string form
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    /// The version exactly as configured
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Determine the major (binary) version, e.g. `2.13` for `2.13.8`.
    ///
    /// Accepts `<major>.<minor>` and `<major>.<minor>.<patch>`; every other
    /// shape is rejected.
    pub fn major(&self) -> ConfigResult<String> {
        let parts: Vec<&str> = self.0.split('.').collect();
        let well_formed = matches!(parts.len(), 2 | 3)
            && parts
                .iter()
                .all(|part| !part.is_empty() && !part.contains(char::is_whitespace));

        if !well_formed {
            return Err(ConfigError::InvalidVersion(format!(
                "Scala version '{}' is not supported. Cannot determine the major version.",
                self.0
            )));
        }

        Ok(format!("{}.{}", parts[0], parts[1]))
    }

    /// Check that a major version can be derived
    pub fn validate(&self) -> ConfigResult<()> {
        self.major().map(|_| ())
    }

    /// Whether this version belongs to the Scala 3 (or pre-release Dotty) line
    pub fn is_scala3(&self) -> bool {
        self.0.starts_with("3.") || self.0.starts_with("0.")
    }

    /// Default SDK display name for IDE integration, e.g. `scala-sdk-2.12.8`
    pub fn default_sdk_name(&self) -> String {
        format!("scala-sdk-{}", self.0)
    }
}

impl Default for ToolchainVersion {
    fn default() -> Self {
        Self::new(DEFAULT_SCALA_VERSION)
    }
}

impl fmt::Display for ToolchainVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ToolchainVersion {
    fn from(version: &str) -> Self {
        Self::new(version)
    }
}

impl From<String> for ToolchainVersion {
    fn from(version: String) -> Self {
        Self(version)
    }
}
