//! Scalar Configuration System
//!
//! Provides configuration management for Scalar projects including:
//! - Project configuration (scalar.toml)
//! - Global user configuration (~/.scalar/config.toml)
//! - Scala toolchain version rules
//! - Configuration precedence
//!
//! # Configuration Hierarchy
//!
//! Each setting is taken from the last of these sources that provides it:
//! 1. Global config (~/.scalar/config.toml)
//! 2. Project config (./scalar.toml)
//! 3. Environment variables (SCALAR_*)
//! 4. CLI flags
//!
//! # Example
//!
//! ```no_run
//! use scalar_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! println!("Scala {}", config.scala_version());
//! ```

pub mod global;
pub mod loader;
pub mod project;
pub mod toolchain;

use std::path::PathBuf;
use thiserror::Error;

/// Name of the project configuration file
pub const PROJECT_CONFIG_FILE: &str = "scalar.toml";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("{0}")]
    InvalidVersion(String),

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use global::GlobalConfig;
pub use loader::{Config, ConfigLoader};
pub use project::{
    CompilerPrefixConfig, ProjectConfig, ScalacConfig, SourceSetConfig, ToolchainConfig,
};
pub use toolchain::{ToolchainVersion, DEFAULT_SCALA_VERSION};
