//! Configuration Loader
//!
//! Finds scalar.toml, reads the global defaults and applies environment overrides.

use crate::global::GlobalConfig;
use crate::project::{ProjectConfig, SourceSetConfig};
use crate::toolchain::ToolchainVersion;
use crate::{ConfigError, ConfigResult, PROJECT_CONFIG_FILE};
use std::env;
use std::path::{Path, PathBuf};

/// Default build directory, relative to the project root
pub const DEFAULT_BUILD_DIR: &str = "build";

/// Configuration loader
///
/// Reads configuration from several sources. The `Config` getters resolve
/// each setting by precedence:
/// 1. Global config (~/.scalar/config.toml) - lowest priority
/// 2. Project config (./scalar.toml) - overrides global
/// 3. Environment variables (SCALAR_*) - overrides project
/// 4. CLI flags - highest priority (handled by caller)
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
}

/// Merged configuration result
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Global configuration
    pub global: GlobalConfig,

    /// Project root directory (where scalar.toml was found)
    pub project_root: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Use a specific global config file instead of ~/.scalar/config.toml
    pub fn with_global_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_config_path = Some(path.into());
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find scalar.toml, then loads the global
    /// config if it exists. A global file that fails to parse or validate is
    /// an error, not an empty config.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project_config) = self.find_project_config(start_dir)?;

        let global_config = self.load_global_config()?;

        let project_config = self.apply_env_overrides(project_config)?;

        Ok(Config {
            project: project_config,
            global: global_config,
            project_root,
        })
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<Config> {
        let project_config = ProjectConfig::load_from_file(config_path)?;
        let global_config = self.load_global_config()?;
        let project_config = self.apply_env_overrides(project_config)?;

        let project_root = config_path.parent().map(|p| p.to_path_buf());

        Ok(Config {
            project: project_config,
            global: global_config,
            project_root,
        })
    }

    /// Find project configuration by walking up directory tree
    fn find_project_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, ProjectConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(PROJECT_CONFIG_FILE);

            if config_path.exists() {
                let project_config = ProjectConfig::load_from_file(&config_path)?;
                return Ok((Some(current), project_config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, ProjectConfig::default())),
            }
        }
    }

    /// Load global configuration from ~/.scalar/config.toml
    ///
    /// No home directory or no file means no global defaults.
    fn load_global_config(&mut self) -> ConfigResult<GlobalConfig> {
        let path = match &self.global_config_path {
            Some(path) => path.clone(),
            None => match GlobalConfig::global_config_path() {
                Ok(path) => {
                    self.global_config_path = Some(path.clone());
                    path
                }
                Err(ConfigError::HomeNotFound) => return Ok(GlobalConfig::default()),
                Err(e) => return Err(e),
            },
        };

        if !path.exists() {
            return Ok(GlobalConfig::default());
        }

        GlobalConfig::load_from_file(&path)
    }

    /// Apply environment variable overrides to project config
    ///
    /// Recognized variables: SCALAR_SCALA_VERSION, SCALAR_JAVA, SCALAR_BUILD_DIR
    fn apply_env_overrides(&self, mut config: ProjectConfig) -> ConfigResult<ProjectConfig> {
        if let Ok(version) = env::var("SCALAR_SCALA_VERSION") {
            ToolchainVersion::new(version.as_str()).validate()?;
            config.scalac_mut().scala_version = Some(version);
        }

        if let Ok(java) = env::var("SCALAR_JAVA") {
            if java.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "SCALAR_JAVA".to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
            config.toolchain_mut().java = Some(PathBuf::from(java));
        }

        if let Ok(dir) = env::var("SCALAR_BUILD_DIR") {
            config.build_mut().dir = Some(PathBuf::from(dir));
        }

        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Configuration for a project rooted at `root` with no global defaults
    pub fn for_project(root: impl Into<PathBuf>, project: ProjectConfig) -> Self {
        Self {
            project,
            global: GlobalConfig::default(),
            project_root: Some(root.into()),
        }
    }

    /// Get the effective Scala version (project > global > default)
    pub fn scala_version(&self) -> ToolchainVersion {
        self.project
            .scala_version()
            .or_else(|| self.global.default_scala_version())
            .map(ToolchainVersion::from)
            .unwrap_or_default()
    }

    /// Get the SDK display name handed to IDE integrations
    pub fn sdk_name(&self) -> String {
        self.project
            .sdk_name()
            .map(str::to_string)
            .unwrap_or_else(|| self.scala_version().default_sdk_name())
    }

    /// Get the project root directory
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Get the package name
    pub fn package_name(&self) -> Option<&str> {
        self.project.package_name()
    }

    /// Check if this is a project (has scalar.toml)
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }

    /// Get the build directory, relative paths resolved against `root`
    pub fn build_dir(&self, root: &Path) -> PathBuf {
        let dir = self
            .project
            .build
            .as_ref()
            .and_then(|b| b.dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BUILD_DIR));
        resolve_path(root, &dir)
    }

    /// Get the configured number of parallel jobs
    pub fn jobs(&self) -> Option<usize> {
        self.project.build.as_ref().and_then(|b| b.jobs)
    }

    /// Get the JVM launcher (project > global)
    pub fn java(&self) -> Option<PathBuf> {
        self.project
            .toolchain
            .as_ref()
            .and_then(|t| t.java.clone())
            .or_else(|| self.global.default_java().map(Path::to_path_buf))
    }

    /// Get the artifact repositories (project first, then global), resolved against `root`
    pub fn repositories(&self, root: &Path) -> Vec<PathBuf> {
        let project = self
            .project
            .toolchain
            .as_ref()
            .map(|t| t.repositories.as_slice())
            .unwrap_or(&[]);

        project
            .iter()
            .chain(self.global.repositories())
            .map(|p| resolve_path(root, p))
            .collect()
    }

    /// Get explicitly configured toolchain artifacts, resolved against `root`
    pub fn toolchain_artifacts(&self, root: &Path) -> Vec<PathBuf> {
        self.project
            .toolchain
            .as_ref()
            .map(|t| t.artifacts.iter().map(|p| resolve_path(root, p)).collect())
            .unwrap_or_default()
    }

    /// Get the settings of one source set, or empty settings
    pub fn source_set(&self, name: &str) -> SourceSetConfig {
        self.project.source_set(name).cloned().unwrap_or_default()
    }
}

/// Resolve `path` against `root` unless it is already absolute
pub fn resolve_path(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
