//! Project Configuration (scalar.toml)
//!
//! Handles project-level configuration stored in `scalar.toml` at the project root.

use crate::toolchain::ToolchainVersion;
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Project configuration from scalar.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Package metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<PackageConfig>,

    /// Scala compiler settings (the `scalac { ... }` block of the build DSL)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scalac: Option<ScalacConfig>,

    /// Build layout configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildConfig>,

    /// Toolchain location and artifact matching
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toolchain: Option<ToolchainConfig>,

    /// Per source set settings, keyed by source set name
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub source_sets: BTreeMap<String, SourceSetConfig>,
}

/// Package metadata configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PackageConfig {
    /// Package name
    pub name: String,

    /// Package version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Scala compiler settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ScalacConfig {
    /// Scala version (default: 2.12.8)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scala_version: Option<String>,

    /// SDK display name handed to IDE integrations (default: scala-sdk-<version>)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdk_name: Option<String>,
}

/// Build layout configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Build directory (default: "build")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Maximum number of compile tasks running at once
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
}

/// Toolchain configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ToolchainConfig {
    /// JVM launcher used to run the compiler
    #[serde(skip_serializing_if = "Option::is_none")]
    pub java: Option<PathBuf>,

    /// Pre-resolved toolchain archives; bypasses coordinate resolution when set
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<PathBuf>,

    /// Flat directories searched for toolchain archives
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<PathBuf>,

    /// File name prefixes identifying the runtime library archive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library_prefixes: Option<Vec<String>>,

    /// File name prefixes identifying the compiler archive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler_prefixes: Option<Vec<CompilerPrefixConfig>>,

    /// Reject library/compiler archives whose embedded versions differ
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict_versions: Option<bool>,

    /// Kill a compiler process running longer than this many seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// A compiler archive prefix and the entry point of that compiler family
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CompilerPrefixConfig {
    /// File name prefix, e.g. "scala-compiler"
    pub prefix: String,
    /// Main class launched inside the toolchain process
    pub main_class: String,
}

/// Settings for a single source set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct SourceSetConfig {
    /// Resolved external dependencies on the compile classpath
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub classpath: Vec<PathBuf>,

    /// Replaces the conventional src/<name>/scala directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_dirs: Option<Vec<PathBuf>>,

    /// Replaces the conventional <build>/classes/scala/<name> directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Other source sets whose output this one compiles against
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl ProjectConfig {
    /// Load project configuration from a file
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

    /// Validate the project configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(pkg) = &self.package {
            if pkg.name.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "package.name".to_string(),
                    reason: "name cannot be empty".to_string(),
                });
            }
        }

        if let Some(version) = self.scala_version() {
            ToolchainVersion::new(version).validate()?;
        }

        if let Some(build) = &self.build {
            if build.jobs == Some(0) {
                return Err(ConfigError::InvalidValue {
                    field: "build.jobs".to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
        }

        if let Some(toolchain) = &self.toolchain {
            validate_toolchain(toolchain)?;
        }

        for (name, source_set) in &self.source_sets {
            validate_source_set(name, source_set)?;
        }

        Ok(())
    }

    /// Get the package name, if present
    pub fn package_name(&self) -> Option<&str> {
        self.package.as_ref().map(|p| p.name.as_str())
    }

    /// Get the configured Scala version, if present
    pub fn scala_version(&self) -> Option<&str> {
        self.scalac
            .as_ref()
            .and_then(|s| s.scala_version.as_deref())
    }

    /// Get the configured SDK display name, if present
    pub fn sdk_name(&self) -> Option<&str> {
        self.scalac.as_ref().and_then(|s| s.sdk_name.as_deref())
    }

    /// Get the settings of one source set, if declared
    pub fn source_set(&self, name: &str) -> Option<&SourceSetConfig> {
        self.source_sets.get(name)
    }

    /// Mutable access to the scalac section, creating it when absent
    pub fn scalac_mut(&mut self) -> &mut ScalacConfig {
        self.scalac.get_or_insert_with(Default::default)
    }

    /// Mutable access to the toolchain section, creating it when absent
    pub fn toolchain_mut(&mut self) -> &mut ToolchainConfig {
        self.toolchain.get_or_insert_with(Default::default)
    }

    /// Mutable access to the build section, creating it when absent
    pub fn build_mut(&mut self) -> &mut BuildConfig {
        self.build.get_or_insert_with(Default::default)
    }
}

fn validate_toolchain(toolchain: &ToolchainConfig) -> ConfigResult<()> {
    if let Some(prefixes) = &toolchain.library_prefixes {
        if prefixes.is_empty() || prefixes.iter().any(|p| p.is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "toolchain.library_prefixes".to_string(),
                reason: "must list at least one non-empty prefix".to_string(),
            });
        }
    }

    if let Some(prefixes) = &toolchain.compiler_prefixes {
        if prefixes.is_empty()
            || prefixes
                .iter()
                .any(|p| p.prefix.is_empty() || p.main_class.is_empty())
        {
            return Err(ConfigError::InvalidValue {
                field: "toolchain.compiler_prefixes".to_string(),
                reason: "every entry needs a non-empty prefix and main_class".to_string(),
            });
        }
    }

    if toolchain.timeout_secs == Some(0) {
        return Err(ConfigError::InvalidValue {
            field: "toolchain.timeout_secs".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    Ok(())
}

fn validate_source_set(name: &str, source_set: &SourceSetConfig) -> ConfigResult<()> {
    if !is_valid_source_set_name(name) {
        return Err(ConfigError::InvalidValue {
            field: format!("source_sets.{}", name),
            reason: "names must start with a letter and contain only letters, digits, '-' or '_'"
                .to_string(),
        });
    }

    if source_set.depends_on.iter().any(|dep| dep == name) {
        return Err(ConfigError::InvalidValue {
            field: format!("source_sets.{}.depends_on", name),
            reason: "a source set cannot depend on itself".to_string(),
        });
    }

    Ok(())
}

/// Check whether a source set name can be turned into a task name
pub fn is_valid_source_set_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_minimal_project_config() {
        let toml = r#"
[scalac]
scala_version = "2.13.8"
"#;

        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.scala_version(), Some("2.13.8"));
        assert_eq!(config.sdk_name(), None);
    }

    #[test]
    fn test_parse_full_project_config() {
        let toml = r#"
[package]
name = "my-app"
version = "1.0.0"

[scalac]
scala_version = "3.1.0"
sdk_name = "scala-sdk-3"

[build]
dir = "out"
jobs = 2

[toolchain]
java = "/opt/jdk/bin/java"
repositories = ["lib"]
library_prefixes = ["scala3-library"]
compiler_prefixes = [{ prefix = "scala3-compiler", main_class = "dotty.tools.dotc.Main" }]
strict_versions = true
timeout_secs = 600

[source_sets.main]
classpath = ["lib/scala3-library_3-3.1.0.jar"]

[source_sets.integration]
depends_on = ["main"]
output_dir = "out/it"
"#;

        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.package_name(), Some("my-app"));
        assert_eq!(config.sdk_name(), Some("scala-sdk-3"));
        let toolchain = config.toolchain.as_ref().unwrap();
        assert_eq!(toolchain.strict_versions, Some(true));
        assert_eq!(
            toolchain.compiler_prefixes.as_ref().unwrap()[0].main_class,
            "dotty.tools.dotc.Main"
        );
        assert_eq!(
            config.source_set("integration").unwrap().depends_on,
            vec!["main".to_string()]
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml = r#"
[scalac]
scalaVersion = "2.13.8"
"#;
        assert!(toml::from_str::<ProjectConfig>(toml).is_err());
    }

    #[test]
    fn test_invalid_scala_version() {
        let mut config = ProjectConfig::default();
        config.scalac_mut().scala_version = Some("2".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidVersion(_))
        ));
    }

    #[test]
    fn test_self_dependency_rejected() {
        let mut config = ProjectConfig::default();
        config.source_sets.insert(
            "it".to_string(),
            SourceSetConfig {
                depends_on: vec!["it".to_string()],
                ..Default::default()
            },
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_source_set_names() {
        assert!(is_valid_source_set_name("main"));
        assert!(is_valid_source_set_name("integration-test"));
        assert!(is_valid_source_set_name("it2"));
        assert!(!is_valid_source_set_name(""));
        assert!(!is_valid_source_set_name("2it"));
        assert!(!is_valid_source_set_name("my test"));
    }

    #[test]
    fn test_empty_prefix_list_rejected() {
        let mut config = ProjectConfig::default();
        config.toolchain_mut().library_prefixes = Some(vec![]);
        assert!(config.validate().is_err());
    }
}
