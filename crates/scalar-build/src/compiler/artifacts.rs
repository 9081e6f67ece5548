//! Toolchain artifact sets and the name patterns that pick files out of them

use crate::error::{BuildError, BuildResult};
use scalar_config::{CompilerPrefixConfig, ToolchainConfig};
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// Role an archive plays inside a toolchain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactRole {
    /// Runtime library every compiled program links against
    Library,
    /// The compiler itself
    Compiler,
}

impl fmt::Display for ArtifactRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Library => write!(f, "library"),
            Self::Compiler => write!(f, "compiler"),
        }
    }
}

/// A compiler family: archive name prefix and the entry point it implies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerFamily {
    /// File name prefix, e.g. `scala-compiler`
    pub prefix: String,
    /// Fully qualified main class
    pub main_class: String,
}

impl CompilerFamily {
    /// Create a compiler family
    pub fn new(prefix: impl Into<String>, main_class: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            main_class: main_class.into(),
        }
    }
}

impl From<&CompilerPrefixConfig> for CompilerFamily {
    fn from(config: &CompilerPrefixConfig) -> Self {
        Self::new(config.prefix.clone(), config.main_class.clone())
    }
}

/// Scala 2 compiler entry point
pub const SCALA2_MAIN_CLASS: &str = "scala.tools.nsc.Main";

/// Scala 3 (and Dotty) compiler entry point
pub const SCALA3_MAIN_CLASS: &str = "dotty.tools.dotc.Main";

/// Prefixes used to locate the library and compiler archives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPatterns {
    library_prefixes: Vec<String>,
    compiler_families: Vec<CompilerFamily>,
}

impl Default for ArtifactPatterns {
    fn default() -> Self {
        Self {
            library_prefixes: vec![
                "scala-library".to_string(),
                "scala3-library".to_string(),
                "dotty-library".to_string(),
            ],
            compiler_families: vec![
                CompilerFamily::new("scala-compiler", SCALA2_MAIN_CLASS),
                CompilerFamily::new("scala3-compiler", SCALA3_MAIN_CLASS),
                CompilerFamily::new("dotty-compiler", SCALA3_MAIN_CLASS),
            ],
        }
    }
}

impl ArtifactPatterns {
    /// Patterns from explicit lists
    pub fn new(library_prefixes: Vec<String>, compiler_families: Vec<CompilerFamily>) -> Self {
        Self {
            library_prefixes,
            compiler_families,
        }
    }

    /// Defaults, replaced list by list with whatever the configuration sets
    pub fn from_config(config: Option<&ToolchainConfig>) -> Self {
        let mut patterns = Self::default();
        let Some(config) = config else {
            return patterns;
        };

        if let Some(prefixes) = &config.library_prefixes {
            patterns.library_prefixes = prefixes.clone();
        }
        if let Some(families) = &config.compiler_prefixes {
            patterns.compiler_families = families.iter().map(CompilerFamily::from).collect();
        }
        patterns
    }

    /// Library prefixes
    pub fn library_prefixes(&self) -> &[String] {
        &self.library_prefixes
    }

    /// Compiler families in matching order
    pub fn compiler_families(&self) -> &[CompilerFamily] {
        &self.compiler_families
    }

    /// Prefixes of a role joined for messages
    pub fn describe(&self, role: ArtifactRole) -> String {
        match role {
            ArtifactRole::Library => self.library_prefixes.join(", "),
            ArtifactRole::Compiler => self
                .compiler_families
                .iter()
                .map(|f| f.prefix.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Whether `path` names a library archive
    pub fn is_library(&self, path: &Path) -> bool {
        file_name_matches(path, self.library_prefixes.iter().map(String::as_str))
    }
}

/// An ordered set of toolchain archives with a content-independent identity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactSet {
    paths: Vec<PathBuf>,
    id: String,
}

impl ArtifactSet {
    /// Create a set; duplicate paths keep their first position
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut unique: Vec<PathBuf> = Vec::new();
        for path in paths {
            if !unique.contains(&path) {
                unique.push(path);
            }
        }
        let id = set_identity(&unique);
        Self { paths: unique, id }
    }

    /// Archives in their original order
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// SHA-256 over the sorted paths, hex encoded
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the set holds no archive
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// First archive whose file name starts with one of `prefixes`
    pub fn find<'a>(&self, prefixes: impl IntoIterator<Item = &'a str> + Clone) -> Option<&Path> {
        self.paths
            .iter()
            .find(|p| file_name_matches(p, prefixes.clone()))
            .map(PathBuf::as_path)
    }

    /// First archive matching a compiler family, with the family that matched
    ///
    /// Archives are scanned in set order; for each archive the families are
    /// tried in configuration order.
    pub fn find_compiler<'a>(
        &self,
        families: &'a [CompilerFamily],
    ) -> Option<(&Path, &'a CompilerFamily)> {
        self.paths.iter().find_map(|path| {
            families
                .iter()
                .find(|f| file_name_matches(path, [f.prefix.as_str()]))
                .map(|f| (path.as_path(), f))
        })
    }

    /// Platform class path string
    pub fn to_class_path(&self) -> BuildResult<OsString> {
        join_class_path(&self.paths)
    }
}

/// Join paths with the platform separator
pub fn join_class_path(paths: &[PathBuf]) -> BuildResult<OsString> {
    std::env::join_paths(paths).map_err(|e| {
        BuildError::InvalidConfiguration(format!("cannot build a class path: {}", e))
    })
}

/// Version embedded in an archive name, e.g. `2.13.8` in `scala-library-2.13.8.jar`
///
/// The version starts at the first dash-separated segment that begins with a
/// digit, skipping the leading artifact name segment.
pub fn artifact_version(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let segments: Vec<&str> = stem.split('-').collect();
    let start = segments
        .iter()
        .skip(1)
        .position(|s| s.starts_with(|c: char| c.is_ascii_digit()))?
        + 1;
    Some(segments[start..].join("-"))
}

fn file_name_matches<'a>(path: &Path, prefixes: impl IntoIterator<Item = &'a str>) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    prefixes.into_iter().any(|prefix| name.starts_with(prefix))
}

fn set_identity(paths: &[PathBuf]) -> String {
    let mut sorted: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    sorted.sort();

    let mut hasher = Sha256::new();
    for path in &sorted {
        hasher.update(path.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}
