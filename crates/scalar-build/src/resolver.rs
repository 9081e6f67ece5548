//! Toolchain coordinates and the resolver seam
//!
//! Resolution proper belongs to the host. [`FlatDirResolver`] is the minimal
//! stand-in: it looks archives up by name in a list of directories and never
//! resolves transitive dependencies.

use crate::error::{BuildError, BuildResult};
use scalar_config::ToolchainVersion;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, Span};

/// Group of every Scala toolchain artifact
pub const SCALA_GROUP: &str = "org.scala-lang";

/// Maven-style artifact coordinates
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coordinate {
    /// Group id
    pub group: String,
    /// Artifact id
    pub artifact: String,
    /// Version
    pub version: String,
}

impl Coordinate {
    /// Create coordinates
    pub fn new(
        group: impl Into<String>,
        artifact: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            artifact: artifact.into(),
            version: version.into(),
        }
    }

    /// Conventional archive name, `<artifact>-<version>.jar`
    pub fn file_name(&self) -> String {
        format!("{}-{}.jar", self.artifact, self.version)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.version)
    }
}

/// Coordinates of the archives making up a toolchain
pub fn toolchain_coordinates(version: &ToolchainVersion) -> Vec<Coordinate> {
    let v = version.as_str();
    if version.is_scala3() {
        vec![
            Coordinate::new(SCALA_GROUP, "scala3-compiler_3", v),
            Coordinate::new(SCALA_GROUP, "scala3-library_3", v),
        ]
    } else {
        vec![
            Coordinate::new(SCALA_GROUP, "scala-compiler", v),
            Coordinate::new(SCALA_GROUP, "scala-library", v),
            Coordinate::new(SCALA_GROUP, "scala-reflect", v),
        ]
    }
}

/// Turns coordinates into resolved files
pub trait ArtifactResolver: Send + Sync {
    /// Resolve every coordinate, in order, or fail
    fn resolve(&self, coordinates: &[Coordinate]) -> BuildResult<Vec<PathBuf>>;
}

/// Resolver over flat directories of archives
#[derive(Debug, Clone)]
pub struct FlatDirResolver {
    dirs: Vec<PathBuf>,
    span: Span,
}

impl FlatDirResolver {
    /// Resolver searching `dirs` in order
    pub fn new(dirs: Vec<PathBuf>, span: Span) -> Self {
        Self { dirs, span }
    }

    /// Directories searched
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    fn find(&self, coordinate: &Coordinate) -> Option<PathBuf> {
        let name = coordinate.file_name();
        self.dirs
            .iter()
            .map(|dir| dir.join(&name))
            .find(|candidate| candidate.is_file())
    }
}

impl ArtifactResolver for FlatDirResolver {
    fn resolve(&self, coordinates: &[Coordinate]) -> BuildResult<Vec<PathBuf>> {
        let mut resolved = Vec::with_capacity(coordinates.len());

        for coordinate in coordinates {
            match self.find(coordinate) {
                Some(path) => {
                    debug!(parent: &self.span, coordinate = %coordinate, path = %path.display(), "resolved");
                    resolved.push(path);
                }
                None => {
                    return Err(BuildError::ArtifactResolution {
                        coordinates: coordinate.to_string(),
                        message: format!(
                            "{} not found in [{}]. The configured Scala version is {}; set \
                             [scalac] scala_version and list a directory containing its archives \
                             under [toolchain] repositories.",
                            coordinate.file_name(),
                            display_dirs(&self.dirs),
                            coordinate.version
                        ),
                    });
                }
            }
        }

        Ok(resolved)
    }
}

fn display_dirs(dirs: &[PathBuf]) -> String {
    dirs.iter()
        .map(|d| d.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
