//! Directory conventions for source sets and compiled output

use std::path::{Path, PathBuf};

/// Language directory name used below `src/<set>/` and `classes/`
pub const SCALA_LANG: &str = "scala";

/// Host language whose compile step every Scala task follows
pub const HOST_LANG: &str = "java";

/// File extension of Scala sources
pub const SCALA_EXTENSION: &str = "scala";

/// Project directory layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    project_dir: PathBuf,
    build_dir: PathBuf,
}

impl ProjectLayout {
    /// Layout with the build directory at `<project>/build`
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        let project_dir = project_dir.into();
        let build_dir = project_dir.join("build");
        Self {
            project_dir,
            build_dir,
        }
    }

    /// Set build directory
    pub fn with_build_dir(mut self, build_dir: impl Into<PathBuf>) -> Self {
        self.build_dir = build_dir.into();
        self
    }

    /// Project root
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Build root
    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// `src/<set>/scala`
    pub fn source_dir(&self, source_set: &str) -> PathBuf {
        self.project_dir.join("src").join(source_set).join(SCALA_LANG)
    }

    /// `<build>/classes/scala/<set>`
    pub fn output_dir(&self, source_set: &str) -> PathBuf {
        self.classes_dir(SCALA_LANG, source_set)
    }

    /// `<build>/classes/java/<set>`, written by the host's own compile step
    pub fn host_classes_dir(&self, source_set: &str) -> PathBuf {
        self.classes_dir(HOST_LANG, source_set)
    }

    /// Scratch space owned by this tool inside the build directory
    pub fn state_dir(&self) -> PathBuf {
        self.build_dir.join("tmp").join("scalar")
    }

    /// Resolve a configured path against the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        scalar_config::loader::resolve_path(&self.project_dir, path)
    }

    fn classes_dir(&self, lang: &str, source_set: &str) -> PathBuf {
        self.build_dir.join("classes").join(lang).join(source_set)
    }
}
