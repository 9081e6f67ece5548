//! Source sets and the registry that declares them
//!
//! A [`SourceSet`] is the host's generic description of a named collection of
//! sources. Everything Scala-specific about it lives in a side table inside the
//! [`SourceSetRegistry`], keyed by [`SourceSetId`], so the generic entity never
//! grows language-specific fields.

use crate::error::{BuildError, BuildResult};
use crate::layout::{ProjectLayout, HOST_LANG, SCALA_EXTENSION, SCALA_LANG};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, Span};
use walkdir::WalkDir;

/// Canonical name of the production source set
pub const MAIN_SOURCE_SET: &str = "main";

/// Canonical name of the test source set
pub const TEST_SOURCE_SET: &str = "test";

/// Stable identity of a registered source set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceSetId(usize);

impl SourceSetId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Registration index
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Kind of source set, derived from its name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceSetKind {
    /// Production code
    Main,
    /// Tests of the production code
    Test,
    /// Any other source set
    Custom,
}

impl SourceSetKind {
    /// Classify a source set by name
    pub fn classify(name: &str) -> Self {
        match name {
            MAIN_SOURCE_SET => Self::Main,
            TEST_SOURCE_SET => Self::Test,
            _ => Self::Custom,
        }
    }

    /// Whether IDEs should treat the sources as test code
    pub fn is_test(&self) -> bool {
        matches!(self, Self::Test)
    }
}

impl fmt::Display for SourceSetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => write!(f, "main"),
            Self::Test => write!(f, "test"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

/// Host-supplied description of a source set to register
#[derive(Debug, Clone, Default)]
pub struct SourceSetSpec {
    /// Source set name
    pub name: String,
    /// Resolved external dependencies (archives or class directories)
    pub external_classpath: Vec<PathBuf>,
    /// Extra source sets this one compiles against
    pub dependencies: Vec<String>,
}

impl SourceSetSpec {
    /// Create a spec for the named source set
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set resolved external dependencies
    pub fn with_classpath(mut self, classpath: Vec<PathBuf>) -> Self {
        self.external_classpath = classpath;
        self
    }

    /// Declare dependencies on other source sets
    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

/// A registered source set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSet {
    id: SourceSetId,
    name: String,
    kind: SourceSetKind,
    host_classes_dir: PathBuf,
    external_classpath: Vec<PathBuf>,
    dependencies: Vec<String>,
}

impl SourceSet {
    /// Identity
    pub fn id(&self) -> SourceSetId {
        self.id
    }

    /// Name, unique within the project
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind derived from the name
    pub fn kind(&self) -> SourceSetKind {
        self.kind
    }

    /// Output directory of the host-language compile step
    pub fn host_classes_dir(&self) -> &Path {
        &self.host_classes_dir
    }

    /// Resolved external dependencies
    pub fn external_classpath(&self) -> &[PathBuf] {
        &self.external_classpath
    }

    /// Source sets this one was declared to depend on
    pub fn declared_dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// External dependencies followed by the host-language classes directory
    pub fn own_compile_classpath(&self) -> Vec<PathBuf> {
        let mut classpath = self.external_classpath.clone();
        classpath.push(self.host_classes_dir.clone());
        classpath
    }

    /// Compile task name for a language, e.g. `compileScala`, `compileTestJava`
    ///
    /// The main source set contributes no name of its own.
    pub fn compile_task_name(&self, lang: &str) -> String {
        compile_task_name(&self.name, lang)
    }

    /// Name of the Scala compile task of this source set
    pub fn scala_task_name(&self) -> String {
        self.compile_task_name(SCALA_LANG)
    }

    /// Name of the host-language compile task of this source set
    pub fn host_task_name(&self) -> String {
        self.compile_task_name(HOST_LANG)
    }
}

/// Scala sources of one source set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalaSourceDirectorySet {
    display_name: String,
    source_dirs: Vec<PathBuf>,
    output_dir: PathBuf,
}

impl ScalaSourceDirectorySet {
    fn new(source_set: &str, layout: &ProjectLayout) -> Self {
        Self {
            display_name: format!("{} Scala source", source_set),
            source_dirs: vec![layout.source_dir(source_set)],
            output_dir: layout.output_dir(source_set),
        }
    }

    /// Human readable name, e.g. "main Scala source"
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Source directories
    pub fn source_dirs(&self) -> &[PathBuf] {
        &self.source_dirs
    }

    /// Output directory of the Scala compile task
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Add a source directory
    pub fn src_dir(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        if !self.source_dirs.contains(&dir) {
            self.source_dirs.push(dir);
        }
    }

    /// Replace all source directories
    pub fn set_source_dirs(&mut self, dirs: Vec<PathBuf>) {
        self.source_dirs.clear();
        for dir in dirs {
            self.src_dir(dir);
        }
    }

    /// Override the output directory
    pub fn set_output_dir(&mut self, dir: impl Into<PathBuf>) {
        self.output_dir = dir.into();
    }

    /// All `.scala` files below the source directories, sorted
    ///
    /// Directories that do not exist contribute nothing.
    pub fn source_files(&self) -> BuildResult<Vec<PathBuf>> {
        let mut files = Vec::new();

        for dir in self.source_dirs.iter().filter(|d| d.exists()) {
            for entry in WalkDir::new(dir).follow_links(false) {
                let entry = entry.map_err(|e| {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.clone());
                    BuildError::io(path, e.into())
                })?;
                let path = entry.path();
                if entry.file_type().is_file()
                    && path.extension().and_then(|s| s.to_str()) == Some(SCALA_EXTENSION)
                {
                    files.push(path.to_path_buf());
                }
            }
        }

        files.sort();
        files.dedup();
        Ok(files)
    }
}

type RegistrationCallback = Box<dyn FnMut(&SourceSet, &mut ScalaSourceDirectorySet)>;

/// Append-only container of source sets
///
/// Source sets may be registered until [`finalize`](Self::finalize) is called;
/// callbacks installed with [`all`](Self::all) see every set, including sets
/// registered after the callback.
pub struct SourceSetRegistry {
    layout: ProjectLayout,
    source_sets: Vec<SourceSet>,
    scala: HashMap<SourceSetId, ScalaSourceDirectorySet>,
    callbacks: Vec<RegistrationCallback>,
    finalized: bool,
    span: Span,
}

impl SourceSetRegistry {
    /// Create an empty registry
    pub fn new(layout: ProjectLayout, span: Span) -> Self {
        Self {
            layout,
            source_sets: Vec::new(),
            scala: HashMap::new(),
            callbacks: Vec::new(),
            finalized: false,
            span,
        }
    }

    /// Registry pre-populated with the conventional `main` and `test` sets
    pub fn with_conventional_sets(layout: ProjectLayout, span: Span) -> BuildResult<Self> {
        let mut registry = Self::new(layout, span);
        registry.register(SourceSetSpec::new(MAIN_SOURCE_SET))?;
        registry.register(SourceSetSpec::new(TEST_SOURCE_SET))?;
        Ok(registry)
    }

    /// Project layout the conventions are derived from
    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    /// Classify a source set name
    pub fn classify(name: &str) -> SourceSetKind {
        SourceSetKind::classify(name)
    }

    /// Register a source set, applying directory conventions
    pub fn register(&mut self, spec: SourceSetSpec) -> BuildResult<SourceSetId> {
        if self.finalized {
            return Err(BuildError::LateRegistration { name: spec.name });
        }
        if spec.name.is_empty() {
            return Err(BuildError::InvalidConfiguration(
                "source set name cannot be empty".to_string(),
            ));
        }
        if self.find(&spec.name).is_some() {
            return Err(BuildError::DuplicateSourceSet { name: spec.name });
        }

        let id = SourceSetId::new(self.source_sets.len());
        let source_set = SourceSet {
            id,
            kind: SourceSetKind::classify(&spec.name),
            host_classes_dir: self.layout.host_classes_dir(&spec.name),
            external_classpath: spec.external_classpath,
            dependencies: spec.dependencies,
            name: spec.name,
        };
        let mut scala = ScalaSourceDirectorySet::new(&source_set.name, &self.layout);

        for callback in &mut self.callbacks {
            callback(&source_set, &mut scala);
        }

        debug!(
            parent: &self.span,
            source_set = %source_set.name,
            kind = %source_set.kind,
            "registered source set"
        );

        self.scala.insert(id, scala);
        self.source_sets.push(source_set);
        Ok(id)
    }

    /// Run `callback` for every source set, now and for sets registered later
    pub fn all<F>(&mut self, mut callback: F) -> BuildResult<()>
    where
        F: FnMut(&SourceSet, &mut ScalaSourceDirectorySet) + 'static,
    {
        self.ensure_open("configure source sets")?;

        for source_set in &self.source_sets {
            if let Some(scala) = self.scala.get_mut(&source_set.id) {
                callback(source_set, scala);
            }
        }
        self.callbacks.push(Box::new(callback));
        Ok(())
    }

    /// Stop accepting registrations and configuration changes
    pub fn finalize(&mut self) {
        if !self.finalized {
            debug!(parent: &self.span, count = self.source_sets.len(), "source sets finalized");
        }
        self.finalized = true;
        self.callbacks.clear();
    }

    /// Whether the registry was finalized
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// All source sets in registration order
    pub fn list(&self) -> impl Iterator<Item = &SourceSet> {
        self.source_sets.iter()
    }

    /// Number of registered source sets
    pub fn len(&self) -> usize {
        self.source_sets.len()
    }

    /// Whether no source set is registered
    pub fn is_empty(&self) -> bool {
        self.source_sets.is_empty()
    }

    /// Look up a source set by identity
    pub fn get(&self, id: SourceSetId) -> Option<&SourceSet> {
        self.source_sets.get(id.0)
    }

    /// Look up a source set by name
    pub fn find(&self, name: &str) -> Option<&SourceSet> {
        self.source_sets.iter().find(|s| s.name == name)
    }

    /// The first `Main`-kind source set, if any
    pub fn main(&self) -> Option<&SourceSet> {
        self.source_sets
            .iter()
            .find(|s| s.kind == SourceSetKind::Main)
    }

    /// Scala metadata of a source set
    pub fn scala(&self, id: SourceSetId) -> Option<&ScalaSourceDirectorySet> {
        self.scala.get(&id)
    }

    /// Mutable Scala metadata; fails once the registry is finalized
    pub fn scala_mut(&mut self, id: SourceSetId) -> BuildResult<&mut ScalaSourceDirectorySet> {
        self.ensure_open("change source directories")?;
        self.scala.get_mut(&id).ok_or_else(|| {
            BuildError::InvalidConfiguration(format!("unknown source set id {:?}", id))
        })
    }

    /// Replace the source directories of a source set
    pub fn set_source_dirs(&mut self, id: SourceSetId, dirs: Vec<PathBuf>) -> BuildResult<()> {
        self.scala_mut(id)?.set_source_dirs(dirs);
        Ok(())
    }

    /// Add a source directory to a source set
    pub fn add_source_dir(&mut self, id: SourceSetId, dir: impl Into<PathBuf>) -> BuildResult<()> {
        self.scala_mut(id)?.src_dir(dir);
        Ok(())
    }

    /// Override the output directory of a source set
    pub fn set_output_dir(&mut self, id: SourceSetId, dir: impl Into<PathBuf>) -> BuildResult<()> {
        self.scala_mut(id)?.set_output_dir(dir);
        Ok(())
    }

    fn ensure_open(&self, action: &str) -> BuildResult<()> {
        if self.finalized {
            return Err(BuildError::InvalidConfiguration(format!(
                "cannot {} after the source set container was finalized",
                action
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for SourceSetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceSetRegistry")
            .field("layout", &self.layout)
            .field("source_sets", &self.source_sets)
            .field("scala", &self.scala)
            .field("finalized", &self.finalized)
            .finish()
    }
}

/// Compile task name of a language for a source set name
pub fn compile_task_name(source_set: &str, lang: &str) -> String {
    let set = match SourceSetKind::classify(source_set) {
        SourceSetKind::Main => String::new(),
        _ => capitalize(source_set),
    };
    format!("compile{}{}", set, capitalize(lang))
}

/// Name of the Scala compile task of a source set name
pub fn scala_task_name(source_set: &str) -> String {
    compile_task_name(source_set, SCALA_LANG)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
