//! Build orchestration entry point
//!
//! [`Builder`] turns a project's configuration into a source set registry, a
//! validated task graph and a scheduler run, and returns the outcome as a
//! [`BuildReport`].

use crate::cancel::Cancellation;
use crate::compiler::{ArtifactPatterns, ArtifactSet, CompilerInstanceLoader, Launcher};
use crate::error::{BuildError, BuildResult};
use crate::executor::CompileExecutor;
use crate::fingerprint::FingerprintStore;
use crate::ide::IdeMetadata;
use crate::layout::ProjectLayout;
use crate::resolver::{toolchain_coordinates, ArtifactResolver, FlatDirResolver};
use crate::scheduler::{BuildReport, LocalScheduler};
use crate::source_set::{SourceSetRegistry, SourceSetSpec, MAIN_SOURCE_SET, TEST_SOURCE_SET};
use crate::task::ToolchainSpec;
use crate::task_graph::{BuildGraph, TaskGraphBuilder};
use scalar_config::{Config, ConfigLoader};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, span, Level, Span};

/// Main builder for Scala compile tasks of one project
pub struct Builder {
    config: Config,
    layout: ProjectLayout,
    resolver: Option<Box<dyn ArtifactResolver>>,
    jobs: Option<usize>,
    rerun: bool,
    cancellation: Cancellation,
    span: Span,
}

impl Builder {
    /// Create a builder for the project containing `project_path`
    ///
    /// Configuration is discovered by walking up from `project_path`; without
    /// a `scalar.toml` the directory itself is the project root.
    pub fn new(project_path: impl AsRef<Path>) -> BuildResult<Self> {
        let project_path = project_path.as_ref();
        let config = ConfigLoader::new().load_from_directory(project_path)?;
        let root = config
            .project_root()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| project_path.to_path_buf());
        Self::from_config(root, config)
    }

    /// Create a builder from already loaded configuration
    pub fn from_config(root: impl Into<PathBuf>, config: Config) -> BuildResult<Self> {
        let root = root.into();
        config.scala_version().validate()?;

        let layout = ProjectLayout::new(&root).with_build_dir(config.build_dir(&root));
        let span = span!(Level::INFO, "scalar", project = %root.display());

        Ok(Self {
            config,
            layout,
            resolver: None,
            jobs: None,
            rerun: false,
            cancellation: Cancellation::new(),
            span,
        })
    }

    /// Resolve toolchain coordinates with `resolver` instead of the flat
    /// directories listed in the configuration
    pub fn with_resolver(mut self, resolver: impl ArtifactResolver + 'static) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    /// Override the number of parallel jobs
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs);
        self
    }

    /// Run every task even when its fingerprint is unchanged
    pub fn with_rerun(mut self, rerun: bool) -> Self {
        self.rerun = rerun;
        self
    }

    /// Share a cancellation signal with the caller
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Effective configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Directory layout
    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    /// Registry holding `main`, `test` and every configured source set
    ///
    /// Per source set directory overrides from the configuration are applied
    /// through [`SourceSetRegistry::all`], so they also reach sets registered
    /// later by the caller.
    pub fn registry(&self) -> BuildResult<SourceSetRegistry> {
        let span = span!(parent: &self.span, Level::DEBUG, "source_sets");
        let mut registry = SourceSetRegistry::new(self.layout.clone(), span);

        let root = self.layout.project_dir().to_path_buf();
        let overrides = self.config.project.source_sets.clone();
        registry.all(move |set, scala| {
            let Some(settings) = overrides.get(set.name()) else {
                return;
            };
            if let Some(dirs) = &settings.source_dirs {
                scala.set_source_dirs(
                    dirs.iter()
                        .map(|d| scalar_config::loader::resolve_path(&root, d))
                        .collect(),
                );
            }
            if let Some(dir) = &settings.output_dir {
                scala.set_output_dir(scalar_config::loader::resolve_path(&root, dir));
            }
        })?;

        let custom = self
            .config
            .project
            .source_sets
            .keys()
            .filter(|name| name.as_str() != MAIN_SOURCE_SET && name.as_str() != TEST_SOURCE_SET);
        let names = [MAIN_SOURCE_SET, TEST_SOURCE_SET]
            .into_iter()
            .chain(custom.map(String::as_str));

        for name in names {
            let settings = self.config.source_set(name);
            let classpath = settings
                .classpath
                .iter()
                .map(|p| self.layout.resolve(p))
                .collect();
            registry.register(
                SourceSetSpec::new(name)
                    .with_classpath(classpath)
                    .with_dependencies(settings.depends_on),
            )?;
        }

        Ok(registry)
    }

    /// Toolchain version and archives shared by every task
    ///
    /// Explicitly configured archives win; otherwise the toolchain coordinates
    /// of the configured version are resolved.
    pub fn toolchain(&self) -> BuildResult<ToolchainSpec> {
        let version = self.config.scala_version();
        let root = self.layout.project_dir();

        let explicit = self.config.toolchain_artifacts(root);
        let artifacts = if !explicit.is_empty() {
            explicit
        } else {
            let coordinates = toolchain_coordinates(&version);
            match &self.resolver {
                Some(resolver) => resolver.resolve(&coordinates)?,
                None => {
                    let span = span!(parent: &self.span, Level::DEBUG, "resolver");
                    FlatDirResolver::new(self.config.repositories(root), span)
                        .resolve(&coordinates)?
                }
            }
        };

        Ok(ToolchainSpec::new(version, ArtifactSet::new(artifacts)))
    }

    /// Validated task graph
    pub fn graph(&self) -> BuildResult<BuildGraph> {
        self.graph_builder(Arc::new(self.toolchain()?))
            .build(&mut self.registry()?)
    }

    /// Task graph for listing purposes
    ///
    /// Does not require the toolchain to resolve; tasks then carry an empty
    /// artifact set.
    pub fn tasks(&self) -> BuildResult<BuildGraph> {
        let toolchain = self.toolchain().unwrap_or_else(|e| {
            info!(parent: &self.span, "toolchain unresolved: {}", e);
            ToolchainSpec::new(self.config.scala_version(), ArtifactSet::new(Vec::new()))
        });
        self.graph_builder(Arc::new(toolchain))
            .build(&mut self.registry()?)
    }

    /// Compile the requested tasks (all tasks when empty) and their dependencies
    ///
    /// Configuration and graph errors are returned as `Err`; task failures
    /// are part of the returned report.
    pub fn build(&self, requested: &[String]) -> BuildResult<BuildReport> {
        let graph_builder = self.graph_builder(Arc::new(self.toolchain()?));
        let graph = graph_builder.build(&mut self.registry()?)?;

        let toolchain_config = self.config.project.toolchain.as_ref();
        let launcher = Launcher::locate(self.java())
            .with_timeout(toolchain_config.and_then(|t| t.timeout_secs).map(Duration::from_secs));
        let loader = CompilerInstanceLoader::new(
            ArtifactPatterns::from_config(toolchain_config),
            launcher,
            span!(parent: &self.span, Level::INFO, "compiler"),
        )
        .with_strict_versions(toolchain_config.and_then(|t| t.strict_versions).unwrap_or(false));
        let executor = Arc::new(CompileExecutor::new(
            Arc::new(loader),
            span!(parent: &self.span, Level::INFO, "compile"),
        ));

        let mut scheduler = LocalScheduler::new(
            FingerprintStore::new(self.layout.state_dir().join("fingerprints")),
            span!(parent: &self.span, Level::INFO, "scheduler"),
        )
        .with_rerun(self.rerun)
        .with_cancellation(self.cancellation.clone());
        if let Some(jobs) = self.jobs.or_else(|| self.config.jobs()) {
            scheduler = scheduler.with_jobs(jobs);
        }

        graph_builder.register(&graph, &mut scheduler, executor)?;

        scheduler.run(requested)
    }

    /// IDE passthrough: SDK name plus source directories per source set
    pub fn ide_metadata(&self) -> BuildResult<IdeMetadata> {
        Ok(self.registry()?.ide_metadata(self.config.sdk_name()))
    }

    /// Delete Scala output directories and tool state; returns what was removed
    pub fn clean(&self) -> BuildResult<Vec<PathBuf>> {
        let registry = self.registry()?;
        let mut targets: Vec<PathBuf> = registry
            .list()
            .filter_map(|set| registry.scala(set.id()))
            .map(|scala| scala.output_dir().to_path_buf())
            .collect();
        targets.push(self.layout.state_dir());

        let mut removed = Vec::new();
        for target in targets {
            match fs::remove_dir_all(&target) {
                Ok(()) => removed.push(target),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(BuildError::io(target, e)),
            }
        }

        info!(parent: &self.span, removed = removed.len(), "cleaned");
        Ok(removed)
    }

    /// Configured launcher; relative paths with a directory part are taken
    /// from the project root, bare names are looked up on `PATH`
    fn java(&self) -> Option<PathBuf> {
        self.config.java().map(|java| {
            if java.components().count() > 1 {
                self.layout.resolve(&java)
            } else {
                java
            }
        })
    }

    fn graph_builder(&self, toolchain: Arc<ToolchainSpec>) -> TaskGraphBuilder {
        TaskGraphBuilder::new(
            toolchain,
            span!(parent: &self.span, Level::INFO, "task_graph"),
        )
    }
}

impl std::fmt::Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("layout", &self.layout)
            .field("jobs", &self.jobs)
            .field("rerun", &self.rerun)
            .finish_non_exhaustive()
    }
}
