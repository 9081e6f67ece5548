//! Scalar build infrastructure
//!
//! Adds Scala compilation to a generic build graph:
//! - Source sets with conventional Scala source and output directories
//! - One compile task per source set, named after the host's compile step
//! - Inter-task dependencies and transitive compile classpaths
//! - Toolchain resolution and a cached compiler instance per version
//! - A local scheduler with parallel groups and fingerprint-based up-to-date checks
//! - IDE metadata passthrough

pub mod build_order;
pub mod builder;
pub mod cancel;
pub mod classpath;
pub mod compiler;
pub mod error;
pub mod executor;
pub mod fingerprint;
pub mod ide;
pub mod layout;
pub mod resolver;
pub mod scheduler;
pub mod source_set;
pub mod task;
pub mod task_graph;

// Re-export main types
pub use build_order::{DependencyGraph, TaskNode};
pub use builder::Builder;
pub use cancel::Cancellation;
pub use classpath::{Classpath, ClasspathResolver};
pub use compiler::{
    ArtifactPatterns, ArtifactRole, ArtifactSet, CompileOutput, CompileRequest, CompilerFamily,
    CompilerInstance, CompilerInstanceLoader, Launcher,
};
pub use error::{BuildError, BuildResult, ErrorKind};
pub use executor::CompileExecutor;
pub use fingerprint::{compute_hash, Fingerprint, FingerprintStore};
pub use ide::{IdeMetadata, IdeSourceSet};
pub use layout::ProjectLayout;
pub use resolver::{toolchain_coordinates, ArtifactResolver, Coordinate, FlatDirResolver};
pub use scheduler::{
    BuildReport, BuildStats, LocalScheduler, TaskAction, TaskFailure, TaskRegistration,
    TaskResult, TaskScheduler,
};
pub use source_set::{
    compile_task_name, scala_task_name, ScalaSourceDirectorySet, SourceSet, SourceSetId,
    SourceSetKind, SourceSetRegistry, SourceSetSpec, MAIN_SOURCE_SET, TEST_SOURCE_SET,
};
pub use task::{CompileTask, TaskOutcome, ToolchainSpec};
pub use task_graph::{BuildGraph, TaskGraphBuilder};

// Re-export configuration types for convenience
pub use scalar_config::{Config, ToolchainVersion};
