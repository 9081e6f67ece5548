//! Compile tasks and their outcomes

use crate::classpath::Classpath;
use crate::compiler::ArtifactSet;
use crate::source_set::{SourceSetId, SourceSetKind};
use scalar_config::ToolchainVersion;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Toolchain shared by every task of a build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainSpec {
    /// Scala version
    pub version: ToolchainVersion,
    /// Archives the compiler is loaded from
    pub artifacts: ArtifactSet,
}

impl ToolchainSpec {
    /// Create a toolchain spec
    pub fn new(version: ToolchainVersion, artifacts: ArtifactSet) -> Self {
        Self { version, artifacts }
    }

    /// Properties that invalidate compiled output when they change
    pub fn input_properties(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("scala.version".to_string(), self.version.to_string()),
            ("scala.artifacts".to_string(), self.artifacts.id().to_string()),
        ])
    }
}

/// Compilation of one source set
#[derive(Debug, Clone)]
pub struct CompileTask {
    /// Task name, e.g. `compileTestScala`
    pub name: String,
    /// Human readable description
    pub description: String,
    /// Source set compiled by this task
    pub source_set: SourceSetId,
    /// Name of that source set
    pub source_set_name: String,
    /// Kind of that source set
    pub kind: SourceSetKind,
    /// Compile tasks that must succeed first, in declaration order
    pub depends_on: Vec<String>,
    /// Host-language compile step of the same source set
    pub host_depends_on: String,
    /// External dependencies followed by the own host classes directory
    pub own_classpath: Vec<PathBuf>,
    /// Output directory of the host-language step
    pub host_classes_dir: PathBuf,
    /// Effective compile classpath, resolved once the graph is valid
    pub classpath: Classpath,
    /// Source directories
    pub source_dirs: Vec<PathBuf>,
    /// `.scala` files found below the source directories
    pub sources: Vec<PathBuf>,
    /// Where class files are written
    pub destination_dir: PathBuf,
    /// Toolchain, shared with every other task
    pub toolchain: Arc<ToolchainSpec>,
}

impl CompileTask {
    /// Description of the task compiling a source set
    pub fn describe(source_set: &str) -> String {
        format!("Compiles {} Scala source.", source_set)
    }

    /// Whether there is nothing to compile
    pub fn has_no_source(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Result of running one task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskOutcome {
    /// The task ran and succeeded
    Success,
    /// Inputs and outputs were unchanged since the last successful run
    UpToDate,
    /// There were no sources to compile
    NoSource,
    /// The task ran and failed
    Failed,
    /// A dependency failed or the build was cancelled before the task started
    NotAttempted,
}

impl TaskOutcome {
    /// Whether dependents may run
    pub fn is_successful(&self) -> bool {
        matches!(self, Self::Success | Self::UpToDate | Self::NoSource)
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Success => "SUCCESS",
            Self::UpToDate => "UP-TO-DATE",
            Self::NoSource => "NO-SOURCE",
            Self::Failed => "FAILED",
            Self::NotAttempted => "NOT ATTEMPTED",
        };
        f.write_str(label)
    }
}
