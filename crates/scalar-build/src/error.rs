/// Build system error types
use crate::compiler::ArtifactRole;
use scalar_config::ConfigError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Cannot find the {role} archive (expected a file name starting with {prefixes}) in {searched:?}. {hint}")]
    ArtifactNotFound {
        role: ArtifactRole,
        prefixes: String,
        searched: Vec<PathBuf>,
        hint: String,
    },

    #[error("Could not resolve {coordinates}: {message}")]
    ArtifactResolution {
        coordinates: String,
        message: String,
    },

    #[error("Compilation failed for task '{task}':\n{diagnostics}")]
    CompileFailed { task: String, diagnostics: String },

    #[error("Scala toolchain failure in task '{task}': {message}")]
    ToolchainFailure { task: String, message: String },

    #[error("Task '{task}' was cancelled")]
    Cancelled { task: String },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Duplicate task name: {name}")]
    DuplicateTask { name: String },

    #[error("Duplicate source set name: {name}")]
    DuplicateSourceSet { name: String },

    #[error("Task '{task}' depends on unknown task '{dependency}'")]
    MissingDependency { task: String, dependency: String },

    #[error("Task not found: {task}")]
    TaskNotFound { task: String },

    #[error("Source set '{name}' was registered after the source set container was finalized")]
    LateRegistration { name: String },

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse error categories reported to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Fatal before any task runs
    Configuration,
    /// Fatal for the affected task only
    ArtifactNotFound,
    /// The toolchain ran and reported diagnostics
    CompileFailed,
    /// The task graph is malformed; fatal for the whole build
    Graph,
    /// The isolation boundary itself failed (spawn, wait, timeout)
    Toolchain,
    /// The build was cancelled
    Cancelled,
    /// Filesystem failure
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configuration => "configuration error",
            Self::ArtifactNotFound => "artifact not found",
            Self::CompileFailed => "compile failed",
            Self::Graph => "graph error",
            Self::Toolchain => "toolchain failure",
            Self::Cancelled => "cancelled",
            Self::Io => "I/O error",
        };
        f.write_str(name)
    }
}

impl BuildError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) | Self::InvalidConfiguration(_) => ErrorKind::Configuration,
            Self::ArtifactNotFound { .. } | Self::ArtifactResolution { .. } => {
                ErrorKind::ArtifactNotFound
            }
            Self::CompileFailed { .. } => ErrorKind::CompileFailed,
            Self::ToolchainFailure { .. } => ErrorKind::Toolchain,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::CircularDependency(_)
            | Self::DuplicateTask { .. }
            | Self::DuplicateSourceSet { .. }
            | Self::MissingDependency { .. }
            | Self::TaskNotFound { .. }
            | Self::LateRegistration { .. } => ErrorKind::Graph,
            Self::IoError { .. } | Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether this error is a malformed task graph
    pub fn is_graph_error(&self) -> bool {
        self.kind() == ErrorKind::Graph
    }

    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Create a compile failure carrying the toolchain's diagnostics verbatim
    pub fn compile_failed(task: impl Into<String>, diagnostics: impl Into<String>) -> Self {
        Self::CompileFailed {
            task: task.into(),
            diagnostics: diagnostics.into(),
        }
    }

    /// Create a toolchain failure
    pub fn toolchain(task: impl Into<String>, message: impl ToString) -> Self {
        Self::ToolchainFailure {
            task: task.into(),
            message: message.to_string(),
        }
    }

    /// Create a task not found error
    pub fn task_not_found(task: impl Into<String>) -> Self {
        Self::TaskNotFound { task: task.into() }
    }

    /// Diagnostics reported by the compiler, if this is a compile failure
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            Self::CompileFailed { diagnostics, .. } => Some(diagnostics),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            BuildError::InvalidConfiguration("x".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            BuildError::compile_failed("compileScala", "boom").kind(),
            ErrorKind::CompileFailed
        );
        assert!(BuildError::CircularDependency("a -> a".into()).is_graph_error());
        assert!(BuildError::LateRegistration { name: "it".into() }.is_graph_error());
        assert!(!BuildError::toolchain("compileScala", "spawn failed").is_graph_error());
    }

    #[test]
    fn test_compile_failed_keeps_diagnostics() {
        let diagnostics = "App.scala:3: error: not found: value x\n  x\n  ^";
        let err = BuildError::compile_failed("compileScala", diagnostics);
        assert_eq!(err.diagnostics(), Some(diagnostics));
        assert!(err.to_string().contains(diagnostics));
    }

    #[test]
    fn test_config_error_converts() {
        let err: BuildError = ConfigError::InvalidVersion("bad".into()).into();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
