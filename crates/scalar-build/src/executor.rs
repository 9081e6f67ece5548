//! Running the compiler over one compile task

use crate::cancel::Cancellation;
use crate::classpath::Classpath;
use crate::compiler::{CompileRequest, CompilerInstanceLoader};
use crate::error::{BuildError, BuildResult};
use crate::task::{CompileTask, TaskOutcome};
use std::fs;
use std::sync::Arc;
use tracing::{info, warn, Span};

/// Drives compiler instances for compile tasks
#[derive(Debug)]
pub struct CompileExecutor {
    loader: Arc<CompilerInstanceLoader>,
    span: Span,
}

impl CompileExecutor {
    /// Create an executor sharing `loader`'s instance cache
    pub fn new(loader: Arc<CompilerInstanceLoader>, span: Span) -> Self {
        Self { loader, span }
    }

    /// Loader used to obtain compiler instances
    pub fn loader(&self) -> &CompilerInstanceLoader {
        &self.loader
    }

    /// Compile `task` against `classpath`
    ///
    /// A task without sources reports `NoSource` and never touches the
    /// toolchain.
    pub fn execute(
        &self,
        task: &CompileTask,
        classpath: &Classpath,
        cancellation: &Cancellation,
    ) -> BuildResult<TaskOutcome> {
        if task.has_no_source() {
            info!(parent: &self.span, task = %task.name, "no source");
            return Ok(TaskOutcome::NoSource);
        }
        if cancellation.is_cancelled() {
            return Err(BuildError::Cancelled {
                task: task.name.clone(),
            });
        }

        let instance = self
            .loader
            .get_or_load(&task.toolchain.version, &task.toolchain.artifacts)?;

        fs::create_dir_all(&task.destination_dir)
            .map_err(|e| BuildError::io(&task.destination_dir, e))?;

        info!(
            parent: &self.span,
            task = %task.name,
            sources = task.sources.len(),
            version = %instance.version(),
            "compiling"
        );

        let request = CompileRequest {
            task: &task.name,
            sources: &task.sources,
            classpath: classpath.entries(),
            destination_dir: &task.destination_dir,
        };
        let output = instance
            .compile(&request, cancellation)
            .map_err(|e| match e {
                BuildError::CompileFailed { diagnostics, .. } => {
                    BuildError::compile_failed(task.name.clone(), diagnostics)
                }
                other => other,
            })?;

        if !output.stderr.trim().is_empty() {
            warn!(parent: &self.span, task = %task.name, "{}", output.stderr.trim_end());
        }
        info!(
            parent: &self.span,
            task = %task.name,
            elapsed_ms = output.duration.as_millis() as u64,
            "compiled"
        );

        Ok(TaskOutcome::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{ArtifactPatterns, ArtifactSet, Launcher};
    use crate::source_set::{SourceSetId, SourceSetKind};
    use crate::task::ToolchainSpec;
    use scalar_config::ToolchainVersion;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn executor() -> CompileExecutor {
        let loader = CompilerInstanceLoader::new(
            ArtifactPatterns::default(),
            Launcher::new("/nonexistent/java"),
            Span::none(),
        );
        CompileExecutor::new(Arc::new(loader), Span::none())
    }

    fn task(dest: PathBuf, sources: Vec<PathBuf>, artifacts: Vec<PathBuf>) -> CompileTask {
        CompileTask {
            name: "compileScala".to_string(),
            description: CompileTask::describe("main"),
            source_set: SourceSetId::new(0),
            source_set_name: "main".to_string(),
            kind: SourceSetKind::Main,
            depends_on: Vec::new(),
            host_depends_on: "compileJava".to_string(),
            own_classpath: Vec::new(),
            host_classes_dir: PathBuf::from("/p/build/classes/java/main"),
            classpath: Classpath::new(),
            source_dirs: Vec::new(),
            sources,
            destination_dir: dest,
            toolchain: Arc::new(ToolchainSpec::new(
                ToolchainVersion::default(),
                ArtifactSet::new(artifacts),
            )),
        }
    }

    #[test]
    fn test_no_source_skips_toolchain() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("out");
        // No toolchain archives at all; loading would fail
        let task = task(dest.clone(), Vec::new(), Vec::new());

        let executor = executor();
        let outcome = executor
            .execute(&task, &Classpath::new(), &Cancellation::new())
            .unwrap();

        assert_eq!(outcome, TaskOutcome::NoSource);
        assert!(!dest.exists());
        assert_eq!(executor.loader().load_count(), 0);
    }

    #[test]
    fn test_missing_toolchain_fails_task() {
        let temp = TempDir::new().unwrap();
        let task = task(
            temp.path().join("out"),
            vec![temp.path().join("App.scala")],
            vec![PathBuf::from("/repo/scala-library-2.12.8.jar")],
        );

        let err = executor()
            .execute(&task, &Classpath::new(), &Cancellation::new())
            .unwrap_err();
        assert!(matches!(err, BuildError::ArtifactNotFound { .. }));
    }

    #[test]
    fn test_cancelled_before_start() {
        let temp = TempDir::new().unwrap();
        let task = task(
            temp.path().join("out"),
            vec![temp.path().join("App.scala")],
            Vec::new(),
        );
        let cancellation = Cancellation::new();
        cancellation.cancel();

        let err = executor()
            .execute(&task, &Classpath::new(), &cancellation)
            .unwrap_err();
        assert!(matches!(err, BuildError::Cancelled { .. }));
    }
}
