//! A loaded compiler and the child-process boundary it runs behind

use super::artifacts::{join_class_path, ArtifactPatterns, ArtifactRole, ArtifactSet};
use crate::cancel::Cancellation;
use crate::error::{BuildError, BuildResult};
use scalar_config::ToolchainVersion;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Variables that would let the parent environment leak classes or JVM flags
/// into the compiler process
pub const SCRUBBED_ENV_VARS: &[&str] = &[
    "CLASSPATH",
    "JAVA_TOOL_OPTIONS",
    "_JAVA_OPTIONS",
    "JDK_JAVA_OPTIONS",
];

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How long captured output is awaited once the process group was killed
const KILL_GRACE: Duration = Duration::from_millis(500);

/// JVM launcher used to start compiler processes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launcher {
    java: PathBuf,
    timeout: Option<Duration>,
}

impl Launcher {
    /// Launcher running the given `java` executable
    pub fn new(java: impl Into<PathBuf>) -> Self {
        Self {
            java: java.into(),
            timeout: None,
        }
    }

    /// Use the configured executable, else `java` from `PATH`
    ///
    /// When nothing is found the bare name is kept; the failure then surfaces
    /// as a toolchain failure of the first task that compiles.
    pub fn locate(configured: Option<PathBuf>) -> Self {
        let java = configured
            .or_else(|| which::which("java").ok())
            .unwrap_or_else(|| PathBuf::from("java"));
        Self::new(java)
    }

    /// Kill compiler processes running longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Executable path
    pub fn java(&self) -> &Path {
        &self.java
    }

    /// Per-invocation timeout
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Inputs of one compiler invocation
#[derive(Debug, Clone)]
pub struct CompileRequest<'a> {
    /// Task on whose behalf the compiler runs
    pub task: &'a str,
    /// Source files
    pub sources: &'a [PathBuf],
    /// Compile classpath
    pub classpath: &'a [PathBuf],
    /// Where class files are written
    pub destination_dir: &'a Path,
}

/// Output of a successful invocation
#[derive(Debug, Clone, Default)]
pub struct CompileOutput {
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error (warnings)
    pub stderr: String,
    /// Wall-clock time
    pub duration: Duration,
}

/// An isolated, invocable compiler for one toolchain version
#[derive(Debug, Clone)]
pub struct CompilerInstance {
    pub(crate) version: ToolchainVersion,
    pub(crate) library: PathBuf,
    pub(crate) compiler: PathBuf,
    pub(crate) artifacts: ArtifactSet,
    pub(crate) main_class: String,
    pub(crate) launcher: Launcher,
    pub(crate) patterns: ArtifactPatterns,
}

impl CompilerInstance {
    /// Toolchain version
    pub fn version(&self) -> &ToolchainVersion {
        &self.version
    }

    /// The library archive that matched
    pub fn library_artifact(&self) -> &Path {
        &self.library
    }

    /// The compiler archive that matched
    pub fn compiler_artifact(&self) -> &Path {
        &self.compiler
    }

    /// Every archive on the compiler's own class path
    pub fn artifacts(&self) -> &ArtifactSet {
        &self.artifacts
    }

    /// Entry point of the matched compiler family
    pub fn main_class(&self) -> &str {
        &self.main_class
    }

    /// Launcher the compiler runs under
    pub fn launcher(&self) -> &Launcher {
        &self.launcher
    }

    /// Full command line for a request
    pub fn command(&self, request: &CompileRequest<'_>) -> BuildResult<Command> {
        let mut command = Command::new(self.launcher.java());
        command
            .arg("-cp")
            .arg(self.artifacts.to_class_path()?)
            .arg(&self.main_class)
            .arg("-classpath")
            .arg(join_class_path(request.classpath)?)
            .arg("-d")
            .arg(request.destination_dir)
            .args(request.sources)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        for var in SCRUBBED_ENV_VARS {
            command.env_remove(var);
        }
        // Own process group, so a kill also reaches anything the launcher forks
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        Ok(command)
    }

    /// Compile `request.sources` in a fresh child process
    pub fn compile(
        &self,
        request: &CompileRequest<'_>,
        cancellation: &Cancellation,
    ) -> BuildResult<CompileOutput> {
        self.check_library_on_classpath(request)?;

        let mut command = self.command(request)?;
        debug!(
            task = request.task,
            java = %self.launcher.java().display(),
            main_class = %self.main_class,
            sources = request.sources.len(),
            "starting compiler process"
        );

        let start = Instant::now();
        let mut child = command.spawn().map_err(|e| {
            BuildError::toolchain(
                request.task,
                format!("failed to start {}: {}", self.launcher.java().display(), e),
            )
        })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match self.wait(&mut child, request.task, start, cancellation) {
            Ok(status) => status,
            Err(e) => {
                // Output of a killed run is discarded; do not wait on leftover writers
                let _ = collect(stdout, Some(KILL_GRACE));
                let _ = collect(stderr, Some(KILL_GRACE));
                return Err(e);
            }
        };
        let stdout = collect(stdout, None);
        let stderr = collect(stderr, None);

        if !status.success() {
            return Err(BuildError::compile_failed(
                request.task,
                diagnostics(&stdout, &stderr),
            ));
        }

        Ok(CompileOutput {
            stdout,
            stderr,
            duration: start.elapsed(),
        })
    }

    /// The library family must be on the compile classpath, not only on the
    /// compiler's own class path
    fn check_library_on_classpath(&self, request: &CompileRequest<'_>) -> BuildResult<()> {
        if request.classpath.iter().any(|p| self.patterns.is_library(p)) {
            return Ok(());
        }

        Err(BuildError::ArtifactNotFound {
            role: ArtifactRole::Library,
            prefixes: self.patterns.describe(ArtifactRole::Library),
            searched: request.classpath.to_vec(),
            hint: format!(
                "Task '{}' needs the Scala {} library on its compile classpath; add it to the \
                 source set's `classpath` in scalar.toml.",
                request.task, self.version
            ),
        })
    }

    fn wait(
        &self,
        child: &mut Child,
        task: &str,
        start: Instant,
        cancellation: &Cancellation,
    ) -> BuildResult<ExitStatus> {
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {}
                Err(e) => {
                    kill(child);
                    return Err(BuildError::toolchain(task, format!("wait failed: {}", e)));
                }
            }

            if cancellation.is_cancelled() {
                kill(child);
                return Err(BuildError::Cancelled {
                    task: task.to_string(),
                });
            }

            if let Some(timeout) = self.launcher.timeout() {
                if start.elapsed() >= timeout {
                    kill(child);
                    return Err(BuildError::toolchain(
                        task,
                        format!("compiler timed out after {:?}", timeout),
                    ));
                }
            }

            thread::sleep(POLL_INTERVAL);
        }
    }
}

fn kill(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        let group = Pid::from_raw(child.id() as i32);
        if let Err(e) = killpg(group, Signal::SIGKILL) {
            debug!("compiler process group already gone: {}", e);
        }
    }
    #[cfg(not(unix))]
    {
        if let Err(e) = child.kill() {
            debug!("compiler process already gone: {}", e);
        }
    }
    // Reap the zombie
    if let Err(e) = child.wait() {
        warn!("failed to reap compiler process: {}", e);
    }
}

fn drain<R: Read + Send + 'static>(stream: Option<R>) -> Option<Receiver<String>> {
    stream.map(|mut stream| {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut bytes = Vec::new();
            let _ = stream.read_to_end(&mut bytes);
            let _ = tx.send(String::from_utf8_lossy(&bytes).into_owned());
        });
        rx
    })
}

/// Captured output of one stream, waiting at most `limit` when given
fn collect(output: Option<Receiver<String>>, limit: Option<Duration>) -> String {
    let Some(rx) = output else {
        return String::new();
    };
    match limit {
        Some(limit) => rx.recv_timeout(limit).unwrap_or_default(),
        None => rx.recv().unwrap_or_default(),
    }
}

/// Everything the compiler printed, stdout first
fn diagnostics(stdout: &str, stderr: &str) -> String {
    match (stdout.trim().is_empty(), stderr.trim().is_empty()) {
        (true, _) => stderr.to_string(),
        (false, true) => stdout.to_string(),
        (false, false) => format!("{}{}", stdout, stderr),
    }
}
