//! The host scheduler seam and a local scheduler implementing it
//!
//! Compile tasks are handed to a [`TaskScheduler`] as plain registrations:
//! a name, edges, declared inputs and outputs, and an action. The
//! [`LocalScheduler`] runs them in dependency order on a rayon pool, skipping
//! tasks whose fingerprint is unchanged.

use crate::build_order::{DependencyGraph, TaskNode};
use crate::cancel::Cancellation;
use crate::error::{BuildError, BuildResult};
use crate::fingerprint::{Fingerprint, FingerprintStore};
use crate::task::TaskOutcome;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, Span};

/// Work performed by a task
pub type TaskAction = Arc<dyn Fn(&Cancellation) -> BuildResult<TaskOutcome> + Send + Sync>;

/// A task as handed to the host scheduler
#[derive(Clone)]
pub struct TaskRegistration {
    /// Unique task name
    pub name: String,
    /// Human readable description
    pub description: String,
    /// Tasks of this graph that must succeed first
    pub depends_on: Vec<String>,
    /// Host-owned tasks that must run first
    pub host_depends_on: Vec<String>,
    /// Files and directories whose content the task reads
    pub inputs: Vec<PathBuf>,
    /// Non-file values that affect the output
    pub input_properties: BTreeMap<String, String>,
    /// Directories the task writes
    pub outputs: Vec<PathBuf>,
    /// The work itself
    pub action: TaskAction,
}

impl fmt::Debug for TaskRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRegistration")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("depends_on", &self.depends_on)
            .field("host_depends_on", &self.host_depends_on)
            .field("inputs", &self.inputs)
            .field("input_properties", &self.input_properties)
            .field("outputs", &self.outputs)
            .finish_non_exhaustive()
    }
}

/// Interface of the host's task scheduler
pub trait TaskScheduler {
    /// Accept a task for later execution
    fn register_task(&mut self, registration: TaskRegistration) -> BuildResult<()>;
}

/// Per-task line of a build report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskResult {
    /// Task name
    pub name: String,
    /// What happened
    pub outcome: TaskOutcome,
    /// Time spent, zero for tasks that did not run
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// A task that failed, with its error
#[derive(Debug)]
pub struct TaskFailure {
    /// Task name
    pub task: String,
    /// Why it failed
    pub error: BuildError,
}

/// Build statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    /// Tasks selected for this run
    pub total_tasks: usize,
    /// Tasks whose action ran to success
    pub executed: usize,
    /// Tasks skipped because nothing changed
    pub up_to_date: usize,
    /// Tasks with nothing to compile
    pub no_source: usize,
    /// Tasks that failed
    pub failed: usize,
    /// Tasks never started
    pub not_attempted: usize,
    /// Number of parallel groups
    pub parallel_groups: usize,
    /// Wall-clock time of the whole run
    #[serde(rename = "total_time_ms", serialize_with = "serialize_millis")]
    pub total_time: Duration,
}

/// Outcome of a scheduler run
#[derive(Debug, Default)]
pub struct BuildReport {
    results: Vec<TaskResult>,
    failures: Vec<TaskFailure>,
    not_attempted: BTreeSet<String>,
    stats: BuildStats,
}

impl BuildReport {
    /// Whether no task failed and none was skipped
    pub fn success(&self) -> bool {
        self.failures.is_empty() && self.not_attempted.is_empty()
    }

    /// Task results in execution order
    pub fn results(&self) -> &[TaskResult] {
        &self.results
    }

    /// Outcome of a task, if it was selected
    pub fn outcome(&self, task: &str) -> Option<TaskOutcome> {
        self.results
            .iter()
            .find(|r| r.name == task)
            .map(|r| r.outcome)
    }

    /// Failures in the order they were observed
    pub fn failures(&self) -> &[TaskFailure] {
        &self.failures
    }

    /// The first failure
    pub fn first_failure(&self) -> Option<&TaskFailure> {
        self.failures.first()
    }

    /// Tasks that never started
    pub fn not_attempted(&self) -> &BTreeSet<String> {
        &self.not_attempted
    }

    /// Statistics
    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    fn record(&mut self, name: String, outcome: TaskOutcome, duration: Duration) {
        match outcome {
            TaskOutcome::Success => self.stats.executed += 1,
            TaskOutcome::UpToDate => self.stats.up_to_date += 1,
            TaskOutcome::NoSource => self.stats.no_source += 1,
            TaskOutcome::Failed => self.stats.failed += 1,
            TaskOutcome::NotAttempted => {
                self.stats.not_attempted += 1;
                self.not_attempted.insert(name.clone());
            }
        }
        self.results.push(TaskResult {
            name,
            outcome,
            duration,
        });
    }

    fn record_failure(&mut self, name: String, error: BuildError, duration: Duration) {
        self.failures.push(TaskFailure {
            task: name.clone(),
            error,
        });
        self.record(name, TaskOutcome::Failed, duration);
    }
}

/// Scheduler running registered tasks in this process
pub struct LocalScheduler {
    tasks: BTreeMap<String, TaskRegistration>,
    order: Vec<String>,
    jobs: usize,
    rerun: bool,
    fingerprints: FingerprintStore,
    cancellation: Cancellation,
    span: Span,
}

impl LocalScheduler {
    /// Create a scheduler storing fingerprints in `fingerprints`
    pub fn new(fingerprints: FingerprintStore, span: Span) -> Self {
        Self {
            tasks: BTreeMap::new(),
            order: Vec::new(),
            jobs: default_jobs(),
            rerun: false,
            fingerprints,
            cancellation: Cancellation::new(),
            span,
        }
    }

    /// Limit the number of concurrently running tasks
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Ignore stored fingerprints
    pub fn with_rerun(mut self, rerun: bool) -> Self {
        self.rerun = rerun;
        self
    }

    /// Share an existing cancellation signal
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Signal that cancels this scheduler's runs
    pub fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }

    /// Registered tasks in registration order
    pub fn tasks(&self) -> impl Iterator<Item = &TaskRegistration> {
        self.order.iter().filter_map(|name| self.tasks.get(name))
    }

    /// Run the requested tasks and everything they depend on
    ///
    /// With no requested task every registered task runs. A malformed graph
    /// fails the whole run; task failures are reported in the returned report.
    pub fn run(&self, requested: &[String]) -> BuildResult<BuildReport> {
        let start = Instant::now();

        let mut graph = DependencyGraph::new();
        for registration in self.tasks() {
            graph.add_node(
                TaskNode::new(registration.name.clone())
                    .with_dependencies(registration.depends_on.clone()),
            )?;
        }
        graph.validate()?;

        let selected = if requested.is_empty() {
            self.order.iter().cloned().collect()
        } else {
            graph.closure(requested.iter().map(String::as_str))?
        };

        let mut subgraph = DependencyGraph::new();
        for name in &selected {
            if let Some(node) = graph.get(name) {
                subgraph.add_node(node.clone())?;
            }
        }
        let groups = subgraph.parallel_build_groups()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map_err(|e| {
                BuildError::InvalidConfiguration(format!("cannot start worker pool: {}", e))
            })?;

        info!(
            parent: &self.span,
            tasks = selected.len(),
            groups = groups.len(),
            jobs = self.jobs,
            "starting build"
        );

        let mut report = BuildReport::default();
        report.stats.total_tasks = selected.len();
        report.stats.parallel_groups = groups.len();

        for group in &groups {
            let mut runnable = Vec::new();
            for name in group {
                let Some(registration) = self.tasks.get(name) else {
                    continue;
                };
                let blocked = registration
                    .depends_on
                    .iter()
                    .any(|dep| !report.outcome(dep).is_some_and(|o| o.is_successful()));

                if blocked || self.cancellation.is_cancelled() {
                    debug!(parent: &self.span, task = %name, "not attempted");
                    report.record(name.clone(), TaskOutcome::NotAttempted, Duration::ZERO);
                } else {
                    runnable.push(registration);
                }
            }

            let results: Vec<(String, BuildResult<TaskOutcome>, Duration)> = pool.install(|| {
                runnable
                    .par_iter()
                    .map(|registration| {
                        let started = Instant::now();
                        let result = self.execute(registration);
                        (registration.name.clone(), result, started.elapsed())
                    })
                    .collect()
            });

            for (name, result, elapsed) in results {
                match result {
                    Ok(outcome) => {
                        info!(parent: &self.span, task = %name, outcome = %outcome, "task finished");
                        report.record(name, outcome, elapsed);
                    }
                    Err(err) => {
                        error!(parent: &self.span, task = %name, kind = %err.kind(), "task failed");
                        report.record_failure(name, err, elapsed);
                    }
                }
            }
        }

        report.stats.total_time = start.elapsed();
        info!(
            parent: &self.span,
            success = report.success(),
            elapsed_ms = report.stats.total_time.as_millis() as u64,
            "build finished"
        );
        Ok(report)
    }

    fn execute(&self, registration: &TaskRegistration) -> BuildResult<TaskOutcome> {
        if !registration.host_depends_on.is_empty() {
            debug!(
                parent: &self.span,
                task = %registration.name,
                host = ?registration.host_depends_on,
                "host dependencies assumed complete"
            );
        }

        let current = self.fingerprint(registration)?;
        if !self.rerun && self.fingerprints.load(&registration.name).as_ref() == Some(&current) {
            return Ok(TaskOutcome::UpToDate);
        }

        // Whatever the outcome, the old outputs are no longer trusted
        self.fingerprints.remove(&registration.name)?;

        let outcome = (registration.action)(&self.cancellation)?;
        if outcome == TaskOutcome::Success {
            let fingerprint = self.fingerprint(registration)?;
            self.fingerprints.save(&registration.name, &fingerprint)?;
        }
        Ok(outcome)
    }

    fn fingerprint(&self, registration: &TaskRegistration) -> BuildResult<Fingerprint> {
        Fingerprint::compute(
            &registration.inputs,
            &registration.input_properties,
            &registration.outputs,
        )
    }
}

impl TaskScheduler for LocalScheduler {
    fn register_task(&mut self, registration: TaskRegistration) -> BuildResult<()> {
        if self.tasks.contains_key(&registration.name) {
            return Err(BuildError::DuplicateTask {
                name: registration.name,
            });
        }
        self.order.push(registration.name.clone());
        self.tasks.insert(registration.name.clone(), registration);
        Ok(())
    }
}

impl fmt::Debug for LocalScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalScheduler")
            .field("tasks", &self.order)
            .field("jobs", &self.jobs)
            .field("rerun", &self.rerun)
            .field("fingerprints", &self.fingerprints)
            .finish()
    }
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
