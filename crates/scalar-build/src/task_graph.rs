//! Deriving compile tasks from source sets and handing them to a scheduler

use crate::build_order::{DependencyGraph, TaskNode};
use crate::classpath::{Classpath, ClasspathResolver};
use crate::error::{BuildError, BuildResult};
use crate::executor::CompileExecutor;
use crate::scheduler::{TaskRegistration, TaskScheduler};
use crate::source_set::{scala_task_name, SourceSetKind, SourceSetRegistry};
use crate::task::{CompileTask, ToolchainSpec};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, Span};

/// Validated set of compile tasks for one build
#[derive(Debug, Clone)]
pub struct BuildGraph {
    tasks: BTreeMap<String, CompileTask>,
    order: Vec<String>,
    graph: DependencyGraph,
}

impl BuildGraph {
    /// Tasks in source set registration order
    pub fn tasks(&self) -> impl Iterator<Item = &CompileTask> {
        self.order.iter().filter_map(|name| self.tasks.get(name))
    }

    /// Look up a task by name
    pub fn get(&self, name: &str) -> Option<&CompileTask> {
        self.tasks.get(name)
    }

    /// The task compiling the named source set
    pub fn task_for_source_set(&self, source_set: &str) -> Option<&CompileTask> {
        self.tasks().find(|t| t.source_set_name == source_set)
    }

    /// Task count
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the graph has no task
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Edges between compile tasks
    pub fn dependency_graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Task names in an order that respects every edge
    pub fn build_order(&self) -> BuildResult<Vec<String>> {
        self.graph.compute_build_order()
    }
}

/// Derives one compile task per source set
pub struct TaskGraphBuilder {
    toolchain: Arc<ToolchainSpec>,
    span: Span,
}

impl TaskGraphBuilder {
    /// Create a builder for tasks sharing `toolchain`
    pub fn new(toolchain: Arc<ToolchainSpec>, span: Span) -> Self {
        Self { toolchain, span }
    }

    /// Finalize the registry and build a validated task graph
    ///
    /// Duplicate task names, edges to unknown tasks and cycles are rejected
    /// before any classpath is resolved.
    pub fn build(&self, registry: &mut SourceSetRegistry) -> BuildResult<BuildGraph> {
        registry.finalize();

        let main_task = registry.main().map(|s| s.scala_task_name());
        let mut tasks = BTreeMap::new();
        let mut order = Vec::new();
        let mut graph = DependencyGraph::new();

        for source_set in registry.list() {
            let scala = registry.scala(source_set.id()).ok_or_else(|| {
                BuildError::InvalidConfiguration(format!(
                    "source set '{}' has no Scala source directory set",
                    source_set.name()
                ))
            })?;

            let mut depends_on = Vec::new();
            if source_set.kind() == SourceSetKind::Test {
                depends_on.extend(main_task.clone());
            }
            for declared in source_set.declared_dependencies() {
                let name = scala_task_name(declared);
                if !depends_on.contains(&name) {
                    depends_on.push(name);
                }
            }

            let task = CompileTask {
                name: source_set.scala_task_name(),
                description: CompileTask::describe(source_set.name()),
                source_set: source_set.id(),
                source_set_name: source_set.name().to_string(),
                kind: source_set.kind(),
                depends_on,
                host_depends_on: source_set.host_task_name(),
                own_classpath: source_set.own_compile_classpath(),
                host_classes_dir: source_set.host_classes_dir().to_path_buf(),
                classpath: Classpath::new(),
                source_dirs: scala.source_dirs().to_vec(),
                sources: scala.source_files()?,
                destination_dir: scala.output_dir().to_path_buf(),
                toolchain: Arc::clone(&self.toolchain),
            };

            graph.add_node(
                TaskNode::new(task.name.clone()).with_dependencies(task.depends_on.clone()),
            )?;
            debug!(
                parent: &self.span,
                task = %task.name,
                depends_on = ?task.depends_on,
                sources = task.sources.len(),
                "derived compile task"
            );
            order.push(task.name.clone());
            tasks.insert(task.name.clone(), task);
        }

        graph.validate()?;

        let mut resolved = Vec::with_capacity(order.len());
        {
            let mut resolver = ClasspathResolver::new(&tasks);
            for name in &order {
                resolved.push((name.clone(), resolver.resolve(name)?));
            }
        }
        for (name, classpath) in resolved {
            if let Some(task) = tasks.get_mut(&name) {
                task.classpath = classpath;
            }
        }

        info!(parent: &self.span, tasks = tasks.len(), "task graph ready");
        Ok(BuildGraph {
            tasks,
            order,
            graph,
        })
    }

    /// Register every task of `graph` with the host scheduler
    pub fn register(
        &self,
        graph: &BuildGraph,
        scheduler: &mut dyn TaskScheduler,
        executor: Arc<CompileExecutor>,
    ) -> BuildResult<()> {
        for task in graph.tasks() {
            let mut inputs = task.sources.clone();
            inputs.extend(task.classpath.entries().iter().cloned());

            let action_task = Arc::new(task.clone());
            let action_executor = Arc::clone(&executor);

            scheduler.register_task(TaskRegistration {
                name: task.name.clone(),
                description: task.description.clone(),
                depends_on: task.depends_on.clone(),
                host_depends_on: vec![task.host_depends_on.clone()],
                inputs,
                input_properties: task.toolchain.input_properties(),
                outputs: vec![task.destination_dir.clone()],
                action: Arc::new(move |cancellation| {
                    action_executor.execute(&action_task, &action_task.classpath, cancellation)
                }),
            })?;
        }
        Ok(())
    }
}
