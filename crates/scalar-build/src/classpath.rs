//! Compile classpath composition
//!
//! A task compiles against its own external dependencies and host classes
//! first, then, for every dependency edge in declaration order, the
//! dependency's Scala output, its host classes, and its own classpath.

use crate::error::{BuildError, BuildResult};
use crate::task::CompileTask;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Ordered set of classpath entries; the first occurrence of a path wins
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Classpath {
    entries: Vec<PathBuf>,
}

impl Classpath {
    /// Create an empty classpath
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry unless already present
    pub fn push(&mut self, entry: impl Into<PathBuf>) {
        let entry = entry.into();
        if !self.entries.contains(&entry) {
            self.entries.push(entry);
        }
    }

    /// Append entries in order, skipping duplicates
    pub fn extend<I, P>(&mut self, entries: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        for entry in entries {
            self.push(entry);
        }
    }

    /// Entries in order
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// Whether `path` is on the classpath
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.iter().any(|e| e == path)
    }

    /// Position of `path`, if present
    pub fn position(&self, path: &Path) -> Option<usize> {
        self.entries.iter().position(|e| e == path)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the classpath is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for Classpath {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        let mut classpath = Self::new();
        classpath.extend(iter);
        classpath
    }
}

/// Resolves and memoizes classpaths over a set of compile tasks
pub struct ClasspathResolver<'a> {
    tasks: &'a BTreeMap<String, CompileTask>,
    resolved: HashMap<String, Classpath>,
    in_progress: HashSet<String>,
}

impl<'a> ClasspathResolver<'a> {
    /// Create a resolver over `tasks`, keyed by task name
    pub fn new(tasks: &'a BTreeMap<String, CompileTask>) -> Self {
        Self {
            tasks,
            resolved: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    /// Effective compile classpath of the named task
    pub fn resolve(&mut self, name: &str) -> BuildResult<Classpath> {
        if let Some(classpath) = self.resolved.get(name) {
            return Ok(classpath.clone());
        }

        let tasks = self.tasks;
        let task = tasks
            .get(name)
            .ok_or_else(|| BuildError::task_not_found(name))?;

        if !self.in_progress.insert(name.to_string()) {
            return Err(BuildError::CircularDependency(name.to_string()));
        }

        let mut classpath: Classpath = task.own_classpath.iter().cloned().collect();
        for dependency in &task.depends_on {
            let upstream = tasks.get(dependency).ok_or_else(|| {
                BuildError::MissingDependency {
                    task: name.to_string(),
                    dependency: dependency.clone(),
                }
            })?;
            classpath.push(upstream.destination_dir.clone());
            classpath.push(upstream.host_classes_dir.clone());

            let inherited = self.resolve(dependency)?;
            classpath.extend(inherited.entries().iter().cloned());
        }

        self.in_progress.remove(name);
        self.resolved.insert(name.to_string(), classpath.clone());
        Ok(classpath)
    }
}
