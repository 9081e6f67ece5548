//! Execution order for named tasks using topological sort
use crate::error::{BuildError, BuildResult};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

/// A task in the dependency graph
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskNode {
    /// Task name
    pub name: String,
    /// Names of tasks that must complete first
    pub dependencies: Vec<String>,
}

impl TaskNode {
    /// Create a new task node
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
        }
    }

    /// Add dependencies
    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

/// Dependency graph over task names
///
/// Nodes are kept sorted by name so every traversal is deterministic.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeMap<String, TaskNode>,
}

impl DependencyGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, rejecting a name that is already present
    pub fn add_node(&mut self, node: TaskNode) -> BuildResult<()> {
        if self.nodes.contains_key(&node.name) {
            return Err(BuildError::DuplicateTask { name: node.name });
        }
        self.nodes.insert(node.name.clone(), node);
        Ok(())
    }

    /// Get a node by name
    pub fn get(&self, name: &str) -> Option<&TaskNode> {
        self.nodes.get(name)
    }

    /// Check whether a node exists
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Node count
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if graph is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check that every edge target exists and that there are no cycles
    pub fn validate(&self) -> BuildResult<()> {
        for (name, node) in &self.nodes {
            for dep in &node.dependencies {
                if !self.nodes.contains_key(dep) {
                    return Err(BuildError::MissingDependency {
                        task: name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        if let Some(cycle) = self.find_cycle() {
            return Err(BuildError::CircularDependency(cycle));
        }

        Ok(())
    }

    /// Names of `roots` plus everything they transitively depend on
    pub fn closure<'a>(
        &self,
        roots: impl IntoIterator<Item = &'a str>,
    ) -> BuildResult<BTreeSet<String>> {
        let mut selected = BTreeSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();

        for root in roots {
            if !self.nodes.contains_key(root) {
                return Err(BuildError::task_not_found(root));
            }
            queue.push_back(root.to_string());
        }

        while let Some(name) = queue.pop_front() {
            if !selected.insert(name.clone()) {
                continue;
            }
            if let Some(node) = self.nodes.get(&name) {
                queue.extend(node.dependencies.iter().cloned());
            }
        }

        Ok(selected)
    }

    /// Compute topological order using Kahn's algorithm
    /// Returns task names in the order they should run
    pub fn compute_build_order(&self) -> BuildResult<Vec<String>> {
        if self.nodes.is_empty() {
            return Ok(Vec::new());
        }

        // In-degree = number of dependencies a task still waits on
        let mut in_degree: BTreeMap<&str, usize> = self
            .nodes
            .iter()
            .map(|(name, node)| (name.as_str(), node.dependencies.len()))
            .collect();
        let mut queue: VecDeque<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(name, _)| *name)
            .collect();
        let mut result = Vec::new();

        while let Some(name) = queue.pop_front() {
            result.push(name.to_string());

            for (dependent, node) in &self.nodes {
                let waits = node.dependencies.iter().filter(|d| *d == name).count();
                if waits == 0 {
                    continue;
                }
                if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                    *degree -= waits;
                    if *degree == 0 {
                        queue.push_back(dependent.as_str());
                    }
                }
            }
        }

        if result.len() != self.nodes.len() {
            let cycle = self.find_cycle().unwrap_or_else(|| "unknown cycle".to_string());
            return Err(BuildError::CircularDependency(cycle));
        }

        Ok(result)
    }

    /// Group tasks into waves that can run concurrently
    /// Every task in a group only depends on tasks of earlier groups
    pub fn parallel_build_groups(&self) -> BuildResult<Vec<Vec<String>>> {
        if self.nodes.is_empty() {
            return Ok(Vec::new());
        }

        let mut groups = Vec::new();
        let mut built: HashSet<&str> = HashSet::new();

        loop {
            let group: Vec<&str> = self
                .nodes
                .iter()
                .filter(|(name, _)| !built.contains(name.as_str()))
                .filter(|(_, node)| node.dependencies.iter().all(|d| built.contains(d.as_str())))
                .map(|(name, _)| name.as_str())
                .collect();

            if group.is_empty() {
                break;
            }

            built.extend(group.iter().copied());
            groups.push(group.into_iter().map(str::to_string).collect());
        }

        if built.len() != self.nodes.len() {
            let cycle = self.find_cycle().unwrap_or_else(|| "unknown cycle".to_string());
            return Err(BuildError::CircularDependency(cycle));
        }

        Ok(groups)
    }

    /// Find a cycle in the graph (for error reporting)
    pub fn find_cycle(&self) -> Option<String> {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut path = Vec::new();

        for name in self.nodes.keys() {
            if let Some(cycle) = self.dfs_find_cycle(name, &mut visited, &mut rec_stack, &mut path)
            {
                return Some(cycle);
            }
        }

        None
    }

    /// DFS to find a cycle
    fn dfs_find_cycle(
        &self,
        name: &str,
        visited: &mut HashSet<String>,
        rec_stack: &mut HashSet<String>,
        path: &mut Vec<String>,
    ) -> Option<String> {
        if rec_stack.contains(name) {
            path.push(name.to_string());
            if let Some(start) = path.iter().position(|m| m == name) {
                return Some(path[start..].join(" -> "));
            }
            return Some(path.join(" -> "));
        }

        if visited.contains(name) {
            return None;
        }

        visited.insert(name.to_string());
        rec_stack.insert(name.to_string());
        path.push(name.to_string());

        if let Some(node) = self.nodes.get(name) {
            for dep in &node.dependencies {
                if let Some(cycle) = self.dfs_find_cycle(dep, visited, rec_stack, path) {
                    return Some(cycle);
                }
            }
        }

        rec_stack.remove(name);
        path.pop();
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, deps: &[&str]) -> TaskNode {
        TaskNode::new(name).with_dependencies(deps.iter().map(|d| d.to_string()).collect())
    }

    fn graph(nodes: Vec<TaskNode>) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for n in nodes {
            graph.add_node(n).unwrap();
        }
        graph
    }

    #[test]
    fn test_empty_graph() {
        let graph = DependencyGraph::new();
        assert!(graph.is_empty());
        assert_eq!(graph.compute_build_order().unwrap(), Vec::<String>::new());
        assert!(graph.parallel_build_groups().unwrap().is_empty());
    }

    #[test]
    fn test_linear_dependency_chain() {
        let graph = graph(vec![node("a", &["b"]), node("b", &["c"]), node("c", &[])]);
        assert_eq!(graph.compute_build_order().unwrap(), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_diamond_groups() {
        let graph = graph(vec![
            node("a", &["b", "c"]),
            node("b", &["d"]),
            node("c", &["d"]),
            node("d", &[]),
        ]);

        let groups = graph.parallel_build_groups().unwrap();
        assert_eq!(groups, vec![vec!["d"], vec!["b", "c"], vec!["a"]]);
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let mut graph = DependencyGraph::new();
        graph.add_node(node("a", &[])).unwrap();
        match graph.add_node(node("a", &[])) {
            Err(BuildError::DuplicateTask { name }) => assert_eq!(name, "a"),
            other => panic!("Expected DuplicateTask, got {:?}", other),
        }
    }

    #[test]
    fn test_circular_dependency_detection() {
        let graph = graph(vec![node("a", &["b"]), node("b", &["a"])]);

        match graph.validate() {
            Err(BuildError::CircularDependency(cycle)) => {
                assert!(cycle.contains("a") && cycle.contains("b"));
            }
            other => panic!("Expected CircularDependency, got {:?}", other),
        }
        assert!(graph.compute_build_order().is_err());
        assert!(graph.parallel_build_groups().is_err());
    }

    #[test]
    fn test_missing_dependency() {
        let graph = graph(vec![node("a", &["nonexistent"])]);

        match graph.validate() {
            Err(BuildError::MissingDependency { task, dependency }) => {
                assert_eq!(task, "a");
                assert_eq!(dependency, "nonexistent");
            }
            other => panic!("Expected MissingDependency, got {:?}", other),
        }
    }

    #[test]
    fn test_closure_selects_transitive_dependencies() {
        let graph = graph(vec![
            node("a", &["b"]),
            node("b", &["c"]),
            node("c", &[]),
            node("x", &[]),
        ]);

        let selected = graph.closure(["b"]).unwrap();
        assert_eq!(selected.into_iter().collect::<Vec<_>>(), vec!["b", "c"]);
        assert!(matches!(
            graph.closure(["missing"]),
            Err(BuildError::TaskNotFound { .. })
        ));
    }
}
