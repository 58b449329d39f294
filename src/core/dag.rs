//! Workflow DAG (Directed Acyclic Graph) construction.
//!
//! This module compiles a [`WorkflowDeclaration`] into a [`Dag`]: one node per
//! task plus two adjacency maps built together in a single pass. `edges` points
//! from an upstream task to the tasks that depend on it; `dependencies` points
//! from a task to the tasks it depends on. The two maps are exact transposes
//! of each other.
//!
//! The DAG is value-typed and read-only after construction. Acyclicity is
//! *not* checked here; run [`crate::core::validate::validate_graph`] first.

use std::collections::{BTreeMap, HashMap};

use petgraph::dot::{Config, Dot};
use petgraph::graph::DiGraph;
use serde::Serialize;

use crate::error::Result;
use crate::workflow::{TaskDeclaration, WorkflowDeclaration};

/// A task in the compiled graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskNode {
    /// Task id, unique within the workflow.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// The declaration the node was built from.
    pub task: TaskDeclaration,
}

/// The compiled dependency graph of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dag {
    /// Nodes in declaration order.
    nodes: Vec<TaskNode>,
    /// Position of each node in `nodes`.
    #[serde(skip)]
    index: HashMap<String, usize>,
    /// Forward adjacency: task id -> ids of tasks that depend on it.
    edges: BTreeMap<String, Vec<String>>,
    /// Reverse adjacency: task id -> ids of tasks it depends on.
    dependencies: BTreeMap<String, Vec<String>>,
    /// Tasks with no dependencies, in declaration order.
    roots: Vec<String>,
}

impl Dag {
    /// Build the DAG for a workflow.
    ///
    /// The declaration must have unique task ids and resolvable dependency
    /// references. Both are re-checked here and reported as
    /// [`crate::Error::DuplicateTaskIds`] or
    /// [`crate::Error::UnknownDependencies`]; a declaration that passes them
    /// always builds.
    pub fn build(workflow: &WorkflowDeclaration) -> Result<Self> {
        workflow.validate_unique_task_ids()?;
        workflow.validate_task_references()?;

        let mut nodes = Vec::with_capacity(workflow.tasks.len());
        let mut index = HashMap::with_capacity(workflow.tasks.len());
        let mut edges: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut dependencies: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for task in &workflow.tasks {
            index.insert(task.id.clone(), nodes.len());
            nodes.push(TaskNode {
                id: task.id.clone(),
                name: task.name.clone(),
                task: task.clone(),
            });
            edges.insert(task.id.clone(), Vec::new());
            dependencies.insert(task.id.clone(), Vec::new());
        }

        for task in &workflow.tasks {
            for dep in &task.depends_on {
                // Both keys exist: references were checked above.
                if let Some(dependents) = edges.get_mut(dep) {
                    dependents.push(task.id.clone());
                }
                if let Some(upstream) = dependencies.get_mut(&task.id) {
                    upstream.push(dep.clone());
                }
            }
        }

        let roots = nodes
            .iter()
            .filter(|node| dependencies.get(&node.id).map_or(true, Vec::is_empty))
            .map(|node| node.id.clone())
            .collect();

        let dag = Self {
            nodes,
            index,
            edges,
            dependencies,
            roots,
        };

        tracing::trace!(
            workflow = %workflow.name,
            tasks = dag.task_count(),
            dependencies = dag.dependency_count(),
            roots = dag.roots.len(),
            "built workflow DAG"
        );

        Ok(dag)
    }

    /// Get a node by task id.
    pub fn node(&self, id: &str) -> Option<&TaskNode> {
        self.index.get(id).and_then(|&i| self.nodes.get(i))
    }

    /// All nodes in declaration order.
    pub fn nodes(&self) -> &[TaskNode] {
        &self.nodes
    }

    /// All task ids in declaration order.
    pub fn task_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.nodes.iter().map(|node| node.id.as_str())
    }

    /// Tasks that depend on `id` (forward neighbours).
    ///
    /// Unknown ids have no dependents.
    pub fn downstream(&self, id: &str) -> &[String] {
        self.edges.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Tasks that `id` depends on (reverse neighbours).
    ///
    /// Unknown ids have no dependencies.
    pub fn upstream(&self, id: &str) -> &[String] {
        self.dependencies.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Tasks with no dependencies, in declaration order.
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// Check if a task has no dependencies. Unknown ids have none.
    pub fn is_root(&self, id: &str) -> bool {
        self.upstream(id).is_empty()
    }

    /// Whether the task was declared as needing human approval.
    pub fn requires_approval(&self, id: &str) -> bool {
        self.node(id).map_or(false, |node| node.task.requires_approval)
    }

    /// Check if the DAG contains a task.
    pub fn contains_task(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Get the number of tasks in the DAG.
    pub fn task_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get the number of dependency edges in the DAG.
    pub fn dependency_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    /// Check if the DAG is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Convert to a petgraph graph for use with its algorithm library.
    ///
    /// Node weights are task ids; edges point from a dependency to its
    /// dependent. Node indices follow declaration order.
    pub fn to_digraph(&self) -> DiGraph<&str, ()> {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), self.dependency_count());
        let indices: Vec<_> = self
            .nodes
            .iter()
            .map(|node| graph.add_node(node.id.as_str()))
            .collect();

        for (from, node) in self.nodes.iter().enumerate() {
            for dependent in self.downstream(&node.id) {
                if let Some(&to) = self.index.get(dependent) {
                    graph.add_edge(indices[from], indices[to], ());
                }
            }
        }

        graph
    }

    /// Render the graph in Graphviz DOT format.
    pub fn to_dot(&self) -> String {
        let graph = self.to_digraph();
        format!("{:?}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
    }
}
