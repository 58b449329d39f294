//! Structural validation of a workflow graph.
//!
//! Problems are collected as [`ValidationError`] values rather than returned
//! as errors, so a caller can show all of them at once. Checks run in order
//! and stop at the first category that fails, because later checks assume the
//! earlier ones hold:
//!
//! 1. the graph has at least one root (`NO_ROOTS`),
//! 2. the graph has no cycle (`CYCLE_DETECTED`, one entry per cycle found;
//!    cycles sharing no task are always reported separately),
//! 3. every task is reachable from a root (`UNREACHABLE_TASK`, one entry per task).
//!
//! A declaration that cannot be built at all yields a single `BUILD_ERROR`.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::core::dag::Dag;
use crate::workflow::WorkflowDeclaration;

/// Category of a structural problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCode {
    /// Every task has at least one dependency.
    NoRoots,
    /// The dependency relation loops back on itself.
    CycleDetected,
    /// A task cannot be reached from any root.
    UnreachableTask,
    /// The declaration could not be compiled into a graph.
    BuildError,
}

impl ValidationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationCode::NoRoots => "NO_ROOTS",
            ValidationCode::CycleDetected => "CYCLE_DETECTED",
            ValidationCode::UnreachableTask => "UNREACHABLE_TASK",
            ValidationCode::BuildError => "BUILD_ERROR",
        }
    }
}

impl std::fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structural problem found in a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub code: ValidationCode,
    pub message: String,
    /// The offending task, for per-task problems.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// For `CYCLE_DETECTED`: the cycle as task ids, first id repeated at the end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle: Option<Vec<String>>,
}

impl ValidationError {
    fn no_roots() -> Self {
        Self {
            code: ValidationCode::NoRoots,
            message: "Workflow has no root tasks (all tasks have dependencies). This creates a cycle."
                .to_string(),
            task_id: None,
            cycle: None,
        }
    }

    fn cycle(path: Vec<String>) -> Self {
        Self {
            code: ValidationCode::CycleDetected,
            message: format!("Cycle detected: {}", path.join(" → ")),
            task_id: None,
            cycle: Some(path),
        }
    }

    fn unreachable(task_id: &str) -> Self {
        Self {
            code: ValidationCode::UnreachableTask,
            message: format!("Task {} is not reachable from any root task", task_id),
            task_id: Some(task_id.to_string()),
            cycle: None,
        }
    }

    fn build(message: String) -> Self {
        Self {
            code: ValidationCode::BuildError,
            message,
            task_id: None,
            cycle: None,
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Validate a workflow declaration. An empty list means the workflow is a
/// well-formed DAG.
pub fn validate_dag(workflow: &WorkflowDeclaration) -> Vec<ValidationError> {
    match Dag::build(workflow) {
        Ok(dag) => validate_graph(&dag),
        Err(e) => {
            tracing::debug!(workflow = %workflow.name, error = %e, "workflow failed to build");
            vec![ValidationError::build(e.to_string())]
        }
    }
}

/// Check if a workflow declaration is a well-formed DAG.
pub fn is_valid_dag(workflow: &WorkflowDeclaration) -> bool {
    validate_dag(workflow).is_empty()
}

/// Validate an already-built graph.
pub fn validate_graph(dag: &Dag) -> Vec<ValidationError> {
    if dag.roots().is_empty() {
        // Cycle search from an empty frontier tells us nothing more.
        tracing::debug!(tasks = dag.task_count(), "workflow has no root tasks");
        return vec![ValidationError::no_roots()];
    }

    let mut errors: Vec<ValidationError> = detect_cycles(dag)
        .into_iter()
        .map(ValidationError::cycle)
        .collect();

    if errors.is_empty() {
        errors.extend(
            find_unreachable(dag)
                .into_iter()
                .map(ValidationError::unreachable),
        );
    }

    if !errors.is_empty() {
        tracing::debug!(count = errors.len(), first = %errors[0], "workflow graph rejected");
    }
    errors
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Not visited yet.
    White,
    /// On the current DFS path, at this stack depth.
    Gray(usize),
    /// Fully explored.
    Black,
}

/// Three-color depth-first search, restarted from every unvisited task in
/// declaration order. Returns one path per back edge, each closed by
/// repeating its first task.
///
/// Every cycle contains at least one back edge of the search, so cycles that
/// share no task always yield separate entries. Parallel duplicate edges
/// report their cycle once.
fn detect_cycles(dag: &Dag) -> Vec<Vec<String>> {
    let mut color: HashMap<&str, Color> = dag.task_ids().map(|id| (id, Color::White)).collect();
    let mut cycles: Vec<Vec<String>> = Vec::new();

    for start in dag.task_ids() {
        if color.get(start) != Some(&Color::White) {
            continue;
        }

        // Explicit stack of (task, index of the next child to visit).
        let mut stack: Vec<(&str, usize)> = vec![(start, 0)];
        color.insert(start, Color::Gray(0));

        while let Some(frame) = stack.last_mut() {
            let id = frame.0;
            let children = dag.downstream(id);

            if frame.1 >= children.len() {
                color.insert(id, Color::Black);
                stack.pop();
                continue;
            }

            let child = children[frame.1].as_str();
            frame.1 += 1;

            match color.get(child).copied() {
                Some(Color::Gray(depth)) => {
                    let mut cycle: Vec<String> =
                        stack[depth..].iter().map(|(t, _)| t.to_string()).collect();
                    cycle.push(child.to_string());
                    if !cycles.contains(&cycle) {
                        tracing::trace!(cycle = ?cycle, "cycle found");
                        cycles.push(cycle);
                    }
                }
                Some(Color::White) => {
                    color.insert(child, Color::Gray(stack.len()));
                    stack.push((child, 0));
                }
                _ => {}
            }
        }
    }

    cycles
}

/// Breadth-first search from all roots at once; returns every task never
/// reached, in declaration order.
fn find_unreachable(dag: &Dag) -> Vec<&str> {
    let mut reachable: HashSet<&str> = dag.roots().iter().map(String::as_str).collect();
    let mut queue: VecDeque<&str> = dag.roots().iter().map(String::as_str).collect();

    while let Some(id) = queue.pop_front() {
        for child in dag.downstream(id) {
            if reachable.insert(child.as_str()) {
                queue.push_back(child.as_str());
            }
        }
    }

    dag.task_ids().filter(|id| !reachable.contains(id)).collect()
}
