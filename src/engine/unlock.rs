//! Dependency unlock resolution and run verdicts.
//!
//! Every function here is a query over a status snapshot the caller passes
//! in. Nothing is retained between calls; the caller applies the returned
//! decisions and must keep its snapshot stable for the duration of a call.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::dag::Dag;
use crate::engine::state::{TaskEvent, TaskRunStatus};
use crate::error::{Error, Result};

/// Tasks leaving PENDING after a status change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockResult {
    /// Tasks to move to READY.
    pub newly_ready: Vec<String>,
    /// Tasks to move to BLOCKED until approved.
    pub newly_blocked: Vec<String>,
}

impl UnlockResult {
    /// Check if nothing was unlocked.
    pub fn is_empty(&self) -> bool {
        self.newly_ready.is_empty() && self.newly_blocked.is_empty()
    }

    /// Whether `id` is already in either list.
    pub fn contains(&self, id: &str) -> bool {
        self.newly_ready.iter().chain(&self.newly_blocked).any(|t| t == id)
    }

    /// The events the caller feeds to the state machine to apply this result:
    /// `DEPENDENCIES_MET` for ready tasks, `APPROVAL_REQUIRED` for blocked ones.
    pub fn events(&self) -> impl Iterator<Item = (&str, TaskEvent)> + '_ {
        let ready = self
            .newly_ready
            .iter()
            .map(|id| (id.as_str(), TaskEvent::DependenciesMet));
        let blocked = self
            .newly_blocked
            .iter()
            .map(|id| (id.as_str(), TaskEvent::ApprovalRequired));
        ready.chain(blocked)
    }

    fn route(&mut self, id: &str, requires_approval: &HashMap<String, bool>) {
        if requires_approval.get(id).copied().unwrap_or(false) {
            self.newly_blocked.push(id.to_string());
        } else {
            self.newly_ready.push(id.to_string());
        }
    }
}

/// Final verdict of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Success,
    Failed,
    Cancelled,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Success => write!(f, "SUCCESS"),
            RunStatus::Failed => write!(f, "FAILED"),
            RunStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Tasks to release when a run starts: every root, routed by its approval
/// flag. Non-root tasks stay PENDING.
pub fn compute_initial_ready(dag: &Dag, requires_approval: &HashMap<String, bool>) -> UnlockResult {
    let mut result = UnlockResult::default();
    for id in dag.roots() {
        result.route(id, requires_approval);
    }

    tracing::debug!(
        ready = ?result.newly_ready,
        blocked = ?result.newly_blocked,
        "initial unlock"
    );
    result
}

/// Tasks to release after `completed_task_id` reached SUCCESS.
///
/// Only direct dependents are inspected. A dependent is released when it is
/// still PENDING and every one of its dependencies is SUCCESS; anything not
/// PENDING is left alone, so repeating the call for the same completion on an
/// updated snapshot releases nothing twice.
pub fn compute_unlocked(
    completed_task_id: &str,
    dag: &Dag,
    statuses: &HashMap<String, TaskRunStatus>,
    requires_approval: &HashMap<String, bool>,
) -> UnlockResult {
    let mut result = UnlockResult::default();

    for child in dag.downstream(completed_task_id) {
        if statuses.get(child) != Some(&TaskRunStatus::Pending) || result.contains(child) {
            continue;
        }

        if are_dependencies_satisfied(child, dag, statuses) {
            result.route(child, requires_approval);
        }
    }

    tracing::debug!(
        completed = completed_task_id,
        ready = ?result.newly_ready,
        blocked = ?result.newly_blocked,
        "dependency unlock"
    );
    result
}

/// Whether every dependency of `task_id` is SUCCESS. Tasks without
/// dependencies are trivially satisfied; a dependency with no recorded status
/// is not.
pub fn are_dependencies_satisfied(
    task_id: &str,
    dag: &Dag,
    statuses: &HashMap<String, TaskRunStatus>,
) -> bool {
    dag.upstream(task_id)
        .iter()
        .all(|dep| statuses.get(dep) == Some(&TaskRunStatus::Success))
}

/// Whether every task of the run has reached a terminal status.
pub fn is_run_complete(statuses: &HashMap<String, TaskRunStatus>) -> bool {
    statuses.values().all(TaskRunStatus::is_terminal)
}

/// Aggregate the terminal statuses of a finished run.
///
/// FAILED wins over CANCELLED, which wins over SUCCESS.
///
/// # Errors
/// [`Error::RunIncomplete`] if any task is not terminal, [`Error::EmptyRun`]
/// if there are no tasks at all.
pub fn compute_run_status(statuses: &HashMap<String, TaskRunStatus>) -> Result<RunStatus> {
    if statuses.is_empty() {
        return Err(Error::EmptyRun);
    }

    let unfinished = statuses.values().filter(|s| !s.is_terminal()).count();
    if unfinished > 0 {
        return Err(Error::RunIncomplete { unfinished });
    }

    let has = |wanted: TaskRunStatus| statuses.values().any(|&s| s == wanted);
    let verdict = if has(TaskRunStatus::Failed) {
        RunStatus::Failed
    } else if has(TaskRunStatus::Cancelled) {
        RunStatus::Cancelled
    } else {
        RunStatus::Success
    };

    tracing::debug!(tasks = statuses.len(), verdict = %verdict, "run finished");
    Ok(verdict)
}
