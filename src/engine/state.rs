//! Task execution lifecycle.
//!
//! One execution attempt of one task moves through [`TaskRunStatus`] values
//! only in response to a [`TaskEvent`]. [`next_status`] computes the status an
//! event leads to, or rejects the event when it is not legal from the current
//! status. Nothing is stored here; the caller persists the result.
//!
//! ```text
//! PENDING ──DEPENDENCIES_MET──▶ READY ──SCHEDULED──▶ QUEUED ──CLAIMED──▶ RUNNING
//!    │                            ▲                    ▲                   │
//!    └──APPROVAL_REQUIRED──▶ BLOCKED ──APPROVED──┘      └──ERRORED(retry)───┤
//!                                                                          ├──COMPLETED──▶ SUCCESS
//!                                                                          └──ERRORED──▶ FAILED
//! ```
//!
//! `CANCELLED` is reachable from every non-terminal status.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Status of one task within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskRunStatus {
    /// Created; dependencies not yet satisfied.
    #[default]
    Pending,
    /// Dependencies satisfied; may be scheduled.
    Ready,
    /// Handed to the work queue, waiting for a worker.
    Queued,
    /// Claimed by a worker and executing.
    Running,
    /// Completed successfully.
    Success,
    /// Failed with no retry left.
    Failed,
    /// Waiting for human approval.
    Blocked,
    /// Cancelled before finishing.
    Cancelled,
}

impl TaskRunStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [TaskRunStatus; 8] = [
        TaskRunStatus::Pending,
        TaskRunStatus::Ready,
        TaskRunStatus::Queued,
        TaskRunStatus::Running,
        TaskRunStatus::Success,
        TaskRunStatus::Failed,
        TaskRunStatus::Blocked,
        TaskRunStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskRunStatus::Pending => "PENDING",
            TaskRunStatus::Ready => "READY",
            TaskRunStatus::Queued => "QUEUED",
            TaskRunStatus::Running => "RUNNING",
            TaskRunStatus::Success => "SUCCESS",
            TaskRunStatus::Failed => "FAILED",
            TaskRunStatus::Blocked => "BLOCKED",
            TaskRunStatus::Cancelled => "CANCELLED",
        }
    }

    /// Statuses reachable from this one in a single transition.
    pub fn allowed_transitions(&self) -> &'static [TaskRunStatus] {
        use TaskRunStatus::*;
        match self {
            Pending => &[Ready, Blocked, Cancelled],
            Ready => &[Queued, Cancelled],
            Queued => &[Running, Cancelled],
            // Queued again means a retry.
            Running => &[Success, Failed, Queued, Cancelled],
            Blocked => &[Ready, Cancelled],
            Success | Failed | Cancelled => &[],
        }
    }

    /// Check if a transition to `target` is in the transition table.
    pub fn can_transition_to(&self, target: TaskRunStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }

    /// No further transitions: SUCCESS, FAILED or CANCELLED.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskRunStatus::Success | TaskRunStatus::Failed | TaskRunStatus::Cancelled
        )
    }

    /// In the hands of the queue or a worker: QUEUED or RUNNING.
    pub fn is_active(&self) -> bool {
        matches!(self, TaskRunStatus::Queued | TaskRunStatus::Running)
    }

    /// Waiting on dependencies or approval: PENDING or BLOCKED.
    pub fn is_waiting(&self) -> bool {
        matches!(self, TaskRunStatus::Pending | TaskRunStatus::Blocked)
    }

    /// Ready to be handed to the queue: READY.
    pub fn is_schedulable(&self) -> bool {
        matches!(self, TaskRunStatus::Ready)
    }
}

impl std::fmt::Display for TaskRunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check if `from -> to` is in the transition table.
pub fn can_transition(from: TaskRunStatus, to: TaskRunStatus) -> bool {
    from.can_transition_to(to)
}

/// Something that happened to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskEvent {
    /// Every upstream task succeeded.
    DependenciesMet,
    /// Dependencies are met but the task needs human approval first.
    ApprovalRequired,
    /// The orchestrator pushed the task to the work queue.
    Scheduled,
    /// A worker picked the task up.
    Claimed,
    /// The worker finished with output.
    Completed { output: String },
    /// The worker failed. `retriable` decides between requeue and failure.
    Errored { error: String, retriable: bool },
    /// A human approved the task.
    Approved,
    /// The task was cancelled.
    Cancelled,
}

impl TaskEvent {
    pub fn completed(output: impl Into<String>) -> Self {
        TaskEvent::Completed {
            output: output.into(),
        }
    }

    pub fn errored(error: impl Into<String>, retriable: bool) -> Self {
        TaskEvent::Errored {
            error: error.into(),
            retriable,
        }
    }

    /// The payload-free tag of this event.
    pub fn kind(&self) -> TaskEventKind {
        match self {
            TaskEvent::DependenciesMet => TaskEventKind::DependenciesMet,
            TaskEvent::ApprovalRequired => TaskEventKind::ApprovalRequired,
            TaskEvent::Scheduled => TaskEventKind::Scheduled,
            TaskEvent::Claimed => TaskEventKind::Claimed,
            TaskEvent::Completed { .. } => TaskEventKind::Completed,
            TaskEvent::Errored { .. } => TaskEventKind::Errored,
            TaskEvent::Approved => TaskEventKind::Approved,
            TaskEvent::Cancelled => TaskEventKind::Cancelled,
        }
    }
}

/// Event tag without payload, used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskEventKind {
    DependenciesMet,
    ApprovalRequired,
    Scheduled,
    Claimed,
    Completed,
    Errored,
    Approved,
    Cancelled,
}

impl TaskEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskEventKind::DependenciesMet => "DEPENDENCIES_MET",
            TaskEventKind::ApprovalRequired => "APPROVAL_REQUIRED",
            TaskEventKind::Scheduled => "SCHEDULED",
            TaskEventKind::Claimed => "CLAIMED",
            TaskEventKind::Completed => "COMPLETED",
            TaskEventKind::Errored => "ERRORED",
            TaskEventKind::Approved => "APPROVED",
            TaskEventKind::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for TaskEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compute the status `event` moves a task in status `current` to.
///
/// # Errors
/// [`Error::InvalidTransition`] when the event is not legal from `current`,
/// and [`Error::CancelTerminal`] when cancelling a finished task.
pub fn next_status(current: TaskRunStatus, event: &TaskEvent) -> Result<TaskRunStatus> {
    use TaskRunStatus::*;

    let next = match (event, current) {
        (TaskEvent::DependenciesMet, Pending) => Some(Ready),
        (TaskEvent::ApprovalRequired, Pending) => Some(Blocked),
        (TaskEvent::Scheduled, Ready) => Some(Queued),
        (TaskEvent::Claimed, Queued) => Some(Running),
        (TaskEvent::Completed { .. }, Running) => Some(Success),
        (TaskEvent::Errored { retriable, .. }, Running) => {
            Some(if *retriable { Queued } else { Failed })
        }
        (TaskEvent::Approved, Blocked) => Some(Ready),
        (TaskEvent::Cancelled, status) if status.is_terminal() => {
            tracing::debug!(status = %status, "rejected cancel of finished task");
            return Err(Error::CancelTerminal { status });
        }
        (TaskEvent::Cancelled, _) => Some(Cancelled),
        _ => None,
    };

    next.ok_or_else(|| {
        tracing::debug!(event = %event.kind(), from = %current, "rejected task transition");
        Error::InvalidTransition {
            event: event.kind(),
            from: current,
        }
    })
}
