use thiserror::Error;

use crate::engine::state::{TaskEventKind, TaskRunStatus};
use crate::workflow::DanglingReference;

/// Hard failures: broken preconditions and illegal transitions.
///
/// Structural problems in a workflow are not reported through this type;
/// see [`crate::core::validate::ValidationError`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Duplicate task IDs: {}", .0.join(", "))]
    DuplicateTaskIds(Vec<String>),

    #[error("{}", join_references(.0))]
    UnknownDependencies(Vec<DanglingReference>),

    #[error("Cycle detected: only {processed} of {total} tasks could be ordered")]
    Cycle { processed: usize, total: usize },

    #[error("Cannot process {event} from {from}")]
    InvalidTransition {
        event: TaskEventKind,
        from: TaskRunStatus,
    },

    #[error("Cannot process CANCELLED from terminal state {status}")]
    CancelTerminal { status: TaskRunStatus },

    #[error("Cannot determine run status: {unfinished} task(s) not in a terminal state")]
    RunIncomplete { unfinished: usize },

    #[error("Cannot determine run status: run has no tasks")]
    EmptyRun,
}

impl Error {
    /// True for errors raised by graph algorithms run on a cyclic graph.
    pub fn is_cycle(&self) -> bool {
        matches!(self, Error::Cycle { .. })
    }

    /// True for errors raised by the task state machine.
    pub fn is_transition(&self) -> bool {
        matches!(
            self,
            Error::InvalidTransition { .. } | Error::CancelTerminal { .. }
        )
    }
}

fn join_references(refs: &[DanglingReference]) -> String {
    refs.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Result<T> = std::result::Result<T, Error>;
