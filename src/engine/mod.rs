//! Run progression: the per-task state machine and the dependency unlock
//! resolver that the orchestrator's control loop calls after every event.

pub mod state;
pub mod unlock;

pub use state::{can_transition, next_status, TaskEvent, TaskEventKind, TaskRunStatus};
pub use unlock::{
    are_dependencies_satisfied, compute_initial_ready, compute_run_status, compute_unlocked,
    is_run_complete, RunStatus, UnlockResult,
};
