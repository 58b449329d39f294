//! Execution structure and progression for declarative task workflows.
//!
//! A [`WorkflowDeclaration`] is compiled into a [`Dag`], checked once with
//! [`validate_dag`] when the workflow is registered, and then consulted by the
//! orchestrator's control loop for the rest of a run:
//!
//! - [`compute_initial_ready`] when the run starts,
//! - [`next_status`] for every event reported for a task,
//! - [`compute_unlocked`] whenever a task reaches SUCCESS,
//! - [`is_run_complete`] and [`compute_run_status`] to close the run.
//!
//! The crate holds no state and performs no I/O. The caller owns the status
//! map and must serialize its own read-modify-write around each call.

pub mod core;
pub mod engine;
pub mod error;
pub mod workflow;

pub use crate::core::{is_valid_dag, validate_dag, Dag, TaskNode, ValidationCode, ValidationError};
pub use engine::{
    are_dependencies_satisfied, can_transition, compute_initial_ready, compute_run_status,
    compute_unlocked, is_run_complete, next_status, RunStatus, TaskEvent, TaskEventKind,
    TaskRunStatus, UnlockResult,
};
pub use error::{Error, Result};
pub use workflow::{TaskDeclaration, WorkflowDeclaration};
