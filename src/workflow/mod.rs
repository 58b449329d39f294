//! Workflow declarations consumed by the graph builder.
//!
//! Declarations arrive already normalized; this module only defines their
//! shape and the two invariants (unique ids, resolvable dependencies) the
//! builder relies on.

mod types;

pub use types::{
    DanglingReference, ExecutionParams, Provider, RetryPolicy, TaskConfig, TaskDeclaration,
    WorkflowConfig, WorkflowDeclaration,
};
