//! Workflow graph: construction, ordering and structural validation.

pub mod dag;
pub mod topo;
pub mod validate;

pub use dag::{Dag, TaskNode};
pub use validate::{is_valid_dag, validate_dag, validate_graph, ValidationCode, ValidationError};
