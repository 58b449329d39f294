//! Workflow declaration types.
//!
//! A declaration is the normalized, already-shape-checked form of a user's
//! workflow. Task ids are unique and every `depends_on` entry names another
//! task of the same workflow; [`WorkflowDeclaration::validate_unique_task_ids`]
//! and [`WorkflowDeclaration::validate_task_references`] check exactly that.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// Language-model provider a task is executed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::OpenAi => write!(f, "openai"),
            Provider::Anthropic => write!(f, "anthropic"),
        }
    }
}

/// How often a failed task may be re-attempted.
///
/// Only the decision is made here; waiting `backoff_ms` between attempts is
/// the caller's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first one.
    pub max_attempts: u32,
    /// Delay the caller should wait before requeueing.
    #[serde(default)]
    pub backoff_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_ms: u64) -> Self {
        Self {
            max_attempts,
            backoff_ms,
        }
    }

    /// Whether the failure of attempt number `attempt` (1-based) may be retried.
    pub fn is_retriable(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Per-task model settings. Carried through untouched except for the retry
/// policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TaskConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Either `true`/`false` or a JSON schema object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_policy: Option<RetryPolicy>,
}

impl TaskConfig {
    /// Whether a failed attempt may be requeued. Tasks without a retry policy
    /// never are.
    pub fn is_retriable(&self, attempt: u32) -> bool {
        self.retry_policy
            .map(|policy| policy.is_retriable(attempt))
            .unwrap_or(false)
    }
}

/// Workflow-wide settings, carried through for the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WorkflowConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_parallel: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// What a worker needs to execute a task. Opaque to graph and engine code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExecutionParams {
    pub prompt: String,
    pub model: String,
    pub provider: Provider,
    #[serde(default)]
    pub config: TaskConfig,
}

/// A single task as declared in a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDeclaration {
    /// Unique identifier within the workflow.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    #[serde(flatten)]
    pub params: ExecutionParams,
    /// Ids of the tasks that must succeed before this one may run.
    #[serde(default, deserialize_with = "one_or_many")]
    pub depends_on: Vec<String>,
    /// Hold the task for human approval once its dependencies are met.
    #[serde(default)]
    pub requires_approval: bool,
}

impl TaskDeclaration {
    /// Create a task with no dependencies and default execution parameters.
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            params: ExecutionParams::default(),
            depends_on: Vec::new(),
            requires_approval: false,
        }
    }

    /// Replace the upstream dependencies.
    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Set whether the task needs human approval before it becomes runnable.
    pub fn with_approval(mut self, requires_approval: bool) -> Self {
        self.requires_approval = requires_approval;
        self
    }

    /// Replace the execution parameters.
    pub fn with_params(mut self, params: ExecutionParams) -> Self {
        self.params = params;
        self
    }
}

/// A `depends_on` entry that names no task of the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DanglingReference {
    pub task: String,
    pub dependency: String,
}

impl std::fmt::Display for DanglingReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Task {} depends on non-existent task: {}",
            self.task, self.dependency
        )
    }
}

/// A normalized workflow: a name and its tasks in declaration order.
///
/// Declaration order matters: it fixes root order, phase member order and
/// tie-breaking in the topological sort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDeclaration {
    pub name: String,
    pub tasks: Vec<TaskDeclaration>,
    #[serde(default)]
    pub config: WorkflowConfig,
}

impl WorkflowDeclaration {
    pub fn new(name: &str, tasks: Vec<TaskDeclaration>) -> Self {
        Self {
            name: name.to_string(),
            tasks,
            config: WorkflowConfig::default(),
        }
    }

    /// Look up a task by id.
    pub fn task(&self, id: &str) -> Option<&TaskDeclaration> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Approval flag of every task, keyed by id.
    pub fn approval_requirements(&self) -> HashMap<String, bool> {
        self.tasks
            .iter()
            .map(|t| (t.id.clone(), t.requires_approval))
            .collect()
    }

    /// Check that no two tasks share an id.
    ///
    /// Every duplicated id is reported once, in order of its second
    /// occurrence.
    pub fn validate_unique_task_ids(&self) -> Result<()> {
        let mut seen = HashSet::new();
        let mut duplicates: Vec<String> = Vec::new();

        for task in &self.tasks {
            if !seen.insert(task.id.as_str()) && !duplicates.contains(&task.id) {
                duplicates.push(task.id.clone());
            }
        }

        if duplicates.is_empty() {
            Ok(())
        } else {
            Err(Error::DuplicateTaskIds(duplicates))
        }
    }

    /// Check that every `depends_on` entry names a task of this workflow.
    pub fn validate_task_references(&self) -> Result<()> {
        let ids: HashSet<&str> = self.tasks.iter().map(|t| t.id.as_str()).collect();

        let dangling: Vec<DanglingReference> = self
            .tasks
            .iter()
            .flat_map(|task| {
                task.depends_on
                    .iter()
                    .filter(|dep| !ids.contains(dep.as_str()))
                    .map(|dep| DanglingReference {
                        task: task.id.clone(),
                        dependency: dep.clone(),
                    })
            })
            .collect();

        if dangling.is_empty() {
            Ok(())
        } else {
            Err(Error::UnknownDependencies(dangling))
        }
    }
}

/// Accept `depends_on = "a"` as shorthand for `depends_on = ["a"]`.
fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(dep)) => vec![dep],
        Some(OneOrMany::Many(deps)) => deps,
        None => Vec::new(),
    })
}
