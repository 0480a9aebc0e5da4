use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// Outcome of syncing one user. Produced per run and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub uid: String,
    /// Eligible tasks an insert was attempted for (or that failed to map).
    pub attempted: usize,
    /// Events newly created by this run.
    pub created: usize,
    /// Events the provider reported as already present.
    pub already_synced: usize,
    pub errors: Vec<TaskFailure>,
}

impl SyncReport {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            ..Default::default()
        }
    }
}

/// A per-task failure recorded in a [`SyncReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskFailure {
    pub task_id: String,
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MalformedTask,
    Provider,
}

impl From<&TaskError> for TaskFailure {
    fn from(error: &TaskError) -> Self {
        let kind = match error {
            TaskError::MalformedTask { .. } => FailureKind::MalformedTask,
            TaskError::Provider { .. } => FailureKind::Provider,
        };
        Self {
            task_id: error.task_id().to_string(),
            kind,
            message: error.to_string(),
        }
    }
}

/// Result of one fan-out pass: how many distinct users were dispatched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerSummary {
    pub triggered: usize,
    pub users: Vec<String>,
}
