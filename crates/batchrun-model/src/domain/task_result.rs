use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ResourceToken, TaskStatus};

/// Outcome of one task, produced exactly once per submitted spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    /// Position of the task in the submitted batch.
    pub index: usize,
    /// Identifier copied from the submitted task.
    pub identifier: String,
    pub status: TaskStatus,
    /// Wall time from subprocess spawn attempt to exit (zero if it never spawned).
    pub elapsed: Duration,
    /// Tokens the task held while running (empty if it never acquired).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tokens: Vec<ResourceToken>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Why the task failed before producing an exit code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskResult {
    /// A failure that happened before (or instead of) the subprocess running.
    pub fn failed(index: usize, identifier: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            index,
            identifier: identifier.into(),
            status: TaskStatus::Fail,
            elapsed: Duration::ZERO,
            tokens: Vec::new(),
            pid: None,
            exit_code: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
