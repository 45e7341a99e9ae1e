use std::fmt;

use serde::{Deserialize, Serialize};

/// Final classification of a finished task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    /// Subprocess exited with code 0.
    Success,
    /// Non-zero exit, signal termination, spawn failure, pre-hook failure or rejected spec.
    Fail,
}

impl TaskStatus {
    /// Classify a raw exit code (`None` means the process was killed by a signal).
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => TaskStatus::Success,
            _ => TaskStatus::Fail,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskStatus::Success)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Success => "SUCCESS",
            TaskStatus::Fail => "FAIL",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle position of a task inside one launcher run.
///
/// `Pending → Acquiring → Preparing → Running → Completed`. There are no retries,
/// so `Completed` is terminal and a task passes through each phase at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "phase", content = "status")]
pub enum TaskPhase {
    /// Submitted, no resources requested yet.
    Pending,
    /// Waiting on the resource pool.
    Acquiring,
    /// Tokens granted; composing env, running the pre-hook, writing provenance.
    Preparing,
    /// Subprocess spawned (or being spawned).
    Running,
    /// Finished with the given status.
    Completed(TaskStatus),
}

impl TaskPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskPhase::Completed(_))
    }

    /// Returns `true` while the task holds pool tokens.
    pub fn holds_resources(&self) -> bool {
        matches!(self, TaskPhase::Preparing | TaskPhase::Running)
    }

    /// Whether `next` is a legal successor of `self`.
    ///
    /// Any non-terminal phase may jump straight to `Completed`: a rejected spec never acquires,
    /// and a failed pre-hook never runs.
    pub fn can_advance_to(&self, next: TaskPhase) -> bool {
        use TaskPhase::*;
        match (self, next) {
            (Completed(_), _) => false,
            (_, Completed(_)) => true,
            (Pending, Acquiring) | (Acquiring, Preparing) | (Preparing, Running) => true,
            _ => false,
        }
    }
}

impl fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskPhase::Pending => f.write_str("pending"),
            TaskPhase::Acquiring => f.write_str("acquiring"),
            TaskPhase::Preparing => f.write_str("preparing"),
            TaskPhase::Running => f.write_str("running"),
            TaskPhase::Completed(status) => write!(f, "completed({status})"),
        }
    }
}
