use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{ResourceToken, TaskEnv, TaskStatus};

/// Description of the machine a task ran on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    pub hostname: String,
    pub platform: String,
    pub arch: String,
    pub os: String,
}

/// Provenance snapshot of a single task execution.
///
/// Created when resources are granted, then completed in two steps:
/// [`ExecutionRecord::mark_spawned`] once the pid is known and
/// [`ExecutionRecord::mark_finished`] once the process has exited.
/// Every step is persisted as a full overwrite, so the on-disk copy is always one of these three states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub run_id: String,
    pub identifier: String,
    pub cmd_str: String,
    pub cmd_list: Vec<String>,
    /// Absolute working directory.
    pub cwd: PathBuf,
    /// Composed environment, including the resource-selector variable.
    pub env: TaskEnv,
    pub host: HostInfo,
    pub resources: Vec<ResourceToken>,
    #[serde(with = "time::serde::rfc3339")]
    pub launched_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub ended_at: Option<OffsetDateTime>,
    pub pid: Option<u32>,
    pub exit_code: Option<i32>,
    pub status: Option<TaskStatus>,
    pub elapsed_ms: Option<u64>,
}

impl ExecutionRecord {
    pub fn mark_spawned(&mut self, pid: u32) {
        self.pid = Some(pid);
    }

    pub fn mark_finished(
        &mut self,
        status: TaskStatus,
        exit_code: Option<i32>,
        elapsed: Duration,
        ended_at: OffsetDateTime,
    ) {
        self.status = Some(status);
        self.exit_code = exit_code;
        self.elapsed_ms = Some(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
        self.ended_at = Some(ended_at);
    }
}
