use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use batchrun_model::{Command, TaskEnv};

/// Everything a runner needs to start one subprocess.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub identifier: String,
    pub command: Command,
    pub cwd: PathBuf,
    /// Complete child environment; runners must not merge it with their own.
    pub env: TaskEnv,
    pub stdout: PathBuf,
    pub stderr: PathBuf,
}

/// How a subprocess ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitReport {
    pub pid: u32,
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RunnerError {
    #[error("invalid command: {0}")]
    InvalidCommand(String),
    #[error("cannot open output file: {0}")]
    Output(String),
    #[error("spawn: {0}")]
    Spawn(String),
    #[error("wait: {0}")]
    Wait(String),
}

/// Executes one subprocess to completion.
///
/// `on_spawn` must be called exactly once with the child's pid as soon as it is known, before waiting for exit.
/// It is never called if spawning fails.
#[async_trait]
pub trait Runner: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(
        &self,
        invocation: &Invocation,
        on_spawn: &mut (dyn FnMut(u32) + Send),
    ) -> Result<ExitReport, RunnerError>;
}
