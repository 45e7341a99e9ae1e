use async_trait::async_trait;
use tracing::trace;

use batchrun_core::{ExitReport, Invocation, Runner, RunnerError};

use crate::{
    error::ExecError,
    util::{cmd_program, spawn_and_wait},
};

/// Runs `command_list()[0]` directly with the remaining items as arguments, no shell involved.
pub struct ProcRunner {
    name: &'static str,
}

impl ProcRunner {
    pub fn new() -> Self {
        Self { name: "proc" }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

impl Default for ProcRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Runner for ProcRunner {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(
        &self,
        inv: &Invocation,
        on_spawn: &mut (dyn FnMut(u32) + Send),
    ) -> Result<ExitReport, RunnerError> {
        let list = inv.command.command_list();
        let Some((program, args)) = list.split_first() else {
            return Err(ExecError::MissingProgram.into());
        };

        trace!(target: "batchrun.exec.proc", %program, ?args, "spawn");
        let cmd = cmd_program(program, args);
        Ok(spawn_and_wait(cmd, inv, on_spawn, self.name).await?)
    }
}

#[cfg(feature = "shell")]
pub mod shell;
