use async_trait::async_trait;
use tokio::process::Command;
use tracing::trace;

use batchrun_core::{ExitReport, Invocation, Runner, RunnerError};

use crate::{error::ExecError, util::spawn_and_wait};

/// ShellRunner: runs `command_string()` through the system shell (`/bin/sh -c` / `cmd /C`).
///
/// A command the shell cannot find still spawns successfully and surfaces as exit code 127.
pub struct ShellRunner {
    name: &'static str,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self { name: "shell" }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Runner for ShellRunner {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(
        &self,
        inv: &Invocation,
        on_spawn: &mut (dyn FnMut(u32) + Send),
    ) -> Result<ExitReport, RunnerError> {
        if inv.command.is_empty() {
            return Err(ExecError::MissingProgram.into());
        }
        let script = inv.command.command_string();

        cfg_if::cfg_if! {
            if #[cfg(target_family = "windows")] {
                let mut cmd = Command::new("cmd");
                cmd.arg("/C").arg(&script);
            } else {
                let mut cmd = Command::new("/bin/sh");
                cmd.arg("-c").arg(&script);
            }
        }

        trace!(target: "batchrun.exec.shell", %script, "spawn");
        Ok(spawn_and_wait(cmd, inv, on_spawn, self.name).await?)
    }
}
