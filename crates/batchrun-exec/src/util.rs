use std::{fs::File, path::Path, process::Stdio};

use batchrun_core::{ExitReport, Invocation};
use tokio::process::Command;
use tracing::{debug, trace};

use crate::error::{ExecError, ExecResult};

pub fn cmd_program(program: &str, args: &[String]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args.iter().map(|s| s.as_str()));
    cmd
}

fn open_log(path: &Path) -> ExecResult<Stdio> {
    File::create(path)
        .map(Stdio::from)
        .map_err(|e| ExecError::Output {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Point `cmd` at the invocation's directory, environment and log files.
///
/// The child sees exactly `inv.env`; nothing is inherited from this process.
pub fn attach(cmd: &mut Command, inv: &Invocation) -> ExecResult<()> {
    cmd.current_dir(&inv.cwd)
        .env_clear()
        .envs(inv.env.iter())
        .stdin(Stdio::null())
        .stdout(open_log(&inv.stdout)?)
        .stderr(open_log(&inv.stderr)?);
    Ok(())
}

/// Spawn, report the pid, then wait for exit.
pub async fn spawn_and_wait(
    mut cmd: Command,
    inv: &Invocation,
    on_spawn: &mut (dyn FnMut(u32) + Send),
    target: &'static str,
) -> ExecResult<ExitReport> {
    attach(&mut cmd, inv)?;

    let mut child = cmd.spawn().map_err(|e| ExecError::Spawn(e.to_string()))?;
    // Only `None` once the child has been reaped, which cannot have happened yet.
    let pid = child.id().unwrap_or_default();
    trace!(target: "batchrun.exec", runner = target, pid, "spawned");
    on_spawn(pid);

    let status = child
        .wait()
        .await
        .map_err(|e| ExecError::Wait(e.to_string()))?;

    match status.code() {
        Some(code) => debug!(target: "batchrun.exec", runner = target, pid, code, "exited"),
        None => debug!(target: "batchrun.exec", runner = target, pid, "terminated by signal"),
    }
    Ok(ExitReport {
        pid,
        code: status.code(),
    })
}
