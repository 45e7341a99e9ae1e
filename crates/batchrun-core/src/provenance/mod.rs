//! On-disk provenance for one task's io directory.
//!
//! Layout:
//! ```text
//! <io_dir>/
//!   task_description.json          cwd + command, written before spawn
//!   stdout-<stamp>.log
//!   stderr-<stamp>.log
//!   FAST_EXIT                      only when the task finished suspiciously fast
//!   <provenance_dir>/
//!     full_description.json        ExecutionRecord, rewritten at every checkpoint
//!     command.sh                   re-runnable rendering of the command
//! ```
//! Every file is replaced atomically (write to a sibling temp file, then rename).
use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Serialize;
use time::{OffsetDateTime, UtcOffset, macros::format_description};

use batchrun_model::ExecutionRecord;

use crate::error::CoreError;

pub const TASK_DESCRIPTION_FILE: &str = "task_description.json";
pub const RECORD_FILE: &str = "full_description.json";
pub const COMMAND_FILE: &str = "command.sh";
pub const FAST_EXIT_FILE: &str = "FAST_EXIT";

#[derive(Serialize)]
struct TaskDescription<'a> {
    cmd_str: &'a str,
    cwd: &'a Path,
    cmd_list: &'a [String],
}

/// Writes the provenance files of a single task.
#[derive(Debug, Clone)]
pub struct ProvenanceWriter {
    io_dir: PathBuf,
    provenance_dir: PathBuf,
}

impl ProvenanceWriter {
    pub fn new(io_dir: impl Into<PathBuf>, provenance_dir: impl AsRef<Path>) -> Self {
        let io_dir = io_dir.into();
        let provenance_dir = io_dir.join(provenance_dir);
        Self {
            io_dir,
            provenance_dir,
        }
    }

    pub fn io_dir(&self) -> &Path {
        &self.io_dir
    }

    pub fn record_path(&self) -> PathBuf {
        self.provenance_dir.join(RECORD_FILE)
    }

    pub fn command_path(&self) -> PathBuf {
        self.provenance_dir.join(COMMAND_FILE)
    }

    pub fn task_description_path(&self) -> PathBuf {
        self.io_dir.join(TASK_DESCRIPTION_FILE)
    }

    pub fn fast_exit_path(&self) -> PathBuf {
        self.io_dir.join(FAST_EXIT_FILE)
    }

    /// Output log paths qualified by `stamp`, see [`log_stamp`].
    pub fn log_paths(&self, stamp: &str) -> (PathBuf, PathBuf) {
        (
            self.io_dir.join(format!("stdout-{stamp}.log")),
            self.io_dir.join(format!("stderr-{stamp}.log")),
        )
    }

    /// Create the io and provenance directories. Existing directories are fine.
    pub fn prepare(&self) -> Result<(), CoreError> {
        fs::create_dir_all(&self.provenance_dir).map_err(|source| CoreError::Provenance {
            path: self.provenance_dir.clone(),
            source,
        })
    }

    pub fn write_task_description(&self, record: &ExecutionRecord) -> Result<(), CoreError> {
        let desc = TaskDescription {
            cmd_str: &record.cmd_str,
            cwd: &record.cwd,
            cmd_list: &record.cmd_list,
        };
        write_json(&self.task_description_path(), &desc)
    }

    pub fn write_record(&self, record: &ExecutionRecord) -> Result<(), CoreError> {
        write_json(&self.record_path(), record)
    }

    /// Shell script that re-runs the command in the same directory with the same resources.
    pub fn write_command(&self, record: &ExecutionRecord, selector_var: &str) -> Result<(), CoreError> {
        let selector = record.env.get(selector_var).unwrap_or_default();
        let script = format!(
            "#!/bin/sh\n# {ident}\ncd {cwd} || exit 1\nexport {var}={sel}\n{cmd}\n",
            ident = record.identifier.replace('\n', " "),
            cwd = shell_quote(&record.cwd.to_string_lossy()),
            var = selector_var,
            sel = shell_quote(selector),
            cmd = record.cmd_str,
        );
        write_atomic(&self.command_path(), script.as_bytes())
    }

    pub fn write_fast_exit(&self, elapsed: Duration, threshold: Duration) -> Result<(), CoreError> {
        let body = format!(
            "finished in {} ms (threshold {} ms)\n",
            elapsed.as_millis(),
            threshold.as_millis()
        );
        write_atomic(&self.fast_exit_path(), body.as_bytes())
    }
}

/// Local timestamp used to keep log files of repeated runs apart, e.g. `20240131-235959-123`.
pub fn log_stamp() -> String {
    let now = local_now();
    now.format(format_description!(
        "[year][month][day]-[hour][minute][second]-[subsecond digits:3]"
    ))
    .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

pub fn local_now() -> OffsetDateTime {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetDateTime::now_utc().to_offset(offset)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), CoreError> {
    let mut bytes = serde_json::to_vec_pretty(value).map_err(|e| CoreError::Provenance {
        path: path.to_path_buf(),
        source: io::Error::other(e),
    })?;
    bytes.push(b'\n');
    write_atomic(path, &bytes)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CoreError> {
    let tmp = match path.file_name() {
        Some(name) => path.with_file_name(format!(".{}.tmp", name.to_string_lossy())),
        None => path.with_extension("tmp"),
    };
    fs::write(&tmp, bytes)
        .and_then(|_| fs::rename(&tmp, path))
        .map_err(|source| CoreError::Provenance {
            path: path.to_path_buf(),
            source,
        })
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
