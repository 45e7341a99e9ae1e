use std::path::PathBuf;

use batchrun_core::RunnerError;
use thiserror::Error;

pub type ExecResult<T> = Result<T, ExecError>;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("missing program")]
    MissingProgram,
    #[error("cannot open {path}: {reason}")]
    Output { path: PathBuf, reason: String },
    #[error("{0}")]
    Spawn(String),
    #[error("{0}")]
    Wait(String),
}

impl From<ExecError> for RunnerError {
    fn from(e: ExecError) -> Self {
        match e {
            ExecError::MissingProgram => RunnerError::InvalidCommand(e.to_string()),
            ExecError::Output { .. } => RunnerError::Output(e.to_string()),
            ExecError::Spawn(reason) => RunnerError::Spawn(reason),
            ExecError::Wait(reason) => RunnerError::Wait(reason),
        }
    }
}
