use std::{io, path::PathBuf};

use thiserror::Error;

use crate::runner::RunnerError;

/// Misuse of a [`crate::ResourcePool`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("resource pool must hold at least one token")]
    Empty,
    #[error("requested zero tokens")]
    ZeroQuantity,
    #[error("requested {requested} tokens but the pool only holds {capacity}")]
    ExceedsCapacity { requested: usize, capacity: usize },
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("resource pool: {0}")]
    Pool(#[from] PoolError),

    #[error("pre-hook failed: {0}")]
    PreHook(String),

    #[error("cannot resolve working directory {path}: {source}")]
    Cwd {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Provenance {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("runner: {0}")]
    Runner(#[from] RunnerError),

    #[error("failed to build runtime: {0}")]
    Runtime(#[source] io::Error),
}
