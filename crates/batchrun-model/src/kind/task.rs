use std::{fmt, num::NonZeroUsize, path::PathBuf, sync::Arc};

use crate::{Command, TaskEnv};

/// Error type a pre-hook may return.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Side-effecting callable run after resources are granted and before the subprocess starts.
///
/// Arguments, if any, are captured by the closure.
pub type PreHook = Arc<dyn Fn() -> Result<(), HookError> + Send + Sync>;

/// Immutable description of one unit of work.
///
/// Built with [`TaskSpec::new`] plus the `with_*` methods; the launcher only ever reads it.
#[derive(Clone)]
pub struct TaskSpec {
    command: Command,
    cwd: PathBuf,
    io_dir: PathBuf,
    identifier: Option<String>,
    env: TaskEnv,
    quantity: NonZeroUsize,
    pre_hook: Option<PreHook>,
}

impl TaskSpec {
    pub fn new(
        command: impl Into<Command>,
        cwd: impl Into<PathBuf>,
        io_dir: impl Into<PathBuf>,
    ) -> Self {
        // The default environment is the process environment at construction time.
        Self {
            command: command.into(),
            cwd: cwd.into(),
            io_dir: io_dir.into(),
            identifier: None,
            env: TaskEnv::inherited(),
            quantity: NonZeroUsize::MIN,
            pre_hook: None,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Replace the inherited process environment with an explicit one.
    pub fn with_env(mut self, env: TaskEnv) -> Self {
        self.env = env;
        self
    }

    /// Number of pool tokens the task needs while it runs.
    pub fn with_quantity(mut self, quantity: NonZeroUsize) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn with_pre_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.pre_hook = Some(Arc::new(hook));
        self
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn command_string(&self) -> String {
        self.command.command_string()
    }

    pub fn command_list(&self) -> Vec<String> {
        self.command.command_list()
    }

    pub fn cwd(&self) -> &PathBuf {
        &self.cwd
    }

    pub fn io_dir(&self) -> &PathBuf {
        &self.io_dir
    }

    /// Explicit identifier, or the canonical command string.
    pub fn identifier(&self) -> String {
        self.identifier
            .clone()
            .unwrap_or_else(|| self.command_string())
    }

    /// Declared environment, or the process environment captured by [`TaskSpec::new`].
    pub fn env(&self) -> &TaskEnv {
        &self.env
    }

    pub fn quantity(&self) -> usize {
        self.quantity.get()
    }

    /// Run the pre-hook; a spec without one is a no-op.
    pub fn run_pre_hook(&self) -> Result<(), HookError> {
        match &self.pre_hook {
            Some(hook) => hook(),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSpec")
            .field("command", &self.command)
            .field("cwd", &self.cwd)
            .field("io_dir", &self.io_dir)
            .field("identifier", &self.identifier)
            .field("env", &self.env.len())
            .field("quantity", &self.quantity)
            .field("pre_hook", &self.pre_hook.is_some())
            .finish()
    }
}
