mod command;
pub use command::Command;

mod task;
pub use task::{HookError, PreHook, TaskSpec};
