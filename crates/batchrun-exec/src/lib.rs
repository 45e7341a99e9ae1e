mod error;
pub use error::{ExecError, ExecResult};

mod util;

#[cfg(feature = "proc")]
pub mod proc;
#[cfg(feature = "proc")]
pub use proc::ProcRunner;
#[cfg(feature = "shell")]
pub use proc::shell::ShellRunner;

pub mod prelude {
    pub use crate::error::{ExecError, ExecResult};
    #[cfg(feature = "proc")]
    pub use crate::ProcRunner;
    #[cfg(feature = "shell")]
    pub use crate::ShellRunner;
}
