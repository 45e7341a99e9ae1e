pub mod error;
pub use error::{CoreError, PoolError};
pub mod launcher;
pub use launcher::{Launcher, LauncherConfig, RunReport};
pub mod pool;
pub use pool::{Allocation, ResourcePool};
pub mod provenance;
pub use provenance::ProvenanceWriter;
pub mod runner;
pub use runner::{ExitReport, Invocation, Runner, RunnerError};
pub mod state;
pub use state::{BoardEntry, TaskBoard};
pub mod system;
