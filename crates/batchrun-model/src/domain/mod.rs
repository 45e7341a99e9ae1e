mod token;
pub use token::ResourceToken;

mod task_env;
pub use task_env::TaskEnv;

mod task_status;
pub use task_status::{TaskPhase, TaskStatus};

mod task_result;
pub use task_result::TaskResult;

mod record;
pub use record::{ExecutionRecord, HostInfo};
