use std::time::Duration;

/// Variable that tells CUDA programs which devices they may use.
pub const CUDA_VISIBLE_DEVICES: &str = "CUDA_VISIBLE_DEVICES";

#[derive(Debug, Clone)]
pub struct LauncherConfig {
    /// Environment variable that receives the comma-joined granted tokens.
    pub selector_var: String,
    /// Tasks finishing faster than this get a `FAST_EXIT` marker in their io directory.
    pub fast_exit_threshold: Duration,
    /// Upper bound between availability re-checks while waiting on the pool.
    pub poll_interval: Duration,
    /// Name of the provenance subdirectory inside each io directory.
    pub provenance_dir: String,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            selector_var: CUDA_VISIBLE_DEVICES.to_string(),
            fast_exit_threshold: Duration::from_secs(10),
            poll_interval: Duration::from_millis(500),
            provenance_dir: "provenance".to_string(),
        }
    }
}

impl LauncherConfig {
    pub fn with_selector_var(mut self, var: impl Into<String>) -> Self {
        self.selector_var = var.into();
        self
    }

    pub fn with_fast_exit_threshold(mut self, threshold: Duration) -> Self {
        self.fast_exit_threshold = threshold;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_provenance_dir(mut self, dir: impl Into<String>) -> Self {
        self.provenance_dir = dir.into();
        self
    }
}
