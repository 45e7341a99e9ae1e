use thiserror::Error;

/// Failure to install the process-wide tracing subscriber.
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("invalid logger format {0:?} (expected text, json or journald)")]
    InvalidFormat(String),
    #[error("journald output needs Linux and the `journald` feature")]
    JournaldNotSupported,
    #[error("a global subscriber is already installed")]
    AlreadyInitialized,
    #[error("failed to initialize logger: {0}")]
    InitializationFailed(String),
    #[error("invalid log filter {0:?}")]
    InvalidLogLevel(String),
}
