mod config;
mod error;
mod format;
mod log;

pub use config::LoggerConfig;
pub use error::LoggerError;
pub use format::LoggerFormat;
pub use log::LOG_ENV;

/// Install the process-wide subscriber described by `cfg`.
///
/// Fails with [`LoggerError::AlreadyInitialized`] when another subscriber is already global.
pub fn logger_init(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    log::install(cfg)
}
