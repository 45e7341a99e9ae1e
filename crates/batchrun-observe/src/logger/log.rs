//! Subscriber assembly.
//!
//! All formats share one filter: `batchrun.*` targets log at [`LoggerConfig::level`], every other
//! target at [`LoggerConfig::deps_level`], followed by any extra directives. A non-empty
//! [`LOG_ENV`] variable replaces the whole directive string.
//!
//! The launcher opens a `launcher{run_id}` span and one `task{index, identifier}` span per task.
//! Text output prints them as a `launcher{..}:task{..}:` prefix; json output carries the
//! innermost one under `"span"` and the chain under `"spans"`.
use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing::Subscriber;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, MakeWriter, time::OffsetTime},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

use crate::logger::{config::LoggerConfig, error::LoggerError, format::LoggerFormat};

/// Environment variable overriding the configured directives, e.g. `BATCHRUN_LOG=batchrun.pool=trace`.
pub const LOG_ENV: &str = "BATCHRUN_LOG";

/// Target prefix shared by every event the batchrun crates emit.
const TARGET_ROOT: &str = "batchrun";

pub(crate) fn install(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    let filter = env_filter(cfg)?;
    match cfg.format {
        LoggerFormat::Text => init_with(
            tracing_subscriber::registry()
                .with(filter)
                .with(text_layer(cfg, std::io::stdout)),
        ),
        LoggerFormat::Json => init_with(
            tracing_subscriber::registry()
                .with(filter)
                .with(json_layer(cfg, std::io::stdout)),
        ),
        LoggerFormat::Journald => journald(filter),
    }
}

/// Directive string built from `cfg`, ignoring [`LOG_ENV`].
pub(crate) fn directives(cfg: &LoggerConfig) -> String {
    let mut out = format!("{},{TARGET_ROOT}={}", cfg.deps_level, cfg.level);
    for extra in &cfg.directives {
        out.push(',');
        out.push_str(extra);
    }
    out
}

fn env_filter(cfg: &LoggerConfig) -> Result<EnvFilter, LoggerError> {
    let raw = match std::env::var(LOG_ENV) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => directives(cfg),
    };
    parse_filter(&raw)
}

fn parse_filter(raw: &str) -> Result<EnvFilter, LoggerError> {
    EnvFilter::builder()
        .parse(raw)
        .map_err(|_| LoggerError::InvalidLogLevel(raw.to_string()))
}

fn text_layer<S, W>(cfg: &LoggerConfig, writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .with_ansi(cfg.use_color)
        .with_target(cfg.with_targets)
        .with_timer(local_timer())
        .with_writer(writer)
}

fn json_layer<S, W>(cfg: &LoggerConfig, writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .with_span_list(true)
        .with_target(cfg.with_targets)
        .with_timer(local_timer())
        .with_writer(writer)
}

fn local_timer() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

fn init_with<S>(subscriber: S) -> Result<(), LoggerError>
where
    S: Subscriber + Send + Sync + 'static,
{
    subscriber.try_init().map_err(|e| {
        let msg = e.to_string();
        if msg.contains("SetGlobalDefaultError") || msg.contains("global default trace dispatcher") {
            LoggerError::AlreadyInitialized
        } else {
            LoggerError::InitializationFailed(msg)
        }
    })
}

#[cfg(all(target_os = "linux", feature = "journald"))]
fn journald(filter: EnvFilter) -> Result<(), LoggerError> {
    let layer = tracing_journald::layer()
        .map_err(|e| LoggerError::InitializationFailed(format!("journald: {e}")))?
        .with_syslog_identifier(TARGET_ROOT.to_string());
    init_with(tracing_subscriber::registry().with(filter).with(layer))
}

#[cfg(not(all(target_os = "linux", feature = "journald")))]
fn journald(_filter: EnvFilter) -> Result<(), LoggerError> {
    Err(LoggerError::JournaldNotSupported)
}
