use std::io::IsTerminal;

use crate::logger::format::LoggerFormat;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    /// Level for `batchrun.*` targets.
    pub level: String,
    /// Level for every other target.
    pub deps_level: String,
    /// Extra `EnvFilter` directives appended after the two levels, e.g. `"batchrun.pool=trace"`.
    pub directives: Vec<String>,
    pub with_targets: bool,
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        let use_color = cfg!(test) || std::io::stdout().is_terminal();
        Self {
            format: LoggerFormat::default(),
            level: "info".to_string(),
            deps_level: "warn".to_string(),
            directives: Vec::new(),
            with_targets: true,
            use_color,
        }
    }
}

impl LoggerConfig {
    pub fn with_format(mut self, format: LoggerFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_deps_level(mut self, level: impl Into<String>) -> Self {
        self.deps_level = level.into();
        self
    }

    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    pub fn with_color(mut self, use_color: bool) -> Self {
        self.use_color = use_color;
        self
    }
}
