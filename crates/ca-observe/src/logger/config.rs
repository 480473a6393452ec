use std::io::IsTerminal;

use serde::{Deserialize, Serialize};

use crate::{LogFormat, LogLevel, LogTimeZone};

/// Logger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    /// `EnvFilter` expression.
    pub level: LogLevel,
    pub tz: LogTimeZone,
    /// Include the module path of each record.
    pub with_targets: bool,
    /// Colorize text output; ignored when stdout is not a terminal.
    pub use_color: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::default(),
            tz: LogTimeZone::default(),
            with_targets: true,
            use_color: true,
        }
    }
}

impl LogConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_tz(mut self, tz: LogTimeZone) -> Self {
        self.tz = tz;
        self
    }

    pub(crate) fn ansi(&self) -> bool {
        self.use_color && std::io::stdout().is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let cfg: LogConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.format, LogFormat::Text);
        assert_eq!(cfg.level.as_str(), "info");
        assert_eq!(cfg.tz, LogTimeZone::Utc);
        assert!(cfg.with_targets);
        assert!(cfg.use_color);
    }

    #[test]
    fn partial_object_overrides() {
        let cfg: LogConfig =
            serde_json::from_str(r#"{"format": "json", "level": "ca_core=trace,warn"}"#).unwrap();
        assert_eq!(cfg.format, LogFormat::Json);
        assert_eq!(cfg.level.as_str(), "ca_core=trace,warn");
    }

    #[test]
    fn builders_chain() {
        let cfg = LogConfig::default()
            .with_format(LogFormat::Json)
            .with_level("debug".parse().unwrap())
            .with_tz(LogTimeZone::Local);
        assert_eq!(cfg.format, LogFormat::Json);
        assert_eq!(cfg.level.as_str(), "debug");
        assert_eq!(cfg.tz, LogTimeZone::Local);
    }
}
