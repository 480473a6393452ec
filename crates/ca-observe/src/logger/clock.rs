use std::{
    fmt,
    str::FromStr,
    sync::OnceLock,
};

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset, format_description::well_known::Rfc3339};
use tracing_subscriber::fmt::{format::Writer, time::FormatTime};

use crate::LoggerError;

/// Local offset captured once at startup.
static LOCAL_OFFSET: OnceLock<UtcOffset> = OnceLock::new();

/// Timezone of log timestamps.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LogTimeZone {
    #[default]
    Utc,
    Local,
}

impl FromStr for LogTimeZone {
    type Err = LoggerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utc" => Ok(Self::Utc),
            "local" => Ok(Self::Local),
            _ => Err(LoggerError::InvalidTimeZone(s.to_string())),
        }
    }
}

impl TryFrom<String> for LogTimeZone {
    type Error = LoggerError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<LogTimeZone> for String {
    fn from(tz: LogTimeZone) -> Self {
        tz.to_string()
    }
}

impl fmt::Display for LogTimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogTimeZone::Utc => "utc",
            LogTimeZone::Local => "local",
        })
    }
}

/// Captures the local UTC offset.
///
/// Must run before any other thread is spawned (i.e. before the tokio runtime
/// starts): most Unix platforms refuse to read the offset from a
/// multi-threaded process. Falls back to UTC if detection fails.
pub fn capture_local_offset() -> UtcOffset {
    *LOCAL_OFFSET.get_or_init(|| UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC))
}

/// RFC 3339 timestamps in the configured timezone.
#[derive(Debug, Clone, Copy)]
pub struct LogTimer {
    offset: UtcOffset,
}

impl LogTimer {
    pub fn new(tz: LogTimeZone) -> Self {
        let offset = match tz {
            LogTimeZone::Utc => UtcOffset::UTC,
            LogTimeZone::Local => LOCAL_OFFSET.get().copied().unwrap_or(UtcOffset::UTC),
        };
        Self { offset }
    }

    pub fn offset(&self) -> UtcOffset {
        self.offset
    }
}

impl FormatTime for LogTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        let now = OffsetDateTime::now_utc().to_offset(self.offset);
        match now.format(&Rfc3339) {
            Ok(ts) => write!(w, "{ts}"),
            Err(_) => write!(w, "<invalid-time>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_timezones() {
        assert_eq!("UTC".parse::<LogTimeZone>().unwrap(), LogTimeZone::Utc);
        assert_eq!("local".parse::<LogTimeZone>().unwrap(), LogTimeZone::Local);
        assert!("pst".parse::<LogTimeZone>().is_err());
    }

    #[test]
    fn utc_timer_has_zero_offset() {
        assert_eq!(LogTimer::new(LogTimeZone::Utc).offset(), UtcOffset::UTC);
    }

    #[test]
    fn captured_offset_is_stable() {
        let first = capture_local_offset();
        assert_eq!(capture_local_offset(), first);
        assert_eq!(LogTimer::new(LogTimeZone::Local).offset(), first);
    }
}
