mod clock;
mod config;
mod error;
mod format;
mod level;

pub use clock::{LogTimeZone, LogTimer, capture_local_offset};
pub use config::LogConfig;
pub use error::{LoggerError, LoggerResult};
pub use format::LogFormat;
pub use level::LogLevel;

use tracing::Subscriber;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global `tracing` subscriber described by `cfg`.
///
/// For [`LogTimeZone::Local`] call [`capture_local_offset`] before starting the
/// async runtime; otherwise timestamps fall back to UTC.
pub fn init_logger(cfg: &LogConfig) -> LoggerResult<()> {
    let filter = cfg.level.to_env_filter();
    let timer = LogTimer::new(cfg.tz);

    match cfg.format {
        LogFormat::Text => {
            let layer = fmt::layer()
                .with_ansi(cfg.ansi())
                .with_target(cfg.with_targets)
                .with_timer(timer);
            install(tracing_subscriber::registry().with(filter).with(layer))
        }
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_ansi(false)
                .with_target(cfg.with_targets)
                .with_timer(timer);
            install(tracing_subscriber::registry().with(filter).with(layer))
        }
        LogFormat::Journald => journald(filter),
    }
}

#[cfg(target_os = "linux")]
fn journald(filter: tracing_subscriber::EnvFilter) -> LoggerResult<()> {
    let layer =
        tracing_journald::layer().map_err(|e| LoggerError::JournaldInitFailed(e.to_string()))?;
    install(tracing_subscriber::registry().with(filter).with(layer))
}

#[cfg(not(target_os = "linux"))]
fn journald(_filter: tracing_subscriber::EnvFilter) -> LoggerResult<()> {
    Err(LoggerError::JournaldNotSupported)
}

fn install<S>(subscriber: S) -> LoggerResult<()>
where
    S: Subscriber + Send + Sync + 'static,
{
    subscriber
        .try_init()
        .map_err(|_| LoggerError::AlreadyInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_reports_already_initialized() {
        let cfg = LogConfig {
            use_color: false,
            ..Default::default()
        };
        // The first call may race other tests in this binary; only the
        // outcome of the second call is deterministic.
        let _ = init_logger(&cfg);
        assert!(matches!(
            init_logger(&cfg),
            Err(LoggerError::AlreadyInitialized)
        ));
    }
}
