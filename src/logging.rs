//! Structured logging setup using the `tracing` ecosystem.
//!
//! Configures a `tracing-subscriber` with either JSON output (for
//! production) or pretty-printed output (for TTY / local dev). Format
//! is auto-detected from the terminal but can be forced via `--json`
//! or `--pretty`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::LogLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[must_use]
pub fn resolve_format(pretty: bool, json: bool) -> LogFormat {
    if json {
        LogFormat::Json
    } else if pretty || std::io::IsTerminal::is_terminal(&std::io::stdout()) {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

/// Debug mode never logs less than `debug`.
#[must_use]
pub fn resolve_level(level: &LogLevel, debug: bool) -> tracing::Level {
    let level = level.to_tracing_level();
    if debug && level < tracing::Level::DEBUG {
        tracing::Level::DEBUG
    } else {
        level
    }
}

pub fn init(level: tracing::Level, format: LogFormat) {
    let filter = tracing_subscriber::filter::Targets::new().with_default(level);

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_target(false))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_wins() {
        assert_eq!(resolve_format(false, true), LogFormat::Json);
    }

    #[test]
    fn debug_raises_quiet_levels() {
        assert_eq!(resolve_level(&LogLevel::Warn, true), tracing::Level::DEBUG);
        assert_eq!(resolve_level(&LogLevel::Warn, false), tracing::Level::WARN);
        assert_eq!(resolve_level(&LogLevel::Trace, true), tracing::Level::TRACE);
    }
}
