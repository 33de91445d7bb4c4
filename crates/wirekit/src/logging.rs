//! Log output for tools and demos built on wirekit.
//!
//! The libraries only emit `tracing` events; nothing is printed until a
//! subscriber is installed. `WIREKIT_LOG` selects the level and
//! `WIREKIT_LOG_FORMAT` selects `text` or `json`.

use std::str::FromStr;

use tracing::level_filters::LevelFilter;

pub const LEVEL_ENV: &str = "WIREKIT_LOG";
pub const FORMAT_ENV: &str = "WIREKIT_LOG_FORMAT";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized {kind}: {value}")]
pub struct ParseLogError {
    kind: &'static str,
    value: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ParseLogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(ParseLogError {
                kind: "log format",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ParseLogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(ParseLogError {
                kind: "log level",
                value: s.to_string(),
            }),
        }
    }
}

/// Install a stderr subscriber. Does nothing if one is already installed.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level.as_filter())
        .with_ansi(false)
        .with_target(false);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}

/// [`init_logging`] configured from the environment. Unset or
/// unrecognized values fall back to text output at `warn`.
pub fn init_from_env() {
    let level = std::env::var(LEVEL_ENV)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or_default();
    let format = std::env::var(FORMAT_ENV)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or_default();
    init_logging(format, level);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_levels_and_formats() {
        assert_eq!("DEBUG".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert_eq!(" warning ".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));

        let err = "loud".parse::<LogLevel>().unwrap_err();
        assert_eq!(err.to_string(), "unrecognized log level: loud");
    }

    #[test]
    fn levels_map_to_filters() {
        assert_eq!(LogLevel::Trace.as_filter(), LevelFilter::TRACE);
        assert_eq!(LogLevel::default().as_filter(), LevelFilter::WARN);
    }
}
