//! Logging system initialization
//!
//! Uses the tracing ecosystem for structured logging with support for:
//! - Environment variable override (WEBTERM_LOG)
//! - Console output on stderr (stdout carries rendered terminal output)
//! - File output with daily rotation

use std::path::PathBuf;
use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::config::LoggingConfig;

/// Environment variable overriding the configured filter
pub const LOG_ENV: &str = "WEBTERM_LOG";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
    Compact,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "compact" => LogFormat::Compact,
            _ => LogFormat::Pretty,
        }
    }
}

/// Parse log level from string
pub fn parse_level(s: &str) -> Level {
    match s.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Get the default log directory path
fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("webterm")
        .join("logs")
}

/// Directory for rolling log files, with `~` expanded
fn log_dir(config: &LoggingConfig) -> PathBuf {
    match &config.file_path {
        Some(path) => {
            let raw = path.to_string_lossy();
            PathBuf::from(shellexpand::tilde(&raw).as_ref())
        }
        None => default_log_dir(),
    }
}

fn console_layer<S>(config: &LoggingConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_file(config.file_line)
        .with_line_number(config.file_line);

    match (LogFormat::parse(&config.format), config.timestamps) {
        (LogFormat::Json, true) => layer.json().boxed(),
        (LogFormat::Json, false) => layer.json().without_time().boxed(),
        (LogFormat::Compact, true) => layer.compact().boxed(),
        (LogFormat::Compact, false) => layer.compact().without_time().boxed(),
        (LogFormat::Pretty, true) => layer.pretty().boxed(),
        (LogFormat::Pretty, false) => layer.pretty().without_time().boxed(),
    }
}

/// Initialize the global subscriber.
///
/// Returns the file writer guard when file output is enabled; keep it alive
/// for the life of the process or buffered lines are lost.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let level = parse_level(&config.level);
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(format!("webterm={}", level.as_str().to_lowercase())));

    let mut guard = None;
    let file_layer = if config.file_output {
        let log_dir = log_dir(config);

        if let Err(e) = std::fs::create_dir_all(&log_dir) {
            eprintln!("Warning: Failed to create log directory {:?}: {}", log_dir, e);
            None
        } else {
            let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "webterm.log");
            let (writer, file_guard) = tracing_appender::non_blocking(file_appender);
            guard = Some(file_guard);

            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_span_events(FmtSpan::CLOSE);

            Some(file_layer.boxed())
        }
    } else {
        None
    };

    let result = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer(config))
        .with(file_layer)
        .try_init();

    if let Err(e) = result {
        eprintln!("Warning: Logging already initialized: {e}");
        return guard;
    }

    tracing::debug!(
        level = %level,
        format = ?LogFormat::parse(&config.format),
        file_output = config.file_output,
        "Logging initialized"
    );

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("unknown"), LogFormat::Pretty);
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("trace"), Level::TRACE);
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("info"), Level::INFO);
        assert_eq!(parse_level("warn"), Level::WARN);
        assert_eq!(parse_level("warning"), Level::WARN);
        assert_eq!(parse_level("error"), Level::ERROR);
        assert_eq!(parse_level("unknown"), Level::INFO);
    }

    #[test]
    fn test_default_log_dir() {
        assert!(default_log_dir().ends_with("webterm/logs"));
    }

    #[test]
    fn test_log_dir_expands_tilde() {
        let config = LoggingConfig {
            file_path: Some(PathBuf::from("~/webterm-logs")),
            ..LoggingConfig::default()
        };
        let dir = log_dir(&config);
        assert!(dir.ends_with("webterm-logs"));
        if dirs::home_dir().is_some() {
            assert!(!dir.starts_with("~"));
        }

        assert_eq!(log_dir(&LoggingConfig::default()), default_log_dir());
    }
}
