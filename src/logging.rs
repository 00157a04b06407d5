//! Structured logging setup.
//!
//! Configured once at startup from `BRRTR_LOG_*` environment variables or
//! from the runtime mode:
//!
//! | Variable                     | Default (prod) | Default (dev) |
//! |------------------------------|----------------|---------------|
//! | `BRRTR_LOG_LEVEL`            | `info`         | `debug`       |
//! | `BRRTR_LOG_FORMAT`           | `json`         | `pretty`      |
//! | `BRRTR_LOG_ASYNC`            | `true`         | `false`       |
//! | `BRRTR_LOG_TARGET_FILTER`    | unset          | unset         |
//! | `BRRTR_LOG_INCLUDE_LOCATION` | `false`        | `true`        |
//!
//! `RUST_LOG`, when set, takes precedence over `BRRTR_LOG_LEVEL`.

use std::env;

use anyhow::{Context, Result};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::runtime_config::RuntimeMode;

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// trace/debug/info/warn/error
    pub log_level: String,
    pub format: LogFormat,
    /// Write through a background thread
    pub async_logging: bool,
    /// Extra filter directives (comma-separated)
    pub target_filter: Option<String>,
    /// Include file:line location
    pub include_location: bool,
}

impl LogConfig {
    /// Defaults for `mode`
    #[must_use]
    pub fn for_mode(mode: RuntimeMode) -> Self {
        if mode.is_dev() {
            Self {
                log_level: "debug".to_string(),
                format: LogFormat::Pretty,
                async_logging: false,
                target_filter: None,
                include_location: true,
            }
        } else {
            Self {
                log_level: "info".to_string(),
                format: LogFormat::Json,
                async_logging: true,
                target_filter: None,
                include_location: false,
            }
        }
    }

    /// Mode defaults overridden by `BRRTR_LOG_*` environment variables
    #[must_use]
    pub fn from_env(mode: RuntimeMode) -> Self {
        Self::from_lookup(mode, |key| env::var(key).ok())
    }

    fn from_lookup(mode: RuntimeMode, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::for_mode(mode);
        let flag = |key: &str, default: bool| {
            lookup(key)
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(default)
        };
        Self {
            log_level: lookup("BRRTR_LOG_LEVEL").unwrap_or(defaults.log_level),
            format: lookup("BRRTR_LOG_FORMAT")
                .map(|s| LogFormat::parse(&s))
                .unwrap_or(defaults.format),
            async_logging: flag("BRRTR_LOG_ASYNC", defaults.async_logging),
            target_filter: lookup("BRRTR_LOG_TARGET_FILTER").filter(|s| !s.trim().is_empty()),
            include_location: flag("BRRTR_LOG_INCLUDE_LOCATION", defaults.include_location),
        }
    }

    fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let mut filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level().as_str()));
        if let Some(target_filter) = &self.target_filter {
            for directive in target_filter.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                match directive.parse() {
                    Ok(directive) => filter = filter.add_directive(directive),
                    Err(_) => eprintln!("Warning: Invalid log filter directive: {directive}"),
                }
            }
        }
        filter
    }
}

/// Install the global subscriber.
///
/// With async logging the returned guard flushes buffered lines when dropped;
/// keep it alive for the lifetime of the process.
pub fn init_logging_with_config(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let (writer, guard) = if config.async_logging {
        let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(non_blocking), Some(guard))
    } else {
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(std::io::stdout), None)
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_list(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_mode_defaults() {
        let dev = LogConfig::for_mode(RuntimeMode::Dev);
        assert_eq!(dev.log_level, "debug");
        assert_eq!(dev.format, LogFormat::Pretty);
        assert!(!dev.async_logging);
        assert!(dev.include_location);

        let prod = LogConfig::for_mode(RuntimeMode::Prod);
        assert_eq!(prod.log_level, "info");
        assert_eq!(prod.format, LogFormat::Json);
        assert!(prod.async_logging);
    }

    #[test]
    fn test_env_overrides_mode_defaults() {
        let config = LogConfig::from_lookup(
            RuntimeMode::Prod,
            lookup(&[
                ("BRRTR_LOG_FORMAT", "PRETTY"),
                ("BRRTR_LOG_ASYNC", "false"),
                ("BRRTR_LOG_TARGET_FILTER", "brrtrouter_controller=trace"),
            ]),
        );
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(!config.async_logging);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.target_filter.as_deref(), Some("brrtrouter_controller=trace"));
    }

    #[test]
    fn test_unparseable_flag_keeps_default() {
        let config = LogConfig::from_lookup(RuntimeMode::Dev, lookup(&[("BRRTR_LOG_ASYNC", "maybe")]));
        assert!(!config.async_logging);
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("PRETTY"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("invalid"), LogFormat::Json);
    }

    #[test]
    fn test_level_fallback() {
        let mut config = LogConfig::for_mode(RuntimeMode::Prod);
        config.log_level = "verbose".to_string();
        assert_eq!(config.level(), Level::INFO);
        config.log_level = "WARN".to_string();
        assert_eq!(config.level(), Level::WARN);
    }
}
