//! Tracing subscriber setup.
//!
//! Installs a `tracing-subscriber` registry with:
//! - an `EnvFilter` (`RUST_LOG` overrides the configured level)
//! - a stderr layer with local timestamps
//! - an optional non-blocking file layer via `tracing-appender`
//!
//! Keep the returned [`LoggingGuard`] alive for the lifetime of the program;
//! dropping it flushes and stops the file writer.

use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::UtcOffset;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{LoggingSettings, DEFAULT_LOG_LEVEL};

/// Errors that can occur while installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The filter directive could not be parsed.
    #[error("Invalid log filter {filter:?}: {reason}")]
    Filter { filter: String, reason: String },

    /// The log file directory could not be created.
    #[error("Failed to create log directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A global subscriber is already installed.
    #[error("Failed to install log subscriber: {0}")]
    Init(String),
}

/// Logging options resolved from config and CLI flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Optional log file.
    pub file: Option<PathBuf>,
    /// Raise the level to `debug`.
    pub verbose: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
            verbose: false,
        }
    }
}

impl LoggingConfig {
    /// Build from the `[logging]` section of the config file.
    pub fn from_settings(settings: &LoggingSettings) -> Self {
        Self {
            level: settings.level.clone(),
            file: settings.file.clone(),
            verbose: false,
        }
    }

    /// Set verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Filter directive after applying verbose mode.
    pub fn directive(&self) -> String {
        if self.verbose {
            "debug".to_string()
        } else {
            self.level.clone()
        }
    }
}

/// Keeps the non-blocking file writer alive.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Install the global tracing subscriber.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    let directive = config.directive();
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(env) if !env.trim().is_empty() => EnvFilter::try_new(&env).map_err(|e| {
            LoggingError::Filter {
                filter: env.clone(),
                reason: e.to_string(),
            }
        })?,
        _ => EnvFilter::try_new(&directive).map_err(|e| LoggingError::Filter {
            filter: directive.clone(),
            reason: e.to_string(),
        })?,
    };

    let timer = OffsetTime::local_rfc_3339().unwrap_or_else(|_| OffsetTime::new(UtcOffset::UTC, Rfc3339));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(timer.clone())
        .with_target(false);

    let (file_layer, file_guard) = match &config.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            fs::create_dir_all(&dir).map_err(|source| LoggingError::CreateDir {
                path: dir.clone(),
                source,
            })?;
            let file_name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "framestream.log".into());

            let appender = tracing_appender::rolling::never(&dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(timer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_overrides_level() {
        let config = LoggingConfig::default();
        assert_eq!(config.directive(), "warn");
        assert_eq!(config.with_verbose(true).directive(), "debug");
    }

    #[test]
    fn test_from_settings() {
        let settings = LoggingSettings {
            level: "framestream=info".to_string(),
            file: Some(PathBuf::from("/tmp/fs.log")),
        };
        let config = LoggingConfig::from_settings(&settings);
        assert_eq!(config.directive(), "framestream=info");
        assert_eq!(config.file, Some(PathBuf::from("/tmp/fs.log")));
    }
}
