//! Tracing subscriber setup.
//!
//! Console output always; a daily rolling file when a log directory is
//! configured. `RUST_LOG` overrides the configured level.

use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::LoggingSection;

const LOG_FILE_PREFIX: &str = "esimbot.log";

/// Errors installing the global subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter {filter:?}: {reason}")]
    Filter { filter: String, reason: String },

    #[error("failed to create log directory {path}: {source}")]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("a global subscriber is already installed: {0}")]
    AlreadyInstalled(String),
}

/// Keeps the file writer flushing. Drop it only at shutdown.
#[derive(Debug, Default)]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

fn env_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(filter) if !filter.is_empty() => {
            EnvFilter::try_new(&filter).map_err(|e| LoggingError::Filter {
                filter,
                reason: e.to_string(),
            })
        }
        _ => EnvFilter::try_new(level).map_err(|e| LoggingError::Filter {
            filter: level.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Install the global tracing subscriber.
pub fn init(config: &LoggingSection) -> Result<LogGuard, LoggingError> {
    let filter = env_filter(&config.level)?;

    let console = fmt::layer()
        .with_timer(LocalTime::rfc_3339())
        .with_target(false)
        .with_writer(std::io::stderr);

    let (file_layer, file_guard) = match &config.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory).map_err(|source| LoggingError::Directory {
                path: directory.clone(),
                source,
            })?;
            let appender = tracing_appender::rolling::daily(directory, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_timer(LocalTime::rfc_3339())
                .with_ansi(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInstalled(e.to_string()))?;

    Ok(LogGuard { _file: file_guard })
}
