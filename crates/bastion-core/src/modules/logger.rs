//! Logging setup.
//!
//! Console output (pretty or JSON) plus an optional daily-rolling log file,
//! filtered by `RUST_LOG` or the configured level.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

const LOG_FILE_PREFIX: &str = "bastion.log";

#[derive(Debug, Clone)]
pub struct LoggerOptions {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `info` or `bastion_core=debug`
    pub level: String,
    pub json: bool,
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false, log_dir: None }
    }
}

/// `RUST_LOG` wins over `level`; an unparsable level falls back to `info`.
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be kept alive
/// for the lifetime of the process.
pub fn init_logger(options: &LoggerOptions) -> Result<Option<WorkerGuard>, String> {
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    let mut guard = None;

    if options.json {
        layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(false)
                .boxed(),
        );
    } else {
        layers.push(tracing_subscriber::fmt::layer().with_target(true).boxed());
    }

    if let Some(dir) = &options.log_dir {
        std::fs::create_dir_all(dir)
            .map_err(|e| format!("Failed to create log directory {}: {}", dir.display(), e))?;
        let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        layers.push(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer).boxed());
        guard = Some(file_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(build_filter(&options.level))
        .try_init()
        .map_err(|e| format!("Failed to install tracing subscriber: {}", e))?;

    tracing::debug!(level = %options.level, json = options.json, "Logger initialized");
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_accepts_directives() {
        let filter = build_filter("bastion_core=debug,warn");
        assert!(!filter.to_string().is_empty());
    }

    #[test]
    fn test_default_options() {
        let options = LoggerOptions::default();
        assert_eq!(options.level, "info");
        assert!(!options.json && options.log_dir.is_none());
    }
}
