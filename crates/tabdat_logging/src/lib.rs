//! Tracing subscriber setup for programs embedding tabdat.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const DEFAULT_LOG_FILTER: &str = "tabdat_core=info,tabdat_xls=info";
const VERBOSE_LOG_FILTER: &str = "tabdat_core=debug,tabdat_xls=debug";

/// Logging configuration.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Prefix of the daily log files (`{app_name}.log.YYYY-MM-DD`).
    pub app_name: String,
    /// Debug output from the tabdat crates on stderr.
    pub verbose: bool,
    /// Directive string used instead of `RUST_LOG` and the default.
    pub filter: Option<String>,
    /// Directory for daily log files. `None` logs to stderr only.
    pub log_dir: Option<PathBuf>,
}

impl LogConfig {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            ..Self::default()
        }
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    fn file_name(&self) -> String {
        let name = if self.app_name.is_empty() {
            "tabdat"
        } else {
            self.app_name.as_str()
        };
        format!("{}.log", name)
    }
}

/// Install the global subscriber: stderr plus an optional daily log file.
///
/// File output goes through a background writer; keep the returned guard
/// alive until exit or buffered lines are lost. Fails if a global
/// subscriber is already set.
pub fn init_logging(config: LogConfig) -> Result<Option<WorkerGuard>> {
    let mut guard = None;
    let file_layer = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, config.file_name());
            let (writer, worker) = tracing_appender::non_blocking(appender);
            guard = Some(worker);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_filter(build_filter(&config, false)?),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(build_filter(&config, config.verbose)?),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

/// Route logs through the test harness's captured output. Safe to call from
/// every test; only the first call installs anything.
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

fn build_filter(config: &LogConfig, verbose: bool) -> Result<EnvFilter> {
    if let Some(directives) = &config.filter {
        return EnvFilter::try_new(directives)
            .with_context(|| format!("Invalid log filter: {}", directives));
    }
    if verbose {
        return Ok(EnvFilter::new(VERBOSE_LOG_FILTER));
    }
    Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_file_name_defaults() {
        assert_eq!(LogConfig::new("diet").file_name(), "diet.log");
        assert_eq!(LogConfig::default().file_name(), "tabdat.log");
    }

    #[test]
    fn test_invalid_filter_is_reported() {
        let config = LogConfig::new("app").with_filter("tabdat_core=notalevel");
        assert!(build_filter(&config, false).is_err());
        assert!(init_logging(config).is_err());
    }

    #[test]
    fn test_init_logging_writes_file_once() {
        let dir = TempDir::new().unwrap();
        let log_dir = dir.path().join("logs");
        let config = LogConfig::new("tabdat-test")
            .with_log_dir(&log_dir)
            .with_filter("info");

        let guard = init_logging(config.clone()).unwrap();
        assert!(guard.is_some());
        tracing::info!("factory ready");
        drop(guard);

        let contents: String = fs::read_dir(&log_dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with("tabdat-test.log"))
            })
            .map(|path| fs::read_to_string(path).unwrap())
            .collect();
        assert!(contents.contains("factory ready"));

        // A second global subscriber is refused
        assert!(init_logging(config).is_err());
    }
}
