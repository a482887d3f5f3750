//! Logging setup for the `repokeeper` binary.
//!
//! Every run logs to stderr (colored when attached to a terminal) and, unless
//! disabled, appends the same events without color codes to a log file.
//! The subscriber is installed once, from `main`, before any command runs.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::error::ExitError;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Everything needed to install the process-wide subscriber.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Filter used when neither `RUST_LOG` nor `-v` says otherwise.
    pub level: String,
    /// Count of `-v` flags: 1 is debug, 2 or more is trace.
    pub verbosity: u8,
    pub log_file: Option<PathBuf>,
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            verbosity: 0,
            log_file: None,
            ansi: false,
        }
    }
}

impl TelemetryConfig {
    /// `RUST_LOG` wins, then `-v`, then the configured level.
    pub fn directives(&self, rust_log: Option<&str>) -> String {
        match (rust_log.filter(|s| !s.trim().is_empty()), self.verbosity) {
            (Some(env), _) => env.to_string(),
            (None, 0) => self.level.clone(),
            (None, 1) => "debug".to_string(),
            (None, _) => "trace".to_string(),
        }
    }

    pub fn filter(&self, rust_log: Option<&str>) -> anyhow::Result<EnvFilter> {
        let directives = self.directives(rust_log);
        EnvFilter::try_new(&directives).map_err(|e| {
            ExitError::Config(format!("invalid log filter {directives:?}: {e}")).into()
        })
    }

    /// Install the global subscriber. Later calls are no-ops.
    pub fn init(&self) -> anyhow::Result<()> {
        let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
        let filter = self.filter(rust_log.as_deref())?;
        let timer = ChronoLocal::new(TIMESTAMP_FORMAT.to_owned());

        let console = fmt::layer()
            .with_writer(std::io::stderr)
            .with_timer(timer.clone())
            .with_target(false)
            .with_ansi(self.ansi);

        let file = match &self.log_file {
            Some(path) => {
                let handle = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("opening log file {}", path.display()))?;
                Some(
                    fmt::layer()
                        .with_writer(Mutex::new(handle))
                        .with_timer(timer)
                        .with_ansi(false),
                )
            }
            None => None,
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .with(file)
            .try_init()
            .ok();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_overrides_everything() {
        let config = TelemetryConfig {
            verbosity: 2,
            ..Default::default()
        };
        assert_eq!(config.directives(Some("repokeeper=warn")), "repokeeper=warn");
        assert!(config.filter(Some("repokeeper=warn")).is_ok());
    }

    #[test]
    fn verbosity_raises_level() {
        let mut config = TelemetryConfig::default();
        assert_eq!(config.directives(None), "info");
        config.verbosity = 1;
        assert_eq!(config.directives(None), "debug");
        config.verbosity = 3;
        assert_eq!(config.directives(Some("  ")), "trace");
    }

    #[test]
    fn invalid_level_is_config_error() {
        let config = TelemetryConfig {
            level: "repokeeper=loud".into(),
            ..Default::default()
        };
        let err = config.filter(None).unwrap_err();
        assert!(err.to_string().contains("invalid log filter"));
    }

    #[test]
    fn init_creates_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let config = TelemetryConfig {
            log_file: Some(path.clone()),
            ..Default::default()
        };
        config.init().unwrap();
        assert!(path.exists());
    }
}
