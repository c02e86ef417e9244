//! Logging configuration for LiteKV
//!
//! Diagnostics go through the `tracing` framework. Audit events from the
//! default [`TracingAuditSink`](litekv_core::TracingAuditSink) use the
//! `litekv::audit` target, so `RUST_LOG=litekv::audit=info` isolates them.

use litekv_core::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// Default log file name when the configured path has none
const DEFAULT_LOG_FILE: &str = "litekv.log";

/// Log output destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    /// Output to stdout
    Stdout,
    /// Output to a daily-rotated file
    File(PathBuf),
    /// Output to both stdout and file
    Both(PathBuf),
}

/// Log format style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line format
    Pretty,
    /// Compact single-line format (default)
    Compact,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Output destination
    pub output: LogOutput,
    /// Format style
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            output: LogOutput::Stdout,
            format: LogFormat::Compact,
        }
    }
}

impl LogConfig {
    /// Info level, stdout
    pub fn info() -> Self {
        Self::default()
    }

    /// Debug level; shows every commit and load
    pub fn debug() -> Self {
        Self::default().with_level("debug")
    }

    /// Warn level; gated calls and failures only
    pub fn warn() -> Self {
        Self::default().with_level("warn")
    }

    /// Log to a daily-rotated file
    pub fn with_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = LogOutput::File(path.into());
        self
    }

    /// Log to stdout and a daily-rotated file
    pub fn with_both<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output = LogOutput::Both(path.into());
        self
    }

    /// Set log format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the filter directive (e.g. `"litekv=debug"`)
    pub fn with_level<S: Into<String>>(mut self, level: S) -> Self {
        self.level = level.into();
        self
    }

    fn filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .map_err(|e| Error::Configuration(format!("invalid log filter {:?}: {}", self.level, e)))
    }

    /// Install the global subscriber.
    ///
    /// Returns a guard for file output; keep it alive for as long as logs
    /// should be flushed. Fails if the filter is invalid or a global
    /// subscriber is already installed.
    ///
    /// ```rust,no_run
    /// use litekv::logging::LogConfig;
    ///
    /// let _guard = LogConfig::info().with_file("logs/litekv.log").init()?;
    /// # Ok::<(), litekv::Error>(())
    /// ```
    pub fn init(self) -> Result<Option<WorkerGuard>> {
        let (subscriber, guard) = self.build()?;
        subscriber.try_init().map_err(init_error)?;
        Ok(guard)
    }

    /// Assemble the subscriber without installing it.
    fn build(self) -> Result<(impl Subscriber + Send + Sync + 'static, Option<WorkerGuard>)> {
        let env_filter = self.filter()?;

        let mut layers: Vec<BoxedLayer> = Vec::new();
        let mut guard = None;
        match &self.output {
            LogOutput::Stdout => layers.push(stdout_layer(self.format)),
            LogOutput::File(path) => {
                let (writer, file_guard) = file_writer(path);
                layers.push(file_layer(writer, self.format));
                guard = Some(file_guard);
            }
            LogOutput::Both(path) => {
                let (writer, file_guard) = file_writer(path);
                layers.push(stdout_layer(self.format));
                layers.push(file_layer(writer, self.format));
                guard = Some(file_guard);
            }
        }

        let subscriber = tracing_subscriber::registry().with(layers).with(env_filter);
        Ok((subscriber, guard))
    }
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn stdout_layer(format: LogFormat) -> BoxedLayer {
    match format {
        LogFormat::Pretty => Box::new(fmt::layer().pretty()),
        LogFormat::Compact => Box::new(fmt::layer().compact()),
    }
}

fn file_layer(writer: NonBlocking, format: LogFormat) -> BoxedLayer {
    let layer = fmt::layer().with_writer(writer).with_ansi(false);
    match format {
        LogFormat::Pretty => Box::new(layer.pretty()),
        LogFormat::Compact => Box::new(layer.compact()),
    }
}

fn file_writer(path: &Path) -> (NonBlocking, WorkerGuard) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_LOG_FILE);
    tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, file_name))
}

fn init_error(e: tracing_subscriber::util::TryInitError) -> Error {
    Error::Configuration(format!("failed to install log subscriber: {e}"))
}
