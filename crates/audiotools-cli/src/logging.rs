//! Structured logging using tracing.
//!
//! Provides:
//! - Console output with human-readable formatting, INFO by default
//! - Optional file output with JSON formatting and rotation
//! - `RUST_LOG` override for the console filter
//!
//! # Example
//!
//! ```rust,ignore
//! let config = LoggingConfig::for_verbosity(true).with_log_directory(dir);
//! let _guard = logging::init(&config)?;
//! tracing::info!("ready");
//! ```

use std::path::PathBuf;

use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose events reach the console at the configured level.
const OWN_TARGETS: [&str; 2] = ["audiotools", "audiotools_core"];

/// Log rotation strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogRotation {
    /// Rotate logs every hour.
    Hourly,
    /// Rotate logs every day.
    #[default]
    Daily,
    /// Never rotate.
    Never,
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Hourly => Self::HOURLY,
            LogRotation::Daily => Self::DAILY,
            LogRotation::Never => Self::NEVER,
        }
    }
}

/// Logging configuration options.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory for JSON log files. Console only when `None`.
    pub log_directory: Option<PathBuf>,
    /// Log file name prefix (e.g., "audiotools" -> "audiotools.2026-01-15").
    pub log_file_prefix: String,
    /// Maximum log level for console output.
    pub console_level: Level,
    /// Maximum log level for file output.
    pub file_level: Level,
    /// Log rotation strategy.
    pub rotation: LogRotation,
    /// Whether to include ANSI color codes in console output.
    pub console_ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_directory: None,
            log_file_prefix: "audiotools".to_string(),
            console_level: Level::INFO,
            file_level: Level::DEBUG,
            rotation: LogRotation::Daily,
            console_ansi: true,
        }
    }
}

impl LoggingConfig {
    /// Console at DEBUG when `verbose`, INFO otherwise.
    #[must_use]
    pub fn for_verbosity(verbose: bool) -> Self {
        let level = if verbose { Level::DEBUG } else { Level::INFO };
        Self::default().with_console_level(level)
    }

    /// Also write JSON logs into `path`.
    #[must_use]
    pub fn with_log_directory(mut self, path: Option<PathBuf>) -> Self {
        self.log_directory = path;
        self
    }

    /// Set the console log level.
    #[must_use]
    pub const fn with_console_level(mut self, level: Level) -> Self {
        self.console_level = level;
        self
    }
}

/// Guard that keeps file logging active. Drop this to flush and close log files.
pub struct LoggingGuard {
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Initialize the logging system with the given configuration.
///
/// Keep the returned guard alive until exit so pending file entries get
/// flushed.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or a global
/// subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard, LoggingError> {
    let console_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => own_crates_filter(config.console_level)?,
    };

    let console_layer = fmt::layer()
        .with_ansi(config.console_ansi)
        .with_target(false)
        .without_time()
        .with_filter(console_filter);

    let (file_layer, file_guard) = match &config.log_directory {
        Some(dir) => {
            if !dir.exists() {
                std::fs::create_dir_all(dir).map_err(|e| {
                    LoggingError::DirectoryCreationFailed {
                        path: dir.clone(),
                        reason: e.to_string(),
                    }
                })?;
            }

            let file_appender =
                RollingFileAppender::new(config.rotation.into(), dir, &config.log_file_prefix);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .json()
                .with_filter(own_crates_filter(config.file_level)?);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::InitFailed(e.to_string()))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// WARN for dependencies, `level` for our own crates.
fn own_crates_filter(level: Level) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(filter_directives(level))
        .map_err(|e| LoggingError::InvalidFilter(e.to_string()))
}

fn filter_directives(level: Level) -> String {
    let directive = level_to_directive(level);
    std::iter::once("warn".to_string())
        .chain(OWN_TARGETS.iter().map(|target| format!("{target}={directive}")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Convert a tracing Level to a filter directive string.
const fn level_to_directive(level: Level) -> &'static str {
    match level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    }
}

/// Errors that can occur during logging initialization.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// Failed to create log directory.
    #[error("Failed to create log directory {path}: {reason}")]
    DirectoryCreationFailed {
        /// The path that could not be created.
        path: PathBuf,
        /// The reason for the failure.
        reason: String,
    },

    /// A filter directive did not parse.
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    /// A global subscriber was already installed.
    #[error("Failed to initialize logging: {0}")]
    InitFailed(String),
}
