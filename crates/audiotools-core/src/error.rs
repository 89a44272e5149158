//! Error types for audiotools core operations.
//!
//! Errors are grouped by domain. Every variant keeps enough context (paths,
//! command lines, captured output) to diagnose a failure without re-running
//! the tool in verbose mode.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by local filesystem access.
#[derive(Debug, Error)]
pub enum FileSystemError {
    /// The path does not exist.
    #[error("not found: {path}")]
    NotFound {
        /// Missing path.
        path: PathBuf,
    },

    /// Reading a file or directory failed.
    #[error("failed to read {path}: {reason}")]
    ReadFailed {
        /// Path being read.
        path: PathBuf,
        /// Underlying cause.
        reason: String,
    },

    /// Writing a file failed.
    #[error("failed to write {path}: {reason}")]
    WriteFailed {
        /// Path being written.
        path: PathBuf,
        /// Underlying cause.
        reason: String,
    },

    /// Creating a directory failed.
    #[error("failed to create dir {path}: {reason}")]
    CreateDirFailed {
        /// Directory being created.
        path: PathBuf,
        /// Underlying cause.
        reason: String,
    },

    /// Deleting a file failed.
    #[error("failed to remove file {path}: {reason}")]
    DeleteFailed {
        /// File being removed.
        path: PathBuf,
        /// Underlying cause.
        reason: String,
    },

    /// Copying a file failed.
    #[error("failed to copy file {source_path} -> {destination}: {reason}")]
    CopyFailed {
        /// Copy source.
        source_path: PathBuf,
        /// Copy destination.
        destination: PathBuf,
        /// Underlying cause.
        reason: String,
    },

    /// Walking a directory tree failed.
    #[error("failed to walk {path}: {reason}")]
    WalkFailed {
        /// Directory being walked.
        path: PathBuf,
        /// Underlying cause.
        reason: String,
    },
}

/// Errors raised while running the device-bridge tool.
#[derive(Debug, Error)]
pub enum SubprocessError {
    /// The program could not be started at all.
    #[error("failed to start command `{command}`: {reason}")]
    SpawnFailed {
        /// Full command line.
        command: String,
        /// Underlying cause.
        reason: String,
    },

    /// The program exited unsuccessfully.
    #[error("command `{command}` failed ({status})\nstdout: {stdout}\nstderr: {stderr}")]
    Failed {
        /// Full command line.
        command: String,
        /// Exit status description.
        status: String,
        /// Captured standard output.
        stdout: String,
        /// Captured standard error.
        stderr: String,
    },
}

impl SubprocessError {
    /// The command line that failed.
    pub fn command(&self) -> &str {
        match self {
            Self::SpawnFailed { command, .. } | Self::Failed { command, .. } => command,
        }
    }
}

/// A single task that failed during a sync phase.
#[derive(Debug)]
pub struct TaskFailure {
    /// Human readable description of the task (e.g. `a.mp3 -> /dest/a.mp3`).
    pub task: String,
    /// Why it failed.
    pub error: Box<Error>,
}

/// All failures collected during one sync phase.
#[derive(Debug, Default)]
pub struct TaskFailures(pub Vec<TaskFailure>);

impl TaskFailures {
    /// Number of failed tasks.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no task failed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Record a failure.
    pub fn push(&mut self, task: impl Into<String>, error: Error) {
        self.0.push(TaskFailure {
            task: task.into(),
            error: Box::new(error),
        });
    }
}

impl fmt::Display for TaskFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} task(s) failed", self.0.len())?;
        for failure in &self.0 {
            write!(f, "\n  {}: {}", failure.task, failure.error)?;
        }
        Ok(())
    }
}

/// Coarse error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Local filesystem failure.
    FileSystem,
    /// Device-bridge subprocess failure.
    Subprocess,
    /// Unknown backend mode.
    UnsupportedMode,
    /// Path could not be relativized.
    PathResolution,
    /// Invalid or missing configuration.
    Configuration,
    /// One or more sync tasks failed.
    Sync,
}

/// Errors that can occur in audiotools core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Local filesystem error.
    #[error(transparent)]
    FileSystem(#[from] FileSystemError),

    /// Device-bridge subprocess error.
    #[error(transparent)]
    Subprocess(#[from] SubprocessError),

    /// The configured backend mode is not known.
    #[error("unsupported mode: {0}")]
    UnsupportedMode(String),

    /// A path could not be expressed relative to its root.
    #[error("failed to get relative path of {path} from {base}")]
    PathResolution {
        /// Path being relativized.
        path: String,
        /// Root it was expected under.
        base: String,
    },

    /// The destination volume is not mounted.
    #[error("volume not mounted: {0}")]
    VolumeNotMounted(PathBuf),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Configuration file could not be parsed.
    #[error("failed to parse config file {path}: {reason}")]
    ConfigParse {
        /// Config file path.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// Copy phase failed.
    #[error("failed to copy files: {0}")]
    CopyPhase(TaskFailures),

    /// Delete phase failed.
    #[error("failed to remove files: {0}")]
    DeletePhase(TaskFailures),
}

impl Error {
    /// Category of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::FileSystem(_) | Self::VolumeNotMounted(_) => ErrorKind::FileSystem,
            Self::Subprocess(_) => ErrorKind::Subprocess,
            Self::UnsupportedMode(_) => ErrorKind::UnsupportedMode,
            Self::PathResolution { .. } => ErrorKind::PathResolution,
            Self::Configuration(_) | Self::ConfigParse { .. } => ErrorKind::Configuration,
            Self::CopyPhase(_) | Self::DeletePhase(_) => ErrorKind::Sync,
        }
    }

    /// Whether the error must terminate the process.
    ///
    /// Only delete-phase failures are non-fatal: copies already made stay in
    /// place and nothing is rolled back.
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::DeletePhase(_))
    }
}
