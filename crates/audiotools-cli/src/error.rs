//! Mapping of failures to process exit codes.

use std::process::ExitCode;

use audiotools_core::Error;
use tracing::{error, warn};

use crate::logging::LoggingError;

/// Exit status when only the delete phase failed.
pub const EXIT_DELETES_FAILED: u8 = 2;

/// Errors surfaced by the `audiotools` binary.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Logging could not be set up.
    #[error(transparent)]
    Logging(#[from] LoggingError),

    /// A core operation failed.
    #[error(transparent)]
    Core(#[from] Error),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }

    const fn exit_status(&self) -> u8 {
        match self {
            Self::Core(e) if !e.is_fatal() => EXIT_DELETES_FAILED,
            _ => 1,
        }
    }

    /// Command line of a failed device-bridge call.
    fn failed_command(&self) -> Option<&str> {
        match self {
            Self::Core(Error::Subprocess(e)) => Some(e.command()),
            _ => None,
        }
    }

    /// Log the error and return the exit code.
    pub fn report(&self) -> ExitCode {
        match self {
            Self::Core(e) if !e.is_fatal() => warn!("{e}"),
            Self::Core(e) => match self.failed_command() {
                Some(command) => error!(command, "[kind={:?}] {e}", e.kind()),
                None => error!("[kind={:?}] {e}", e.kind()),
            },
            Self::Logging(e) => eprintln!("{e}"),
        }
        self.exit_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audiotools_core::{SubprocessError, TaskFailures};

    #[test]
    fn test_delete_failure_exits_with_two() {
        let mut failures = TaskFailures::default();
        failures.push("/dest/a.mp3", Error::Configuration("x".to_string()));
        let err = CliError::from(Error::DeletePhase(failures));
        assert_eq!(err.exit_status(), EXIT_DELETES_FAILED);
    }

    #[test]
    fn test_fatal_errors_exit_with_one() {
        let err = CliError::from(Error::UnsupportedMode("ftp".to_string()));
        assert_eq!(err.exit_status(), 1);

        let err = CliError::from(Error::CopyPhase(TaskFailures::default()));
        assert_eq!(err.exit_status(), 1);
    }

    #[test]
    fn test_failed_command_names_subprocess() {
        let err = CliError::from(Error::from(SubprocessError::SpawnFailed {
            command: "adb shell ls -p1 /sdcard".to_string(),
            reason: "not found".to_string(),
        }));
        assert_eq!(err.failed_command(), Some("adb shell ls -p1 /sdcard"));
        assert_eq!(err.exit_status(), 1);

        let err = CliError::from(Error::UnsupportedMode("ftp".to_string()));
        assert_eq!(err.failed_command(), None);
    }

    #[test]
    fn test_logging_error_exits_with_one() {
        let err = CliError::from(LoggingError::InitFailed("twice".to_string()));
        assert_eq!(err.exit_status(), 1);
    }
}
