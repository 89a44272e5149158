//! Backend for an Android device driven through the `adb` command line tool.
//!
//! Every operation is one subprocess call:
//!
//! - list: `adb shell "ls -p1 '<dir>'"` per directory, breadth first
//! - copy: `adb push <src> <dest>`
//! - remove: `adb shell "rm '<path>'"`
//!
//! `ls -p1` prints one entry per line and suffixes directories with `/`.
//! Paths are single-quoted for the remote shell with [`shell_quote`].

use std::collections::VecDeque;
use std::path::Path;
use std::process::Command;

use tracing::debug;

use super::{SyncBackend, announce_copy, announce_remove};
use crate::error::{Result, SubprocessError};
use crate::path::{KeySet, RelativeKey, normalize_exact};
use crate::sync::ExecutionOptions;

/// Bridge program used when the config does not name one.
pub const DEFAULT_BRIDGE_COMMAND: &str = "adb";

/// Runs an external program and returns its standard output.
///
/// A non-zero exit must surface as [`SubprocessError::Failed`] carrying the
/// command line and both captured streams.
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner {
    /// Run `program` with `args` to completion.
    fn run(&self, program: &str, args: &[String]) -> Result<String>;
}

/// [`CommandRunner`] backed by `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<String> {
        let command = render_command(program, args);
        debug!("Executing command: {command}");

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| SubprocessError::SpawnFailed {
                command: command.clone(),
                reason: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            return Err(SubprocessError::Failed {
                command,
                status: output.status.to_string(),
                stdout,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }
            .into());
        }
        Ok(stdout)
    }
}

fn render_command(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Wrap `s` in single quotes for a POSIX shell.
///
/// Embedded single quotes become `'\''`.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Sync to a device through the bridge tool.
#[derive(Debug, Clone)]
pub struct DeviceBridgeBackend<R = ProcessRunner> {
    program: String,
    dest_root: String,
    runner: R,
}

impl DeviceBridgeBackend<ProcessRunner> {
    /// Create a backend that runs `program` for every operation.
    pub fn new(program: impl Into<String>, dest_root: impl Into<String>) -> Self {
        Self::with_runner(program, dest_root, ProcessRunner)
    }
}

impl<R: CommandRunner> DeviceBridgeBackend<R> {
    /// Create a backend with a custom command runner.
    pub fn with_runner(
        program: impl Into<String>,
        dest_root: impl Into<String>,
        runner: R,
    ) -> Self {
        Self {
            program: program.into(),
            dest_root: dest_root.into(),
            runner,
        }
    }

    fn shell(&self, script: String) -> Result<String> {
        self.runner.run(&self.program, &["shell".to_string(), script])
    }
}

impl<R: CommandRunner> SyncBackend for DeviceBridgeBackend<R> {
    fn name(&self) -> &'static str {
        "adb"
    }

    fn list(&self, options: &ExecutionOptions) -> Result<KeySet> {
        let mut files = KeySet::new();
        let root = match self.dest_root.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        let mut pending = VecDeque::from([root.to_string()]);
        let mut visited = 0usize;

        while let Some(dir) = pending.pop_front() {
            visited += 1;
            let listing = self.shell(format!("ls -p1 {}", shell_quote(&dir)))?;

            for line in listing.lines() {
                let entry = line.trim_end_matches('\r');
                if entry.is_empty() {
                    continue;
                }
                if let Some(sub) = entry.strip_suffix('/') {
                    pending.push_back(format!("{dir}/{sub}"));
                } else if let Some(key) = normalize_exact(&format!("{dir}/{entry}"), &self.dest_root)? {
                    files.insert(key);
                }
            }
        }

        debug!(
            "adb: found {} files in {visited} directories under {}",
            files.len(),
            self.dest_root
        );
        if options.verbose {
            debug!("adb: destination files {files:?}");
        }
        Ok(files)
    }

    fn copy(&self, src: &Path, dest: &str, options: &ExecutionOptions) -> Result<()> {
        if options.dry_run {
            announce_copy(self.name(), src, dest);
            return Ok(());
        }
        self.runner.run(
            &self.program,
            &[
                "push".to_string(),
                src.to_string_lossy().into_owned(),
                dest.to_string(),
            ],
        )?;
        Ok(())
    }

    fn remove(&self, path: &str, options: &ExecutionOptions) -> Result<()> {
        if options.dry_run {
            announce_remove(self.name(), path);
            return Ok(());
        }
        self.shell(format!("rm {}", shell_quote(path)))?;
        Ok(())
    }

    fn to_dest_path(&self, key: &RelativeKey) -> String {
        key.to_remote_path(&self.dest_root)
    }
}
