//! Sync orchestrator.
//!
//! Wires a [`SyncConfig`] to its backend and runs one sync:
//!
//! 1. Resolve the backend for `config.mode`
//! 2. Read the playlist into a [`KeySet`]
//! 3. List the destination into a [`KeySet`]
//! 4. Reconcile the two sets into copy and delete tasks
//! 5. Run the copy phase, then the delete phase
//!
//! Listing and reading failures abort before anything is touched: a plan
//! computed against a partial key set would delete files that should stay.
//! Failed copies are fatal and also skip the delete phase. Failed deletes are
//! reported but never roll anything back.
//!
//! # Example
//!
//! ```rust,ignore
//! use audiotools_core::sync::{ExecutionOptions, SyncOrchestrator};
//!
//! let orchestrator = SyncOrchestrator::new(config)?;
//! let report = orchestrator.run(&ExecutionOptions::default())?;
//! println!("{report}");
//! ```

use std::fmt;
use std::path::Path;

use tracing::{debug, error, info};

use crate::backend::{SyncBackend, resolve_backend};
use crate::config::SyncConfig;
use crate::error::{Error, Result, TaskFailures};
use crate::path::KeySet;
use crate::playlist::read_playlist;
use crate::reconcile::{SyncPlan, reconcile};

// =============================================================================
// Execution Options
// =============================================================================

/// What to do when a task inside a phase fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Stop the phase at the first failure.
    #[default]
    AbortOnFirst,
    /// Attempt every task and report all failures together.
    CollectAll,
}

/// Per-run flags threaded through the orchestrator and every backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecutionOptions {
    /// Log key sets and full task lists.
    pub verbose: bool,
    /// Announce copies and removals instead of performing them.
    pub dry_run: bool,
    /// Failure handling within a phase.
    pub error_policy: ErrorPolicy,
}

impl ExecutionOptions {
    /// Options for a dry run.
    #[must_use]
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Default::default()
        }
    }

    /// Set verbose output.
    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set dry-run mode.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set the error policy.
    #[must_use]
    pub const fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }
}

// =============================================================================
// Sync Report
// =============================================================================

/// Outcome of a successful sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    /// Copy tasks in the plan.
    pub planned_copies: usize,
    /// Delete tasks in the plan.
    pub planned_deletes: usize,
    /// Copies performed (or announced, in a dry run).
    pub copied: usize,
    /// Deletes performed (or announced, in a dry run).
    pub deleted: usize,
    /// Whether this was a dry run.
    pub dry_run: bool,
}

impl SyncReport {
    /// Whether the destination already matched the playlist.
    pub const fn was_in_sync(&self) -> bool {
        self.planned_copies == 0 && self.planned_deletes == 0
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.was_in_sync() {
            return write!(f, "Already in sync");
        }
        write!(
            f,
            "Copied {}/{} files, deleted {}/{} files",
            self.copied, self.planned_copies, self.deleted, self.planned_deletes
        )?;
        if self.dry_run {
            write!(f, " (dry run)")?;
        }
        Ok(())
    }
}

// =============================================================================
// Sync Orchestrator
// =============================================================================

/// Runs a sync for one configuration.
pub struct SyncOrchestrator {
    config: SyncConfig,
    backend: Box<dyn SyncBackend>,
}

impl fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("config", &self.config)
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl SyncOrchestrator {
    /// Create an orchestrator with the backend selected by `config.mode`.
    pub fn new(config: SyncConfig) -> Result<Self> {
        let backend = resolve_backend(&config)?;
        Ok(Self::with_backend(config, backend))
    }

    /// Create an orchestrator with an explicit backend.
    pub fn with_backend(config: SyncConfig, backend: Box<dyn SyncBackend>) -> Self {
        Self { config, backend }
    }

    /// Read both sides and compute the plan without executing it.
    pub fn plan(&self, options: &ExecutionOptions) -> Result<SyncPlan> {
        let source = read_playlist(&self.config.source_playlist, &self.config.source_base_dir)?;
        if options.verbose {
            info!("playlist: {}", format_keys(&source));
        }

        let dest = self.backend.list(options)?;
        if options.verbose {
            info!("destination files: {}", format_keys(&dest));
        }

        Ok(reconcile(
            &source,
            &dest,
            Path::new(&self.config.source_base_dir),
            self.backend.as_ref(),
        ))
    }

    /// Run the sync.
    pub fn run(&self, options: &ExecutionOptions) -> Result<SyncReport> {
        info!(
            "Syncing {} to {} ({})",
            self.config.source_playlist.display(),
            self.config.dest_dir,
            self.backend.name()
        );

        let plan = self.plan(options)?;
        let mut report = SyncReport {
            planned_copies: plan.copies.len(),
            planned_deletes: plan.deletes.len(),
            dry_run: options.dry_run,
            ..Default::default()
        };

        info!(
            "{} files to copy, {} files to delete",
            plan.copies.len(),
            plan.deletes.len()
        );

        if options.verbose {
            for task in &plan.copies {
                info!("  copy {task}");
            }
        }
        let (copied, failures) = run_phase(&plan.copies, options.error_policy, |task| {
            self.backend.copy(&task.source, &task.dest, options)
        });
        report.copied = copied;
        if !failures.is_empty() {
            error!(
                "{} of {} copies failed, skipping deletes",
                failures.len(),
                plan.copies.len()
            );
            return Err(Error::CopyPhase(failures));
        }

        if options.verbose {
            for task in &plan.deletes {
                info!("  delete {task}");
            }
        }
        let (deleted, failures) = run_phase(&plan.deletes, options.error_policy, |task| {
            self.backend.remove(&task.dest, options)
        });
        report.deleted = deleted;
        if !failures.is_empty() {
            error!("{} of {} deletes failed", failures.len(), plan.deletes.len());
            return Err(Error::DeletePhase(failures));
        }

        debug!("Sync finished: {report:?}");
        Ok(report)
    }
}

/// Resolve the backend for `config` and run one sync.
pub fn run(config: SyncConfig, options: &ExecutionOptions) -> Result<SyncReport> {
    SyncOrchestrator::new(config)?.run(options)
}

/// Execute every task in order, returning the success count and failures.
fn run_phase<T, F>(tasks: &[T], policy: ErrorPolicy, mut op: F) -> (usize, TaskFailures)
where
    T: fmt::Display,
    F: FnMut(&T) -> Result<()>,
{
    let mut done = 0;
    let mut failures = TaskFailures::default();
    for task in tasks {
        match op(task) {
            Ok(()) => done += 1,
            Err(e) => {
                error!("Failed: {task}: {e}");
                failures.push(task.to_string(), e);
                if policy == ErrorPolicy::AbortOnFirst {
                    break;
                }
            }
        }
    }
    (done, failures)
}

fn format_keys(keys: &KeySet) -> String {
    let joined = keys
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{joined}] ({} files)", keys.len())
}
