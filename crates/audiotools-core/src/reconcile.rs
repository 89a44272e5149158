//! Set reconciliation between the playlist and the destination.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::backend::SyncBackend;
use crate::path::{KeySet, RelativeKey};

/// A file that must be copied to the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyTask {
    /// Key the task was derived from.
    pub key: RelativeKey,
    /// Absolute source path.
    pub source: PathBuf,
    /// Destination path as understood by the backend.
    pub dest: String,
}

impl fmt::Display for CopyTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source.display(), self.dest)
    }
}

/// A file that must be removed from the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteTask {
    /// Key the task was derived from.
    pub key: RelativeKey,
    /// Destination path as understood by the backend.
    pub dest: String,
}

impl fmt::Display for DeleteTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dest)
    }
}

/// Everything a sync has to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    /// Files in the playlist but missing at the destination.
    pub copies: Vec<CopyTask>,
    /// Files at the destination that are not in the playlist.
    pub deletes: Vec<DeleteTask>,
}

impl SyncPlan {
    /// Whether source and destination already match.
    pub fn is_empty(&self) -> bool {
        self.copies.is_empty() && self.deletes.is_empty()
    }
}

/// Compute the copy and delete tasks that make `dest` equal to `source`.
///
/// Keys present on both sides produce no task. Task order follows key order
/// but callers must not rely on it.
pub fn reconcile<B>(
    source: &KeySet,
    dest: &KeySet,
    source_base_dir: &Path,
    backend: &B,
) -> SyncPlan
where
    B: SyncBackend + ?Sized,
{
    let copies = source
        .difference(dest)
        .map(|key| CopyTask {
            key: key.clone(),
            source: key.to_local_path(source_base_dir),
            dest: backend.to_dest_path(key),
        })
        .collect();

    let deletes = dest
        .difference(source)
        .map(|key| DeleteTask {
            key: key.clone(),
            dest: backend.to_dest_path(key),
        })
        .collect();

    SyncPlan { copies, deletes }
}
