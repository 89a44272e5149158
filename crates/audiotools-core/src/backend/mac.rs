//! Backend for a directory on a mounted macOS volume.
//!
//! File operations are the same as [`LocalBackend`]'s. On top of that the
//! backend refuses to work under `/Volumes/<name>` while that volume is not
//! mounted, and it never reports Finder/Spotlight metadata as destination
//! files, so those are never scheduled for deletion.

use std::path::{Component, Path, PathBuf};

use tracing::debug;

use super::{LocalBackend, SyncBackend};
use crate::error::{Error, Result};
use crate::path::{KeySet, RelativeKey};
use crate::sync::ExecutionOptions;

/// Entries macOS creates on removable volumes.
const VOLUME_METADATA: &[&str] = &[
    ".DS_Store",
    ".Spotlight-V100",
    ".Trashes",
    ".fseventsd",
    ".TemporaryItems",
];

/// Sync into a directory that may live on another mounted volume.
#[derive(Debug, Clone)]
pub struct MacBackend {
    inner: LocalBackend,
    volume: Option<PathBuf>,
}

impl MacBackend {
    /// Create a backend rooted at `dest_root`.
    pub fn new(dest_root: impl Into<PathBuf>) -> Self {
        let inner = LocalBackend::new(dest_root);
        let volume = volume_root(inner.dest_root());
        Self { inner, volume }
    }

    fn ensure_mounted(&self) -> Result<()> {
        match &self.volume {
            Some(volume) if !volume.is_dir() => Err(Error::VolumeNotMounted(volume.clone())),
            _ => Ok(()),
        }
    }
}

impl SyncBackend for MacBackend {
    fn name(&self) -> &'static str {
        "mac"
    }

    fn list(&self, options: &ExecutionOptions) -> Result<KeySet> {
        self.ensure_mounted()?;
        let mut keys = self.inner.list_as(self.name(), options)?;
        keys.retain(|key| {
            let keep = !is_volume_metadata(key);
            if !keep {
                debug!("mac: ignoring volume metadata {key}");
            }
            keep
        });
        Ok(keys)
    }

    fn copy(&self, src: &Path, dest: &str, options: &ExecutionOptions) -> Result<()> {
        self.ensure_mounted()?;
        self.inner.copy_as(self.name(), src, dest, options)
    }

    fn remove(&self, path: &str, options: &ExecutionOptions) -> Result<()> {
        self.ensure_mounted()?;
        self.inner.remove_as(self.name(), path, options)
    }

    fn to_dest_path(&self, key: &RelativeKey) -> String {
        self.inner.to_dest_path(key)
    }
}

fn volume_root(dest: &Path) -> Option<PathBuf> {
    let mut components = dest.components();
    match (components.next(), components.next(), components.next()) {
        (Some(Component::RootDir), Some(Component::Normal(volumes)), Some(Component::Normal(name)))
            if volumes == "Volumes" =>
        {
            Some(Path::new("/Volumes").join(name))
        }
        _ => None,
    }
}

fn is_volume_metadata(key: &RelativeKey) -> bool {
    key.as_str()
        .split('/')
        .any(|seg| seg.starts_with("._") || VOLUME_METADATA.contains(&seg))
}
