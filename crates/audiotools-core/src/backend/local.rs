//! Backend for a destination directory on this machine.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use super::{SyncBackend, announce_copy, announce_remove};
use crate::error::{Error, FileSystemError, Result};
use crate::path::{KeySet, RelativeKey, normalize_exact};
use crate::sync::ExecutionOptions;

/// Copies with plain filesystem calls into `dest_root`.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    dest_root: PathBuf,
}

impl LocalBackend {
    /// Create a backend rooted at `dest_root`.
    pub fn new(dest_root: impl Into<PathBuf>) -> Self {
        Self {
            dest_root: dest_root.into(),
        }
    }

    /// Destination root directory.
    pub fn dest_root(&self) -> &Path {
        &self.dest_root
    }

    pub(super) fn list_as(&self, backend: &str, options: &ExecutionOptions) -> Result<KeySet> {
        if !self.dest_root.exists() {
            if options.dry_run {
                debug!(
                    "{backend}: {} does not exist, nothing to list",
                    self.dest_root.display()
                );
                return Ok(KeySet::new());
            }
            fs::create_dir_all(&self.dest_root).map_err(|e| {
                FileSystemError::CreateDirFailed {
                    path: self.dest_root.clone(),
                    reason: e.to_string(),
                }
            })?;
        }
        list_files(&self.dest_root)
    }

    pub(super) fn copy_as(
        &self,
        backend: &str,
        src: &Path,
        dest: &str,
        options: &ExecutionOptions,
    ) -> Result<()> {
        if options.dry_run {
            announce_copy(backend, src, dest);
            return Ok(());
        }
        let bytes = copy_file_durable(src, Path::new(dest))?;
        debug!("{backend}: copied {bytes} bytes {} -> {dest}", src.display());
        Ok(())
    }

    pub(super) fn remove_as(
        &self,
        backend: &str,
        path: &str,
        options: &ExecutionOptions,
    ) -> Result<()> {
        if options.dry_run {
            announce_remove(backend, path);
            return Ok(());
        }
        fs::remove_file(path).map_err(|e| FileSystemError::DeleteFailed {
            path: PathBuf::from(path),
            reason: e.to_string(),
        })?;
        debug!("{backend}: removed {path}");
        Ok(())
    }
}

impl SyncBackend for LocalBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    fn list(&self, options: &ExecutionOptions) -> Result<KeySet> {
        self.list_as(self.name(), options)
    }

    fn copy(&self, src: &Path, dest: &str, options: &ExecutionOptions) -> Result<()> {
        self.copy_as(self.name(), src, dest, options)
    }

    fn remove(&self, path: &str, options: &ExecutionOptions) -> Result<()> {
        self.remove_as(self.name(), path, options)
    }

    fn to_dest_path(&self, key: &RelativeKey) -> String {
        key.to_local_path(&self.dest_root)
            .to_string_lossy()
            .into_owned()
    }
}

/// Every non-directory entry under `root`, keyed relative to `root`.
///
/// Symlinks are not followed and are listed as files, so a stale link gets
/// removed like any other entry.
fn list_files(root: &Path) -> Result<KeySet> {
    let mut keys = KeySet::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| FileSystemError::WalkFailed {
            path: e.path().unwrap_or(root).to_path_buf(),
            reason: e.to_string(),
        })?;
        if entry.file_type().is_dir() {
            continue;
        }
        let rel = relative_str(entry.path(), root)?;
        if let Some(key) = normalize_exact(rel, "")? {
            keys.insert(key);
        }
    }
    Ok(keys)
}

fn relative_str<'a>(path: &'a Path, root: &Path) -> Result<&'a str> {
    path.strip_prefix(root)
        .ok()
        .and_then(Path::to_str)
        .ok_or_else(|| Error::PathResolution {
            path: path.display().to_string(),
            base: root.display().to_string(),
        })
}

/// Stream `src` into `dest`, creating parent directories, and fsync before
/// returning.
pub(super) fn copy_file_durable(src: &Path, dest: &Path) -> Result<u64> {
    let copy_error = |e: io::Error| FileSystemError::CopyFailed {
        source_path: src.to_path_buf(),
        destination: dest.to_path_buf(),
        reason: e.to_string(),
    };

    if let Some(parent) = dest.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| FileSystemError::CreateDirFailed {
            path: parent.to_path_buf(),
            reason: e.to_string(),
        })?;
    }

    let src_file = File::open(src).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            FileSystemError::NotFound {
                path: src.to_path_buf(),
            }
        } else {
            FileSystemError::ReadFailed {
                path: src.to_path_buf(),
                reason: e.to_string(),
            }
        }
    })?;
    let dest_file = File::create(dest).map_err(|e| FileSystemError::WriteFailed {
        path: dest.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut reader = BufReader::new(src_file);
    let mut writer = BufWriter::new(dest_file);
    let bytes = io::copy(&mut reader, &mut writer).map_err(copy_error)?;
    writer.flush().map_err(copy_error)?;

    let dest_file = writer.into_inner().map_err(|e| copy_error(e.into_error()))?;
    dest_file.sync_all().map_err(|e| FileSystemError::WriteFailed {
        path: dest.to_path_buf(),
        reason: format!("failed to sync: {e}"),
    })?;

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_dest() -> TempDir {
        let temp = TempDir::new().expect("Failed to create temp dir");
        fs::write(temp.path().join("a.mp3"), "a").unwrap();
        fs::create_dir_all(temp.path().join("Artist/Album")).unwrap();
        fs::write(temp.path().join("Artist/Album/01 song.mp3"), "b").unwrap();
        fs::create_dir(temp.path().join("empty")).unwrap();
        temp
    }

    #[test]
    fn test_list_walks_recursively() {
        let temp = setup_dest();
        let backend = LocalBackend::new(temp.path());
        let keys = backend.list(&ExecutionOptions::default()).unwrap();

        let keys: Vec<&str> = keys.iter().map(RelativeKey::as_str).collect();
        assert_eq!(keys, vec!["Artist/Album/01 song.mp3", "a.mp3"]);
    }

    #[test]
    fn test_list_creates_missing_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("new/dest");
        let backend = LocalBackend::new(&root);

        let keys = backend.list(&ExecutionOptions::default()).unwrap();
        assert!(keys.is_empty());
        assert!(root.is_dir());
    }

    #[test]
    fn test_list_dry_run_does_not_create_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("new");
        let backend = LocalBackend::new(&root);

        let keys = backend.list(&ExecutionOptions::dry_run()).unwrap();
        assert!(keys.is_empty());
        assert!(!root.exists());
    }

    #[test]
    fn test_copy_creates_parents_and_preserves_bytes() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src.mp3");
        let payload: Vec<u8> = (0..=255u8).cycle().take(200_000).collect();
        fs::write(&src, &payload).unwrap();

        let backend = LocalBackend::new(temp.path().join("dest"));
        let dest = backend.to_dest_path(&normalize_exact("x/y/z.mp3", "").unwrap().unwrap());
        backend
            .copy(&src, &dest, &ExecutionOptions::default())
            .unwrap();

        assert_eq!(fs::read(&dest).unwrap(), payload);
    }

    #[test]
    fn test_copy_missing_source_fails() {
        let temp = TempDir::new().unwrap();
        let backend = LocalBackend::new(temp.path());
        let dest = temp.path().join("out.mp3");
        let err = backend
            .copy(
                &temp.path().join("missing.mp3"),
                dest.to_str().unwrap(),
                &ExecutionOptions::default(),
            )
            .unwrap_err();
        assert!(err.to_string().contains("missing.mp3"));
    }

    #[test]
    fn test_remove_deletes_file() {
        let temp = setup_dest();
        let backend = LocalBackend::new(temp.path());
        let path = temp.path().join("a.mp3");

        backend
            .remove(path.to_str().unwrap(), &ExecutionOptions::default())
            .unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_remove_missing_file_fails() {
        let temp = TempDir::new().unwrap();
        let backend = LocalBackend::new(temp.path());
        let path = temp.path().join("gone.mp3");
        assert!(
            backend
                .remove(path.to_str().unwrap(), &ExecutionOptions::default())
                .is_err()
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_list_keeps_whitespace_in_names() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("stale.mp3 "), "x").unwrap();
        fs::write(temp.path().join(" lead.mp3"), "y").unwrap();

        let backend = LocalBackend::new(temp.path());
        let keys = backend.list(&ExecutionOptions::default()).unwrap();
        let names: Vec<&str> = keys.iter().map(RelativeKey::as_str).collect();
        assert_eq!(names, vec![" lead.mp3", "stale.mp3 "]);

        for key in &keys {
            backend
                .remove(&backend.to_dest_path(key), &ExecutionOptions::default())
                .unwrap();
        }
        assert!(!temp.path().join("stale.mp3 ").exists());
        assert!(!temp.path().join(" lead.mp3").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_list_includes_symlinks_without_following() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("target.mp3");
        fs::write(&target, "real").unwrap();
        let root = temp.path().join("dest");
        fs::create_dir(&root).unwrap();
        std::os::unix::fs::symlink(&target, root.join("link.mp3")).unwrap();
        std::os::unix::fs::symlink(temp.path(), root.join("dir-link")).unwrap();

        let backend = LocalBackend::new(&root);
        let keys = backend.list(&ExecutionOptions::default()).unwrap();
        let names: Vec<&str> = keys.iter().map(RelativeKey::as_str).collect();
        assert_eq!(names, vec!["dir-link", "link.mp3"]);

        let link = backend.to_dest_path(keys.iter().nth(1).unwrap());
        backend.remove(&link, &ExecutionOptions::default()).unwrap();
        assert!(fs::symlink_metadata(root.join("link.mp3")).is_err());
        assert_eq!(fs::read(&target).unwrap(), b"real");
    }

    #[test]
    fn test_dry_run_never_mutates() {
        let temp = setup_dest();
        let backend = LocalBackend::new(temp.path());
        let options = ExecutionOptions::dry_run();

        let src = temp.path().join("a.mp3");
        let dest = temp.path().join("new/copied.mp3");
        backend
            .copy(&src, dest.to_str().unwrap(), &options)
            .unwrap();
        assert!(!dest.exists());
        assert!(!temp.path().join("new").exists());

        let victim = temp.path().join("a.mp3");
        backend.remove(victim.to_str().unwrap(), &options).unwrap();
        assert!(victim.exists());

        // even missing files report success
        backend
            .remove(temp.path().join("nope").to_str().unwrap(), &options)
            .unwrap();
    }
}
