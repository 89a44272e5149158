//! Path normalization shared by every side of a sync.
//!
//! Playlist entries and destination listings are both reduced to
//! [`RelativeKey`]s through [`normalize`], so keys computed under two
//! different roots compare equal when they name the same logical file.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use crate::error::{Error, Result};

/// A file location relative to a root: forward slashes, no leading slash,
/// no `.` or `..` segments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelativeKey(String);

impl RelativeKey {
    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join this key under a local directory.
    pub fn to_local_path(&self, root: &Path) -> PathBuf {
        self.0.split('/').fold(root.to_path_buf(), |acc, seg| acc.join(seg))
    }

    /// Join this key under a remote (always `/`-separated) directory.
    pub fn to_remote_path(&self, root: &str) -> String {
        let root = root.trim_end_matches('/');
        format!("{root}/{}", self.0)
    }
}

impl fmt::Display for RelativeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RelativeKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The set of files that should or do exist on one side of a sync.
pub type KeySet = BTreeSet<RelativeKey>;

/// Reduce `path` to a key relative to `base_dir`, trimming surrounding
/// whitespace first.
///
/// Returns `Ok(None)` when the path does not live under `base_dir` (or names
/// `base_dir` itself); such entries are filtered out, not reported. Returns
/// [`Error::PathResolution`] when `..` segments climb above `base_dir`.
///
/// An empty `base_dir` accepts every path, so normalizing an existing key
/// against `""` returns it unchanged.
pub fn normalize(path: &str, base_dir: &str) -> Result<Option<RelativeKey>> {
    normalize_exact(path.trim(), base_dir)
}

/// Like [`normalize`] but keeps whitespace in `path`.
///
/// Destination listings go through this: a file named `"a.mp3 "` must keep
/// its key, or it could never be matched or removed.
pub fn normalize_exact(path: &str, base_dir: &str) -> Result<Option<RelativeKey>> {
    let path = to_slash(path);
    let base = to_slash(base_dir.trim());

    let Some(rest) = strip_base(&path, &base) else {
        return Ok(None);
    };

    let mut segments: Vec<&str> = Vec::new();
    for seg in rest.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(Error::PathResolution {
                        path: path.clone(),
                        base: base.clone(),
                    });
                }
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return Ok(None);
    }
    Ok(Some(RelativeKey(segments.join("/"))))
}

/// Normalize every path, dropping the ones outside `base_dir`.
pub fn normalize_all<'a, I>(paths: I, base_dir: &str) -> Result<KeySet>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut keys = KeySet::new();
    for p in paths {
        if let Some(key) = normalize(p, base_dir)? {
            keys.insert(key);
        }
    }
    Ok(keys)
}

fn to_slash(p: &str) -> String {
    if MAIN_SEPARATOR == '/' {
        p.to_string()
    } else {
        p.replace(MAIN_SEPARATOR, "/")
    }
}

/// Strip `base` from the front of `path` on a segment boundary.
fn strip_base<'a>(path: &'a str, base: &str) -> Option<&'a str> {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        return Some(path);
    }
    let rest = path.strip_prefix(base)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        // "/music2/a.mp3" is not under "/music"
        None
    }
}
