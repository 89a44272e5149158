//! Playlist reading.
//!
//! A playlist is plain text with one absolute source path per line. Lines
//! outside the source base directory (comments, `#EXTINF` headers, files from
//! other libraries) are ignored.

use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, FileSystemError, Result};
use crate::path::{KeySet, normalize_all};

/// Read a playlist file into the set of keys relative to `source_base_dir`.
pub fn read_playlist(path: &Path, source_base_dir: &str) -> Result<KeySet> {
    let contents = fs::read_to_string(path).map_err(|e| read_error(path, e))?;
    let keys = parse_playlist(&contents, source_base_dir)?;
    debug!(
        "Read {} entries from playlist {}",
        keys.len(),
        path.display()
    );
    Ok(keys)
}

/// Parse playlist text into the set of keys relative to `source_base_dir`.
pub fn parse_playlist(contents: &str, source_base_dir: &str) -> Result<KeySet> {
    normalize_all(contents.lines(), source_base_dir)
}

fn read_error(path: &Path, e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::NotFound {
        FileSystemError::NotFound {
            path: path.to_path_buf(),
        }
        .into()
    } else {
        FileSystemError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
        .into()
    }
}
