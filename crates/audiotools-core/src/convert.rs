//! Playlist conversion for a media player on another machine.
//!
//! Each entry under `path_replacement.from` is rewritten to live under
//! `path_replacement.to`, with every path segment NFD-normalized and
//! percent-encoded, and written out as an extended m3u8 playlist.

use std::fs;
use std::io;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;

use crate::config::{ConvertConfig, PathReplacement};
use crate::error::{FileSystemError, Result};
use crate::sync::ExecutionOptions;

/// Bytes escaped inside one path segment. Unreserved characters and the
/// sub-delimiters `$&+:=@` stay literal; `/ ; , ?` and spaces are escaped.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b':')
    .remove(b'=')
    .remove(b'@');

/// First line of every converted playlist.
pub const M3U_HEADER: &str = "#EXTM3U";

/// Outcome of converting a batch of playlists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertReport {
    /// Playlists written (or announced, in a dry run).
    pub written: Vec<PathBuf>,
    /// Source playlists that did not exist.
    pub missing: Vec<PathBuf>,
    /// Total entries across all written playlists.
    pub entries: usize,
}

/// One converted playlist entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedEntry {
    /// Display name (file name, NFD).
    pub name: String,
    /// Rewritten, percent-encoded location.
    pub location: String,
}

/// Rewrite one source path.
pub fn convert_entry(source: &str, replacement: &PathReplacement) -> ConvertedEntry {
    let stripped = source.replacen(&replacement.from, "", 1);
    let slashed = if MAIN_SEPARATOR == '/' {
        stripped
    } else {
        stripped.replace(MAIN_SEPARATOR, "/")
    };
    let normalized: String = slashed.nfd().collect();

    let name = normalized
        .rsplit('/')
        .find(|seg| !seg.is_empty())
        .unwrap_or_default()
        .to_string();

    let encoded: String = normalized
        .split('/')
        .filter(|seg| !seg.is_empty())
        .map(|seg| format!("/{}", utf8_percent_encode(seg, PATH_SEGMENT)))
        .collect();

    ConvertedEntry {
        name,
        location: format!("{}{encoded}", replacement.to),
    }
}

/// Convert playlist text, keeping only entries under `replacement.from`.
///
/// Returns the m3u8 text and the number of entries it contains.
pub fn convert_playlist_text(contents: &str, replacement: &PathReplacement) -> (String, usize) {
    let mut lines = vec![M3U_HEADER.to_string()];
    let mut entries = 0;
    for line in contents.lines() {
        let line = line.trim_end_matches('\r');
        if !line.starts_with(&replacement.from) {
            continue;
        }
        let entry = convert_entry(line, replacement);
        lines.push(format!("#EXTINF:-1,{}", entry.name));
        lines.push(entry.location);
        entries += 1;
    }
    (lines.join("\n"), entries)
}

/// Convert every configured playlist into `config.output_dir`.
///
/// Missing source playlists are skipped with a warning.
pub fn convert_playlists(
    config: &ConvertConfig,
    options: &ExecutionOptions,
) -> Result<ConvertReport> {
    let mut report = ConvertReport::default();

    if !options.dry_run && !config.output_dir.exists() {
        fs::create_dir_all(&config.output_dir).map_err(|e| FileSystemError::CreateDirFailed {
            path: config.output_dir.clone(),
            reason: e.to_string(),
        })?;
    }

    for source in &config.source_playlists {
        let contents = match fs::read_to_string(source) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("File not found: {}", source.display());
                report.missing.push(source.clone());
                continue;
            }
            Err(e) => {
                return Err(FileSystemError::ReadFailed {
                    path: source.clone(),
                    reason: e.to_string(),
                }
                .into());
            }
        };

        let (text, entries) = convert_playlist_text(&contents, &config.path_replacement);
        let target = output_path(&config.output_dir, source);

        if options.dry_run {
            info!("[dry-run] write {} ({entries} entries)", target.display());
        } else {
            info!("Writing to {}", target.display());
            fs::write(&target, text).map_err(|e| FileSystemError::WriteFailed {
                path: target.clone(),
                reason: e.to_string(),
            })?;
        }
        if options.verbose {
            debug!("{} -> {}: {entries} entries", source.display(), target.display());
        }

        report.entries += entries;
        report.written.push(target);
    }

    Ok(report)
}

fn output_path(output_dir: &Path, source: &Path) -> PathBuf {
    match source.file_name() {
        Some(name) => output_dir.join(name),
        None => output_dir.join("output.m3u8"),
    }
}
