//! Configuration loading.
//!
//! One YAML file configures every subcommand. It holds one document per
//! service, separated by `---`, each tagged with `at_service`:
//!
//! ```yaml
//! at_service: sync_playlist_files
//! source_playlist: ~/Music/favorites.m3u8
//! source_base_dir: /Users/me/Music
//! dest_dir: /sdcard/Music
//! mode: adb
//! ---
//! at_service: convert_to_mac_vlc_playlist
//! source_playlists: [~/Music/favorites.m3u8]
//! output_dir: ~/Playlists
//! path_replacement:
//!   from: /Users/me/Music
//!   to: file:///Volumes/Music
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::debug;

use crate::backend::{BackendMode, DEFAULT_BRIDGE_COMMAND};
use crate::error::{Error, FileSystemError, Result};

/// Config file looked up in the working directory by default.
pub const DEFAULT_CONFIG_FILE: &str = "at.config.yaml";

/// A configuration document selected by its `at_service` tag.
pub trait ServiceConfig: DeserializeOwned {
    /// Value of `at_service` this document type answers to.
    const SERVICE: &'static str;

    /// Expand `~/` in path fields.
    fn expand_paths(&mut self);

    /// Reject incomplete or inconsistent settings.
    fn validate(&self) -> Result<()>;
}

/// Settings for syncing playlist files to a destination.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncConfig {
    /// Service tag.
    pub at_service: String,
    /// Playlist listing the files that should exist at the destination.
    pub source_playlist: PathBuf,
    /// Destination root (local directory, volume path or device path).
    pub dest_dir: String,
    /// Directory playlist entries are relative to.
    pub source_base_dir: String,
    /// Backend mode: `local`, `mac` or `adb`.
    pub mode: String,
    /// Device-bridge program, `adb` when absent.
    #[serde(default)]
    pub bridge_command: Option<String>,
}

impl SyncConfig {
    /// Device-bridge program to run.
    pub fn bridge_command(&self) -> &str {
        self.bridge_command
            .as_deref()
            .unwrap_or(DEFAULT_BRIDGE_COMMAND)
    }
}

impl ServiceConfig for SyncConfig {
    const SERVICE: &'static str = "sync_playlist_files";

    fn expand_paths(&mut self) {
        self.source_playlist = expand_home(&self.source_playlist.to_string_lossy());
        self.source_base_dir = expand_home(&self.source_base_dir)
            .to_string_lossy()
            .into_owned();
        // Device paths live on the device, not under our home directory.
        if !matches!(self.mode.parse::<BackendMode>(), Ok(BackendMode::DeviceBridge)) {
            self.dest_dir = expand_home(&self.dest_dir).to_string_lossy().into_owned();
        }
    }

    fn validate(&self) -> Result<()> {
        self.mode.parse::<BackendMode>()?;
        require("source_playlist", &self.source_playlist.to_string_lossy())?;
        require("source_base_dir", &self.source_base_dir)?;
        require("dest_dir", &self.dest_dir)?;
        if self.bridge_command.as_deref().is_some_and(|c| c.trim().is_empty()) {
            return Err(Error::Configuration(
                "bridge_command must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Prefix rewrite applied to converted playlist entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PathReplacement {
    /// Source prefix to strip.
    pub from: String,
    /// Prefix to put in its place.
    pub to: String,
}

/// Settings for converting playlists for a media player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConvertConfig {
    /// Service tag.
    pub at_service: String,
    /// Playlists to convert.
    pub source_playlists: Vec<PathBuf>,
    /// Directory the converted playlists are written to.
    pub output_dir: PathBuf,
    /// Prefix rewrite for entries.
    pub path_replacement: PathReplacement,
}

impl ServiceConfig for ConvertConfig {
    const SERVICE: &'static str = "convert_to_mac_vlc_playlist";

    fn expand_paths(&mut self) {
        for playlist in &mut self.source_playlists {
            *playlist = expand_home(&playlist.to_string_lossy());
        }
        self.output_dir = expand_home(&self.output_dir.to_string_lossy());
    }

    fn validate(&self) -> Result<()> {
        if self.source_playlists.is_empty() {
            return Err(Error::Configuration(
                "source_playlists must list at least one playlist".to_string(),
            ));
        }
        require("output_dir", &self.output_dir.to_string_lossy())?;
        require("path_replacement.from", &self.path_replacement.from)?;
        Ok(())
    }
}

/// Load the document for service `T` from the config file at `path`.
///
/// When several documents carry the same tag, the last one wins.
pub fn load_service_config<T: ServiceConfig>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            Error::from(FileSystemError::NotFound {
                path: path.to_path_buf(),
            })
        } else {
            Error::from(FileSystemError::ReadFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        }
    })?;

    let mut config = parse_service_config::<T>(&contents).map_err(|e| match e {
        Error::ConfigParse { reason, .. } => Error::ConfigParse {
            path: path.to_path_buf(),
            reason,
        },
        other => other,
    })?;
    debug!("Loaded {} config from {}", T::SERVICE, path.display());

    config.expand_paths();
    config.validate()?;
    Ok(config)
}

/// Pick the document for service `T` out of multi-document YAML text.
///
/// Paths are returned as written; [`load_service_config`] expands them.
pub fn parse_service_config<T: ServiceConfig>(contents: &str) -> Result<T> {
    let mut found = None;
    for document in serde_yaml::Deserializer::from_str(contents) {
        let value = Value::deserialize(document).map_err(parse_error)?;
        let service = value.get("at_service").and_then(Value::as_str);
        if service != Some(T::SERVICE) {
            continue;
        }
        found = Some(serde_yaml::from_value::<T>(value).map_err(parse_error)?);
    }

    found.ok_or_else(|| {
        Error::Configuration(format!("no config document with at_service: {}", T::SERVICE))
    })
}

fn parse_error(e: serde_yaml::Error) -> Error {
    Error::ConfigParse {
        path: PathBuf::new(),
        reason: e.to_string(),
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Configuration(format!("{field} is required")));
    }
    Ok(())
}

/// Expand a leading `~/` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}
