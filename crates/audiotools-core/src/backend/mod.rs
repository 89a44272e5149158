//! Sync backends.
//!
//! A backend knows how to enumerate the files already present at a
//! destination, copy a file in, remove a file, and map a [`RelativeKey`] to a
//! destination path. Three backends exist:
//!
//! - [`LocalBackend`] - a directory on this machine
//! - [`MacBackend`] - a directory on a mounted macOS volume
//! - [`DeviceBridgeBackend`] - an Android device driven through `adb`
//!
//! Dry-run is carried by [`ExecutionOptions`] on every call, never stored in
//! the backend, and every backend honors it the same way: the action is
//! announced and reported as successful without touching anything.

mod device_bridge;
mod local;
mod mac;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tracing::info;

pub use device_bridge::{
    CommandRunner, DEFAULT_BRIDGE_COMMAND, DeviceBridgeBackend, ProcessRunner, shell_quote,
};
pub use local::LocalBackend;
pub use mac::MacBackend;

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::path::{KeySet, RelativeKey};
use crate::sync::ExecutionOptions;

/// Operations every destination must support.
#[cfg_attr(test, mockall::automock)]
pub trait SyncBackend {
    /// Short backend name used in log lines.
    fn name(&self) -> &'static str;

    /// Enumerate every file under the destination root as relative keys.
    fn list(&self, options: &ExecutionOptions) -> Result<KeySet>;

    /// Copy a local source file to a destination path.
    fn copy(&self, src: &Path, dest: &str, options: &ExecutionOptions) -> Result<()>;

    /// Remove a file at a destination path.
    fn remove(&self, path: &str, options: &ExecutionOptions) -> Result<()>;

    /// Destination path for a key.
    fn to_dest_path(&self, key: &RelativeKey) -> String;
}

/// Which backend a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    /// Directory on this machine.
    Local,
    /// Directory on a mounted macOS volume.
    Mac,
    /// Android device through the device-bridge tool.
    DeviceBridge,
}

impl FromStr for BackendMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "local" => Ok(Self::Local),
            "mac" => Ok(Self::Mac),
            "adb" | "device-bridge" => Ok(Self::DeviceBridge),
            other => Err(Error::UnsupportedMode(other.to_string())),
        }
    }
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Mac => write!(f, "mac"),
            Self::DeviceBridge => write!(f, "adb"),
        }
    }
}

/// Build the backend selected by `config.mode`.
pub fn resolve_backend(config: &SyncConfig) -> Result<Box<dyn SyncBackend>> {
    let backend: Box<dyn SyncBackend> = match config.mode.parse::<BackendMode>()? {
        BackendMode::Local => Box::new(LocalBackend::new(&config.dest_dir)),
        BackendMode::Mac => Box::new(MacBackend::new(&config.dest_dir)),
        BackendMode::DeviceBridge => Box::new(DeviceBridgeBackend::new(
            config.bridge_command(),
            &config.dest_dir,
        )),
    };
    Ok(backend)
}

fn announce_copy(backend: &str, src: &Path, dest: &str) {
    info!("[dry-run] {backend}: copy {} -> {dest}", src.display());
}

fn announce_remove(backend: &str, path: &str) {
    info!("[dry-run] {backend}: remove {path}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn config(mode: &str) -> SyncConfig {
        SyncConfig {
            at_service: "sync_playlist_files".to_string(),
            source_playlist: "/music/list.m3u".into(),
            dest_dir: "/dest".to_string(),
            source_base_dir: "/music".to_string(),
            mode: mode.to_string(),
            bridge_command: None,
        }
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("local".parse::<BackendMode>().unwrap(), BackendMode::Local);
        assert_eq!("mac".parse::<BackendMode>().unwrap(), BackendMode::Mac);
        assert_eq!("adb".parse::<BackendMode>().unwrap(), BackendMode::DeviceBridge);
        assert_eq!(
            "device-bridge".parse::<BackendMode>().unwrap(),
            BackendMode::DeviceBridge
        );
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let err = "ftp".parse::<BackendMode>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedMode);
        assert!(resolve_backend(&config("ftp")).is_err());
    }

    #[test]
    fn test_resolve_backend_by_mode() {
        assert_eq!(resolve_backend(&config("local")).unwrap().name(), "local");
        assert_eq!(resolve_backend(&config("mac")).unwrap().name(), "mac");
        assert_eq!(resolve_backend(&config("adb")).unwrap().name(), "adb");
    }
}
