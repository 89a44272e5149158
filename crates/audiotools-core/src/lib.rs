//! `audiotools` Core Library
//!
//! This crate provides the core functionality for the `audiotools` command:
//! - Path normalization into backend-agnostic relative keys
//! - Playlist reading
//! - Sync backends for local directories, macOS volumes and Android devices
//! - Reconciliation of playlist and destination file sets
//! - Sync orchestration with dry-run and error policies
//! - Playlist conversion to percent-encoded m3u8
//! - YAML configuration loading
//!
//! # Error Handling
//!
//! Every fallible operation returns [`Result`], whose [`Error`] keeps the
//! failing path, command line or captured output. See the [`error`] module.
//!
//! ```rust,ignore
//! use audiotools_core::{ExecutionOptions, SyncConfig, load_service_config, sync};
//!
//! let config: SyncConfig = load_service_config("at.config.yaml".as_ref())?;
//! let report = sync::run(config, &ExecutionOptions::default())?;
//! ```

pub mod backend;
pub mod config;
pub mod convert;
pub mod error;
pub mod path;
pub mod playlist;
pub mod reconcile;
pub mod sync;

pub use backend::{
    BackendMode, CommandRunner, DeviceBridgeBackend, LocalBackend, MacBackend, ProcessRunner,
    SyncBackend, resolve_backend, shell_quote,
};
pub use config::{
    ConvertConfig, DEFAULT_CONFIG_FILE, PathReplacement, ServiceConfig, SyncConfig,
    load_service_config, parse_service_config,
};
pub use convert::{
    ConvertReport, ConvertedEntry, M3U_HEADER, convert_entry, convert_playlist_text,
    convert_playlists,
};
pub use error::{
    Error, ErrorKind, FileSystemError, Result, SubprocessError, TaskFailure, TaskFailures,
};
pub use path::{KeySet, RelativeKey, normalize, normalize_all, normalize_exact};
pub use playlist::{parse_playlist, read_playlist};
pub use reconcile::{CopyTask, DeleteTask, SyncPlan, reconcile};
pub use sync::{ErrorPolicy, ExecutionOptions, SyncOrchestrator, SyncReport};
