//! Integration tests for syncing to a device through the bridge tool.
//!
//! `FakeDevice` answers the three commands the backend issues (`shell ls -p1`,
//! `push` and `shell rm`) against an in-memory file tree.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs;
use std::rc::Rc;

use audiotools_core::{
    CommandRunner, DeviceBridgeBackend, Error, ErrorKind, ExecutionOptions, KeySet, Result,
    SubprocessError, SyncBackend, SyncConfig, SyncOrchestrator, normalize_all,
};
use tempfile::TempDir;

#[derive(Debug, Default)]
struct DeviceState {
    files: BTreeSet<String>,
    calls: Vec<Vec<String>>,
    fail_rm: bool,
}

#[derive(Debug, Clone, Default)]
struct FakeDevice(Rc<RefCell<DeviceState>>);

impl FakeDevice {
    fn with_files(files: &[&str]) -> Self {
        let device = Self::default();
        device
            .0
            .borrow_mut()
            .files
            .extend(files.iter().map(ToString::to_string));
        device
    }

    fn files(&self) -> Vec<String> {
        self.0.borrow().files.iter().cloned().collect()
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.0.borrow().calls.clone()
    }

    fn failure(command: String, stderr: &str) -> Error {
        SubprocessError::Failed {
            command,
            status: "exit status: 1".to_string(),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
        .into()
    }

    fn ls(&self, dir: &str) -> Result<String> {
        let state = self.0.borrow();
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        let mut entries = BTreeSet::new();
        for file in state.files.iter().filter_map(|f| f.strip_prefix(&prefix)) {
            match file.split_once('/') {
                Some((sub, _)) => entries.insert(format!("{sub}/")),
                None => entries.insert(file.to_string()),
            };
        }
        if entries.is_empty() {
            return Err(Self::failure(
                format!("ls -p1 {dir}"),
                "No such file or directory",
            ));
        }
        // the device shell terminates lines with CRLF
        Ok(entries.into_iter().map(|e| format!("{e}\r\n")).collect())
    }
}

/// Undo single-quote shell quoting.
fn unquote(s: &str) -> String {
    s.trim_start_matches('\'')
        .trim_end_matches('\'')
        .replace(r"'\''", "'")
}

impl CommandRunner for FakeDevice {
    fn run(&self, program: &str, args: &[String]) -> Result<String> {
        assert_eq!(program, "adb");
        self.0.borrow_mut().calls.push(args.to_vec());

        match args {
            [cmd, script] if cmd == "shell" => {
                if let Some(dir) = script.strip_prefix("ls -p1 ") {
                    return self.ls(&unquote(dir));
                }
                if let Some(path) = script.strip_prefix("rm ") {
                    let path = unquote(path);
                    let mut state = self.0.borrow_mut();
                    if state.fail_rm || !state.files.remove(&path) {
                        return Err(Self::failure(format!("rm {path}"), "rm: Permission denied"));
                    }
                    return Ok(String::new());
                }
                Err(Self::failure(script.clone(), "unknown command"))
            }
            [cmd, _src, dest] if cmd == "push" => {
                self.0.borrow_mut().files.insert(dest.clone());
                Ok(format!("{dest}: 1 file pushed"))
            }
            _ => Err(Self::failure(args.join(" "), "unexpected arguments")),
        }
    }
}

fn keys(list: &[&str]) -> KeySet {
    normalize_all(list.iter().copied(), "").unwrap()
}

fn setup(playlist_keys: &[&str]) -> (TempDir, SyncConfig) {
    let temp = TempDir::new().unwrap();
    let playlist = temp.path().join("list.m3u8");
    let lines: Vec<String> = playlist_keys.iter().map(|k| format!("/music/{k}")).collect();
    fs::write(&playlist, lines.join("\n")).unwrap();
    let config = SyncConfig {
        at_service: "sync_playlist_files".to_string(),
        source_playlist: playlist,
        dest_dir: "/sdcard/Music".to_string(),
        source_base_dir: "/music".to_string(),
        mode: "adb".to_string(),
        bridge_command: None,
    };
    (temp, config)
}

fn orchestrator(config: SyncConfig, device: &FakeDevice) -> SyncOrchestrator {
    let backend = DeviceBridgeBackend::with_runner("adb", &config.dest_dir, device.clone());
    SyncOrchestrator::with_backend(config, Box::new(backend))
}

#[test]
fn test_list_recurses_nested_directories_with_spaces() {
    let device = FakeDevice::with_files(&[
        "/sdcard/Music/top.mp3",
        "/sdcard/Music/My Artist/Best Of/01 Song One.mp3",
        "/sdcard/Music/My Artist/Best Of/02 Song's Two.mp3",
        "/sdcard/Music/My Artist/single.mp3",
        "/sdcard/Music/Other/deep/er/x.ogg",
    ]);
    let backend = DeviceBridgeBackend::with_runner("adb", "/sdcard/Music/", device.clone());

    let listed = backend.list(&ExecutionOptions::default()).unwrap();

    assert_eq!(
        listed,
        keys(&[
            "top.mp3",
            "My Artist/Best Of/01 Song One.mp3",
            "My Artist/Best Of/02 Song's Two.mp3",
            "My Artist/single.mp3",
            "Other/deep/er/x.ogg",
        ])
    );
    // one listing per directory: root, My Artist, Best Of, Other, deep, er
    assert_eq!(device.calls().len(), 6);
}

#[test]
fn test_sync_pushes_missing_and_removes_stale() {
    let device = FakeDevice::with_files(&[
        "/sdcard/Music/keep.mp3",
        "/sdcard/Music/Old Stuff/stale.mp3",
    ]);
    let (_temp, config) = setup(&["keep.mp3", "New Album/track 1.mp3"]);

    let report = orchestrator(config, &device)
        .run(&ExecutionOptions::default())
        .unwrap();

    assert_eq!((report.copied, report.deleted), (1, 1));
    assert_eq!(
        device.files(),
        vec!["/sdcard/Music/New Album/track 1.mp3", "/sdcard/Music/keep.mp3"]
    );
    assert!(device.calls().contains(&vec![
        "push".to_string(),
        "/music/New Album/track 1.mp3".to_string(),
        "/sdcard/Music/New Album/track 1.mp3".to_string(),
    ]));
    assert!(device.calls().contains(&vec![
        "shell".to_string(),
        "rm '/sdcard/Music/Old Stuff/stale.mp3'".to_string(),
    ]));
}

#[test]
fn test_dry_run_only_lists() {
    let device = FakeDevice::with_files(&["/sdcard/Music/stale.mp3"]);
    let (_temp, config) = setup(&["a.mp3"]);

    let report = orchestrator(config, &device)
        .run(&ExecutionOptions::dry_run())
        .unwrap();

    assert_eq!((report.copied, report.deleted), (1, 1));
    assert_eq!(device.files(), vec!["/sdcard/Music/stale.mp3"]);
    assert!(device.calls().iter().all(|call| call[1].starts_with("ls -p1")));
}

#[test]
fn test_failed_remove_is_reported_not_fatal() {
    let device = FakeDevice::with_files(&["/sdcard/Music/stale.mp3"]);
    device.0.borrow_mut().fail_rm = true;
    let (_temp, config) = setup(&["a.mp3"]);

    let err = orchestrator(config, &device)
        .run(&ExecutionOptions::default())
        .unwrap_err();

    assert!(!err.is_fatal());
    assert_eq!(err.kind(), ErrorKind::Sync);
    let message = err.to_string();
    assert!(message.contains("rm /sdcard/Music/stale.mp3"));
    assert!(message.contains("Permission denied"));
    // the copy still happened
    assert!(
        device
            .files()
            .contains(&"/sdcard/Music/a.mp3".to_string())
    );
}

#[test]
fn test_listing_failure_aborts_before_changes() {
    let device = FakeDevice::default();
    let (_temp, config) = setup(&["a.mp3"]);

    let err = orchestrator(config, &device)
        .run(&ExecutionOptions::default())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Subprocess);
    assert_eq!(device.calls().len(), 1);
    assert!(device.files().is_empty());
}

#[test]
fn test_dest_paths_use_forward_slashes() {
    let device = FakeDevice::default();
    let backend = DeviceBridgeBackend::with_runner("adb", "/sdcard/Music", device);
    let key = keys(&["A Dir/b c.mp3"]).into_iter().next().unwrap();

    assert_eq!(backend.to_dest_path(&key), "/sdcard/Music/A Dir/b c.mp3");
}

#[test]
fn test_names_with_surrounding_spaces_are_listed_and_removed_exactly() {
    let device = FakeDevice::with_files(&[
        "/sdcard/Music/ leading.mp3",
        "/sdcard/Music/trailing.mp3 ",
    ]);
    let backend = DeviceBridgeBackend::with_runner("adb", "/sdcard/Music", device.clone());
    let listed: Vec<String> = backend
        .list(&ExecutionOptions::default())
        .unwrap()
        .iter()
        .map(|k| k.as_str().to_string())
        .collect();
    assert_eq!(listed, vec![" leading.mp3", "trailing.mp3 "]);

    let (_temp, config) = setup(&["a.mp3"]);
    let report = orchestrator(config, &device)
        .run(&ExecutionOptions::default())
        .unwrap();

    assert_eq!(report.deleted, 2);
    assert_eq!(device.files(), vec!["/sdcard/Music/a.mp3"]);
    assert!(device.calls().contains(&vec![
        "shell".to_string(),
        "rm '/sdcard/Music/trailing.mp3 '".to_string(),
    ]));
}
