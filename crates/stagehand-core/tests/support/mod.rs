#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use stagehand_core::config::{BackupSettings, RemoteSettings};
use stagehand_core::remote::{CommandOutput, SyncOutcome};
use tempfile::TempDir;

pub const STAGING: &str = "/homeassistant/config_staging";
pub const PRODUCTION: &str = "/homeassistant";

pub fn remote_settings() -> RemoteSettings {
    RemoteSettings {
        host: "root@ha.test".to_string(),
        staging_path: STAGING.to_string(),
        config_path: PRODUCTION.to_string(),
        identity_file: None,
        command_timeout: Duration::from_secs(120),
        connect_timeout: Duration::from_secs(10),
        secrets_timeout: Duration::from_secs(30),
    }
}

pub fn backup_settings(timeout_secs: u64) -> BackupSettings {
    BackupSettings {
        timeout: Duration::from_secs(timeout_secs),
        poll_interval: Duration::from_secs(5),
    }
}

/// A local tree holding `files` as (relative path, contents).
pub fn config_tree(files: &[(&str, &str)]) -> TempDir {
    let temp = TempDir::new().unwrap();
    write_files(temp.path(), files);
    temp
}

pub fn write_files(root: &Path, files: &[(&str, &str)]) {
    for (name, contents) in files {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }
}

pub fn stdout(text: &str) -> CommandOutput {
    CommandOutput {
        exit_code: 0,
        stdout: text.to_string(),
        stderr: String::new(),
    }
}

pub fn failed(exit_code: i32, stderr: &str) -> CommandOutput {
    CommandOutput {
        exit_code,
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

pub fn synced(files: &[&str]) -> SyncOutcome {
    SyncOutcome {
        success: true,
        exit_code: 0,
        detail: String::new(),
        transferred: files.iter().map(|f| f.to_string()).collect(),
        ..Default::default()
    }
}
