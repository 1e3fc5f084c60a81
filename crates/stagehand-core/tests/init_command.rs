mod support;

use std::time::Duration;

use git2::Repository;
use stagehand_core::commands::{InitCommand, InitOptions};
use stagehand_core::remote::SyncDirection;
use stagehand_core::testing::{FakeExecutor, FakeFailure};
use stagehand_core::tree::PROTECTED_PATHS;
use tempfile::TempDir;

use support::{PRODUCTION, STAGING, failed, remote_settings, stdout};

fn reachable() -> FakeExecutor {
    let executor = FakeExecutor::new("root@ha.test");
    executor.on_run("echo", stdout("ok\n"));
    executor
}

#[tokio::test]
async fn init_pulls_and_commits() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ha-config");
    let executor = reachable();
    let remote = remote_settings();

    let report = InitCommand::new(&executor, &remote)
        .execute(&InitOptions::new(&path))
        .await
        .unwrap();

    assert!(report.success);
    assert!(!report.skipped_pull);
    assert!(report.git_initialized);
    assert!(report.initial_commit.is_some());
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    assert_eq!(report.target, "root@ha.test");

    let gitignore = std::fs::read_to_string(path.join(".gitignore")).unwrap();
    assert!(gitignore.contains("secrets.yaml"));

    let pull = executor.sync_requests().pop().unwrap();
    assert_eq!(pull.direction, SyncDirection::Pull);
    assert_eq!(pull.source, PRODUCTION);
    assert_eq!(pull.destination, path.display().to_string());
    assert_eq!(&pull.excludes[..PROTECTED_PATHS.len()], PROTECTED_PATHS);
    assert_eq!(&pull.excludes[PROTECTED_PATHS.len()..], ["/config_staging/"]);
    assert_eq!(pull.timeout, Duration::from_secs(300));
    assert!(!pull.delete);

    let commands = executor.commands();
    assert_eq!(commands[0], ["echo", "ok"]);
    assert_eq!(commands[1], ["test", "-d", PRODUCTION]);
    assert_eq!(commands[2], ["mkdir", "-p", STAGING]);

    let repo = Repository::open(&path).unwrap();
    let head = repo.head().unwrap().peel_to_commit().unwrap();
    assert!(head.message().unwrap().contains("root@ha.test"));
}

#[tokio::test]
async fn skip_pull_creates_empty_repository() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ha-config");
    let executor = reachable();
    let remote = remote_settings();

    let report = InitCommand::new(&executor, &remote)
        .execute(&InitOptions::new(&path).with_skip_pull(true))
        .await
        .unwrap();

    assert!(report.skipped_pull);
    assert_eq!(report.files_pulled, 0);
    assert!(executor.sync_requests().is_empty());
    assert!(path.join(".git").is_dir());
}

#[tokio::test]
async fn existing_path_requires_force() {
    let temp = TempDir::new().unwrap();
    let executor = reachable();
    let remote = remote_settings();

    let err = InitCommand::new(&executor, &remote)
        .execute(&InitOptions::new(temp.path()))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("already exists"));
    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn force_replaces_existing_directory() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ha-config");
    support::write_files(&path, &[("stale.yaml", "old: true\n")]);
    let executor = reachable();
    let remote = remote_settings();

    let report = InitCommand::new(&executor, &remote)
        .execute(&InitOptions::new(&path).with_force(true).with_skip_pull(true))
        .await
        .unwrap();

    assert!(report.success);
    assert!(!path.join("stale.yaml").exists());
}

#[tokio::test]
async fn unreachable_controller_fails_before_touching_disk() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ha-config");
    let executor = FakeExecutor::new("root@ha.test");
    executor.fail_run("echo", FakeFailure::Connection("Connection refused".to_string()));
    let remote = remote_settings();

    let err = InitCommand::new(&executor, &remote)
        .execute(&InitOptions::new(&path))
        .await
        .unwrap_err();

    assert!(format!("{err:#}").contains("Cannot connect to root@ha.test"));
    assert!(!path.exists());
}

#[tokio::test]
async fn missing_production_directory_is_an_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ha-config");
    let executor = reachable();
    executor.on_run("test", failed(1, ""));
    let remote = remote_settings();

    let err = InitCommand::new(&executor, &remote)
        .execute(&InitOptions::new(&path))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Config directory not found"));
    assert!(!path.exists());
}

#[tokio::test]
async fn staging_directory_failure_is_a_warning() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ha-config");
    let executor = reachable();
    executor.on_run("mkdir", failed(1, "mkdir: Permission denied"));
    let remote = remote_settings();

    let report = InitCommand::new(&executor, &remote)
        .execute(&InitOptions::new(&path).with_skip_pull(true))
        .await
        .unwrap();

    assert!(report.success);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("Permission denied"));
}
