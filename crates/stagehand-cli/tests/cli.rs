use std::path::Path;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use tempfile::TempDir;

struct TestEnv {
    tmp: TempDir,
}

impl TestEnv {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("stagehand.toml"), "").unwrap();
        Self { tmp }
    }

    fn config_tree(&self, files: &[(&str, &str)]) -> std::path::PathBuf {
        let root = self.tmp.path().join("ha-config");
        std::fs::create_dir_all(&root).unwrap();
        for (name, contents) in files {
            std::fs::write(root.join(name), contents).unwrap();
        }
        root
    }

    fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("stagehand");
        cmd.arg("--config")
            .arg(self.tmp.path().join("stagehand.toml"))
            .env_remove("HA_SSH_HOST")
            .env_remove("HA_LOCAL_CONFIG")
            .env_remove("HA_STAGING_PATH")
            .env_remove("HA_CONFIG_PATH")
            .env_remove("HOMEASSISTANT_URL")
            .env_remove("HOMEASSISTANT_TOKEN")
            .env("RUST_LOG", "off");
        cmd
    }

    fn with_controller(&self) -> Command {
        let mut cmd = self.cmd();
        cmd.env("HA_SSH_HOST", "root@ha.invalid")
            .env("HOMEASSISTANT_URL", "http://ha.invalid:8123")
            .env("HOMEASSISTANT_TOKEN", "test-token");
        cmd
    }
}

fn json_stdout(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({e}): {}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn help_lists_subcommands() {
    let env = TestEnv::new();
    let output = env.cmd().arg("--help").output().unwrap();
    assert!(output.status.success());
    let help = String::from_utf8_lossy(&output.stdout);
    for command in ["deploy", "validate", "init", "backup", "check"] {
        assert!(help.contains(command), "missing {command} in:\n{help}");
    }
}

#[test]
fn unknown_format_is_a_usage_error() {
    let env = TestEnv::new();
    env.cmd()
        .args(["deploy", "--format", "yaml"])
        .assert()
        .code(2);
}

#[test]
fn deploy_without_host_fails() {
    let env = TestEnv::new();
    let root = env.config_tree(&[("configuration.yaml", "homeassistant:\n")]);
    let output = env
        .cmd()
        .args(["deploy", "--local-path", path_arg(&root)])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("HA_SSH_HOST"));
}

#[test]
fn deploy_with_invalid_yaml_aborts() {
    let env = TestEnv::new();
    let root = env.config_tree(&[
        ("configuration.yaml", "homeassistant:\n"),
        ("scripts.yaml", "morning:\n  sequence: [\n"),
    ]);

    let output = env
        .with_controller()
        .args(["deploy", "--json", "--local-path", path_arg(&root)])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let report = json_stdout(&output);
    assert_eq!(report["overall_success"], false);
    assert_eq!(report["abort_reason"], "local validation failed");
    assert_eq!(report["steps"].as_array().unwrap().len(), 1);
    assert_eq!(report["steps"][0]["name"], "validate");
    assert_eq!(report["steps"][0]["outcome"], "failure");
}

#[test]
fn deploy_text_report_names_the_failure() {
    let env = TestEnv::new();
    let root = env.config_tree(&[("configuration.yaml", "a: b: c\n")]);

    let output = env
        .with_controller()
        .args(["deploy", "--local-path", path_arg(&root)])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("DEPLOYMENT FAILED"), "{text}");
    assert!(text.contains("local validation failed"), "{text}");
}

#[test]
fn validate_skip_push_accepts_valid_tree() {
    let env = TestEnv::new();
    let root = env.config_tree(&[
        ("configuration.yaml", "homeassistant:\n  name: Home\n"),
        ("automations.yaml", "[]\n"),
    ]);

    let output = env
        .cmd()
        .args(["validate", "--skip-push", "--json", "--local-path", path_arg(&root)])
        .output()
        .unwrap();

    assert!(output.status.success());
    let report = json_stdout(&output);
    assert_eq!(report["valid"], true);
    assert_eq!(report["yaml"]["files"].as_array().unwrap().len(), 2);
}

#[test]
fn validate_skip_push_rejects_invalid_tree() {
    let env = TestEnv::new();
    let root = env.config_tree(&[("configuration.yaml", "sensor: [1, 2\n")]);

    let output = env
        .cmd()
        .args(["validate", "--skip-push", "--json", "--local-path", path_arg(&root)])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let report = json_stdout(&output);
    assert_eq!(report["valid"], false);
    assert_eq!(report["yaml"]["files"][0]["file"], "configuration.yaml");
}

#[test]
fn missing_config_file_is_reported() {
    let env = TestEnv::new();
    let output = cargo_bin_cmd!("stagehand")
        .arg("--config")
        .arg(env.tmp.path().join("absent.toml"))
        .args(["validate", "--skip-push"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Config file not found"));
}
