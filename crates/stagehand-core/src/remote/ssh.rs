//! ssh + rsync transport.

use std::borrow::Cow;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

use super::{CommandOutput, RemoteExecutor, SyncDirection, SyncOutcome, SyncRequest, TransportError};
use crate::config::RemoteSettings;

/// Exit status ssh reserves for its own failures.
const SSH_TRANSPORT_EXIT: i32 = 255;

/// rsync exit codes that mean the remote shell never worked.
const RSYNC_CONNECTION_EXITS: &[i32] = &[5, 10, 12, 30, 35, 255];

/// Connection parameters shared by ssh and rsync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshOptions {
    pub host: String,
    pub identity_file: Option<PathBuf>,
    pub connect_timeout: Duration,
}

impl SshOptions {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            identity_file: None,
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Options placed between `ssh` and the destination.
    fn args(&self) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout.as_secs().max(1)),
        ];
        if let Some(identity) = &self.identity_file {
            args.push("-i".to_string());
            args.push(identity.display().to_string());
        }
        args
    }
}

impl From<&RemoteSettings> for SshOptions {
    fn from(settings: &RemoteSettings) -> Self {
        Self {
            host: settings.host.clone(),
            identity_file: settings.identity_file.clone(),
            connect_timeout: settings.connect_timeout,
        }
    }
}

/// Runs commands over `ssh` and mirrors trees with `rsync`.
#[derive(Debug, Clone)]
pub struct SshExecutor {
    options: SshOptions,
}

impl SshExecutor {
    pub fn new(options: SshOptions) -> Self {
        Self { options }
    }

    pub fn from_settings(settings: &RemoteSettings) -> Self {
        Self::new(SshOptions::from(settings))
    }

    /// Full local argv that runs `argv` on the controller.
    pub fn ssh_argv(&self, argv: &[&str]) -> Vec<String> {
        let mut cmd = vec!["ssh".to_string()];
        cmd.extend(self.options.args());
        cmd.push(self.options.host.clone());
        cmd.push(remote_command_line(argv));
        cmd
    }

    /// Full local argv for a sync request.
    pub fn sync_argv(&self, request: &SyncRequest) -> Vec<String> {
        let mut rsync = vec!["rsync".to_string(), "-av".to_string()];
        if request.delete {
            rsync.push("--delete".to_string());
        }
        if request.dry_run {
            rsync.push("--dry-run".to_string());
        }
        rsync.extend(request.excludes.iter().map(|p| format!("--exclude={p}")));

        let host = &self.options.host;
        match request.direction {
            SyncDirection::Push => {
                rsync.push("-e".to_string());
                rsync.push(self.rsync_shell());
                rsync.push(dir_arg(&request.source));
                rsync.push(format!("{host}:{}", dir_arg(&request.destination)));
                rsync
            }
            SyncDirection::Pull => {
                rsync.push("-e".to_string());
                rsync.push(self.rsync_shell());
                rsync.push(format!("{host}:{}", dir_arg(&request.source)));
                rsync.push(dir_arg(&request.destination));
                rsync
            }
            SyncDirection::Within => {
                rsync.push(dir_arg(&request.source));
                rsync.push(dir_arg(&request.destination));
                let argv: Vec<&str> = rsync.iter().map(String::as_str).collect();
                self.ssh_argv(&argv)
            }
        }
    }

    /// Value for rsync's `-e` flag.
    fn rsync_shell(&self) -> String {
        let mut parts = vec!["ssh".to_string()];
        parts.extend(
            self.options
                .args()
                .into_iter()
                .map(|a| shell_escape::escape(a.into()).to_string()),
        );
        parts.join(" ")
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    fn target(&self) -> &str {
        &self.options.host
    }

    async fn run(&self, argv: &[&str], limit: Duration) -> Result<CommandOutput, TransportError> {
        let cmd = self.ssh_argv(argv);
        let operation = format!("ssh {}", argv.first().copied().unwrap_or_default());
        tracing::debug!(target_host = %self.options.host, command = ?argv, "running remote command");

        let output = execute(&cmd, limit, &operation).await?;
        classify_exit(&self.options.host, None, output)
    }

    async fn sync_tree(&self, request: &SyncRequest) -> Result<SyncOutcome, TransportError> {
        let cmd = self.sync_argv(request);
        let operation = match request.direction {
            SyncDirection::Push => "rsync push",
            SyncDirection::Pull => "rsync pull",
            SyncDirection::Within => "remote rsync",
        };
        tracing::debug!(
            target_host = %self.options.host,
            source = %request.source,
            destination = %request.destination,
            dry_run = request.dry_run,
            "syncing tree"
        );

        let output = execute(&cmd, request.timeout, operation).await?;
        let output = classify_exit(&self.options.host, Some(request.direction), output)?;
        Ok(SyncOutcome::from_output(&output))
    }
}

/// Separate transport failures from commands that ran and failed.
///
/// `direction` is `None` for a plain remote command. ssh reports its own
/// failures as 255; rsync run locally (push and pull) also has exit codes
/// that mean the remote shell never came up. A remote rsync (`Within`) runs
/// behind ssh, so only 255 belongs to the transport there.
pub fn classify_exit(
    target: &str,
    direction: Option<SyncDirection>,
    output: CommandOutput,
) -> Result<CommandOutput, TransportError> {
    let transport_failed = match direction {
        Some(SyncDirection::Push | SyncDirection::Pull) => {
            RSYNC_CONNECTION_EXITS.contains(&output.exit_code)
        }
        Some(SyncDirection::Within) | None => output.exit_code == SSH_TRANSPORT_EXIT,
    };
    if transport_failed {
        return Err(TransportError::Connection {
            target: target.to_string(),
            exit_code: output.exit_code,
            detail: output.failure_detail(),
        });
    }
    Ok(output)
}

async fn execute(
    argv: &[String],
    limit: Duration,
    operation: &str,
) -> Result<CommandOutput, TransportError> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| TransportError::Terminated {
            operation: operation.to_string(),
        })?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = timeout(limit, cmd.output())
        .await
        .map_err(|_| TransportError::Timeout {
            operation: operation.to_string(),
            timeout: limit,
        })?
        .map_err(|source| TransportError::Spawn {
            program: program.clone(),
            source,
        })?;

    into_command_output(output, operation)
}

fn into_command_output(output: Output, operation: &str) -> Result<CommandOutput, TransportError> {
    let exit_code = output.status.code().ok_or_else(|| TransportError::Terminated {
        operation: operation.to_string(),
    })?;
    Ok(CommandOutput {
        exit_code,
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

/// Quote each argument so the remote shell sees the exact argv.
fn remote_command_line(argv: &[&str]) -> String {
    argv.iter()
        .map(|arg| shell_escape::escape(Cow::Borrowed(*arg)).to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// rsync copies directory contents only when the path ends in a slash.
fn dir_arg(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

/// Files named in `rsync -av` output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferListing {
    /// Files copied or updated
    pub files: Vec<String>,
    /// Files removed from the destination by `--delete`
    pub deleted: Vec<String>,
}

/// Split `rsync -av` output into transferred and deleted files.
///
/// Only rsync's own header and summary lines are dropped; directory entries
/// are skipped.
pub fn parse_transfer_listing(stdout: &str) -> TransferListing {
    let mut listing = TransferListing::default();
    for line in stdout.lines().map(str::trim_end) {
        if line.is_empty() || is_rsync_banner(line) {
            continue;
        }
        match line.strip_prefix("deleting ") {
            Some(path) if !path.ends_with('/') => listing.deleted.push(path.to_string()),
            Some(_) => {}
            None if line.ends_with('/') => {}
            None => listing.files.push(line.to_string()),
        }
    }
    listing
}

fn is_rsync_banner(line: &str) -> bool {
    matches!(
        line,
        "sending incremental file list" | "receiving incremental file list" | "receiving file list"
    ) || line.starts_with("building file list ...")
        || line.starts_with("created directory ")
        || is_sent_summary(line)
        || line
            .strip_prefix("total size is ")
            .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
}

/// `sent 1,234 bytes  received 56 bytes  2,580.00 bytes/sec`
fn is_sent_summary(line: &str) -> bool {
    line.strip_prefix("sent ")
        .and_then(|rest| rest.split_once(" bytes"))
        .is_some_and(|(count, _)| {
            !count.is_empty()
                && count
                    .chars()
                    .all(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | 'K' | 'M' | 'G' | 'T'))
        })
}
