//! Remote execution transport.
//!
//! Two operations cover everything the pipeline does on the controller:
//! running a command and mirroring a directory tree. Callers get a
//! [`TransportError`] when the transport itself failed (spawn, connection,
//! authentication, timeout) and an `Ok` result carrying the exit code when the
//! remote side ran and reported its own failure.

pub mod ssh;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use ssh::{SshExecutor, SshOptions, TransferListing, classify_exit, parse_transfer_listing};

/// Transport-level failures.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{operation} timed out after {}s", .timeout.as_secs())]
    Timeout {
        operation: String,
        timeout: Duration,
    },

    #[error("connection to {target} failed (exit {exit_code}): {detail}")]
    Connection {
        target: String,
        exit_code: i32,
        detail: String,
    },

    #[error("{operation} was terminated by a signal")]
    Terminated { operation: String },
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Captured result of a command that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stderr when present, otherwise a generic exit-code message.
    pub fn failure_detail(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            format!("command failed with exit code {}", self.exit_code)
        } else {
            stderr.to_string()
        }
    }
}

/// Which side of the transport holds the source and destination trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    /// Local directory to a path on the controller
    Push,
    /// Path on the controller to a local directory
    Pull,
    /// Both paths on the controller; the sync runs remotely
    Within,
}

/// A tree synchronization request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub direction: SyncDirection,
    pub source: String,
    pub destination: String,
    pub excludes: Vec<String>,
    /// Remove destination files absent from the source
    pub delete: bool,
    pub dry_run: bool,
    pub timeout: Duration,
}

impl SyncRequest {
    pub fn new(
        direction: SyncDirection,
        source: impl Into<String>,
        destination: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            direction,
            source: source.into(),
            destination: destination.into(),
            excludes: Vec::new(),
            delete: false,
            dry_run: false,
            timeout,
        }
    }

    pub fn with_excludes(mut self, excludes: Vec<String>) -> Self {
        self.excludes = excludes;
        self
    }

    pub fn with_delete(mut self, delete: bool) -> Self {
        self.delete = delete;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Result of a sync that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub success: bool,
    pub exit_code: i32,
    /// Raw output on success, raw error text on failure
    pub detail: String,
    /// Files listed by rsync as transferred
    pub transferred: Vec<String>,
    /// Files rsync removed from the destination
    #[serde(default)]
    pub deleted: Vec<String>,
}

impl SyncOutcome {
    pub fn from_output(output: &CommandOutput) -> Self {
        if output.success() {
            let listing = parse_transfer_listing(&output.stdout);
            Self {
                success: true,
                exit_code: 0,
                detail: output.stdout.clone(),
                transferred: listing.files,
                deleted: listing.deleted,
            }
        } else {
            let detail = if output.stderr.trim().is_empty() {
                format!("rsync failed with exit code {}", output.exit_code)
            } else {
                output.stderr.clone()
            };
            Self {
                success: false,
                exit_code: output.exit_code,
                detail,
                transferred: Vec::new(),
                deleted: Vec::new(),
            }
        }
    }
}

/// Join a file name onto a remote directory path.
pub fn remote_join(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name)
}

/// Execution transport to the controller host.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Human-readable remote target, e.g. `root@homeassistant.local`.
    fn target(&self) -> &str;

    /// Run `argv` on the controller.
    async fn run(&self, argv: &[&str], timeout: Duration) -> Result<CommandOutput, TransportError>;

    /// Mirror a directory tree according to `request`.
    async fn sync_tree(&self, request: &SyncRequest) -> Result<SyncOutcome, TransportError>;
}
