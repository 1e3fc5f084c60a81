//! Init command: bootstrap a local repository from the production tree.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use git2::{IndexAddOption, Repository, Signature};
use serde::Serialize;

use crate::config::RemoteSettings;
use crate::remote::{RemoteExecutor, SyncDirection, SyncRequest};
use crate::tree::{GITIGNORE_TEMPLATE, PROTECTED_PATHS, count_documents};

/// Budget for the connectivity check.
pub const CONNECTIVITY_TIMEOUT: Duration = Duration::from_secs(10);

/// Budget for pulling the whole production tree.
pub const PULL_TIMEOUT: Duration = Duration::from_secs(300);

/// Options for the init command
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Where the local repository is created
    pub path: PathBuf,
    /// Replace an existing directory
    pub force: bool,
    /// Create the repository without pulling production
    pub skip_pull: bool,
}

impl InitOptions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            force: false,
            skip_pull: false,
        }
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_skip_pull(mut self, skip_pull: bool) -> Self {
        self.skip_pull = skip_pull;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InitReport {
    pub success: bool,
    pub path: PathBuf,
    pub target: String,
    pub files_pulled: usize,
    pub skipped_pull: bool,
    pub git_initialized: bool,
    /// Id of the initial commit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_commit: Option<String>,
    pub warnings: Vec<String>,
}

pub struct InitCommand<'a> {
    executor: &'a dyn RemoteExecutor,
    remote: &'a RemoteSettings,
}

impl<'a> InitCommand<'a> {
    pub fn new(executor: &'a dyn RemoteExecutor, remote: &'a RemoteSettings) -> Self {
        Self { executor, remote }
    }

    pub async fn execute(&self, options: &InitOptions) -> anyhow::Result<InitReport> {
        let path = &options.path;
        if path.exists() {
            if !options.force {
                anyhow::bail!(
                    "Path already exists: {} (use --force to overwrite)",
                    path.display()
                );
            }
            tracing::info!(path = %path.display(), "removing existing directory");
            std::fs::remove_dir_all(path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }

        self.check_connectivity().await?;
        self.check_production_dir().await?;

        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
        std::fs::write(path.join(".gitignore"), GITIGNORE_TEMPLATE)
            .with_context(|| format!("Failed to write .gitignore in {}", path.display()))?;

        let mut report = InitReport {
            success: true,
            path: path.clone(),
            target: self.executor.target().to_string(),
            files_pulled: 0,
            skipped_pull: options.skip_pull,
            git_initialized: false,
            initial_commit: None,
            warnings: Vec::new(),
        };

        if !options.skip_pull {
            self.pull(path).await?;
            report.files_pulled = count_documents(path)?;
        }

        self.ensure_staging_dir(&mut report.warnings).await;

        match init_repository(path, self.executor.target()) {
            Ok(commit) => {
                report.git_initialized = true;
                match commit {
                    Ok(id) => report.initial_commit = Some(id),
                    Err(e) => report
                        .warnings
                        .push(format!("Initial commit failed: {e:#}")),
                }
            }
            Err(e) => report
                .warnings
                .push(format!("git init failed: {e:#}")),
        }

        Ok(report)
    }

    async fn check_connectivity(&self) -> anyhow::Result<()> {
        let output = self
            .executor
            .run(&["echo", "ok"], CONNECTIVITY_TIMEOUT)
            .await
            .with_context(|| format!("Cannot connect to {}", self.executor.target()))?;
        if !output.success() || !output.stdout.contains("ok") {
            anyhow::bail!(
                "Cannot connect to {}: {}",
                self.executor.target(),
                output.failure_detail()
            );
        }
        Ok(())
    }

    async fn check_production_dir(&self) -> anyhow::Result<()> {
        let output = self
            .executor
            .run(
                &["test", "-d", self.remote.config_path.as_str()],
                self.remote.command_timeout,
            )
            .await
            .context("Failed to check the production config directory")?;
        if !output.success() {
            anyhow::bail!(
                "Config directory not found on {}: {}",
                self.executor.target(),
                self.remote.config_path
            );
        }
        Ok(())
    }

    async fn pull(&self, path: &Path) -> anyhow::Result<()> {
        let excludes: Vec<String> = PROTECTED_PATHS
            .iter()
            .map(|p| p.to_string())
            .chain(self.remote.staging_exclude())
            .collect();
        let request = SyncRequest::new(
            SyncDirection::Pull,
            self.remote.config_path.clone(),
            path.display().to_string(),
            PULL_TIMEOUT,
        )
        .with_excludes(excludes);

        let outcome = self
            .executor
            .sync_tree(&request)
            .await
            .context("Failed to pull config")?;
        if !outcome.success {
            anyhow::bail!("Failed to pull config: {}", outcome.detail.trim_end());
        }
        Ok(())
    }

    async fn ensure_staging_dir(&self, warnings: &mut Vec<String>) {
        let argv = ["mkdir", "-p", self.remote.staging_path.as_str()];
        let problem = match self.executor.run(&argv, self.remote.command_timeout).await {
            Ok(output) if output.success() => return,
            Ok(output) => output.failure_detail(),
            Err(e) => e.to_string(),
        };
        tracing::warn!(error = %problem, "could not create staging directory");
        warnings.push(format!(
            "Could not create staging directory {}: {}",
            self.remote.staging_path, problem
        ));
    }
}

/// Initialize a repository and commit everything not ignored.
///
/// The outer error means `git init` itself failed; the inner one that the
/// repository exists but the initial commit could not be written.
fn init_repository(path: &Path, target: &str) -> anyhow::Result<anyhow::Result<String>> {
    let repo = Repository::init(path)
        .with_context(|| format!("Failed to initialize git repository in {}", path.display()))?;
    Ok(initial_commit(&repo, target))
}

fn initial_commit(repo: &Repository, target: &str) -> anyhow::Result<String> {
    let mut index = repo.index()?;
    index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
    index.write()?;
    let tree_id = index.write_tree()?;
    let tree = repo.find_tree(tree_id)?;

    let signature = match repo.signature() {
        Ok(signature) => signature,
        Err(_) => Signature::now("stagehand", "stagehand@localhost")?,
    };
    let message = format!("Initial commit: Home Assistant config from {target}");
    let oid = repo.commit(Some("HEAD"), &signature, &signature, &message, &tree, &[])?;
    Ok(oid.to_string())
}
