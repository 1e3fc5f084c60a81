//! Stagehand - staged configuration deployment for Home Assistant
//!
//! Usage:
//!   stagehand deploy            # validate, stage, back up, promote, verify, reload
//!   stagehand deploy --dry-run  # preview the promotion only
//!   stagehand validate          # syntax check and push to staging
//!   stagehand init              # bootstrap a local repository from production
//!   stagehand backup            # trigger a backup
//!   stagehand check             # readiness checks

mod interactive;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stagehand_core::commands::{
    BackupCommand, BackupOptions, BackupReport, CheckCommand, CheckReport, InitCommand,
    InitOptions, InitReport, Severity, ValidateCommand, ValidateOptions, ValidateReport,
};
use stagehand_core::config::{ConfigStore, StagehandConfig};
use stagehand_core::controller::HttpController;
use stagehand_core::deploy::{DeployOptions, DeployPipeline, StepOutcome, render_text};
use stagehand_core::remote::SshExecutor;

#[derive(Parser)]
#[command(name = "stagehand", version)]
#[command(about = "Staged configuration deployment for Home Assistant", long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/stagehand/stagehand.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy the local config through staging into production
    Deploy(DeployArgs),

    /// Check YAML syntax and push to the staging directory
    Validate(ValidateArgs),

    /// Create a local git repository from the production config
    Init(InitArgs),

    /// Trigger a backup on the controller
    Backup(BackupArgs),

    /// Check that a deployment can run
    Check(CheckArgs),
}

#[derive(Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// Machine-readable JSON
    Json,
}

#[derive(Args)]
struct FormatArgs {
    /// Output format
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// Shorthand for --format json
    #[arg(long)]
    json: bool,
}

impl FormatArgs {
    fn resolve(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format
        }
    }
}

#[derive(Args)]
struct DeployArgs {
    /// Local config directory
    #[arg(long, short = 'p', value_name = "PATH")]
    local_path: Option<PathBuf>,

    /// SSH target, e.g. root@homeassistant.local
    #[arg(long)]
    host: Option<String>,

    /// Skip the backup before promotion (not recommended)
    #[arg(long)]
    no_backup: bool,

    /// Show what would change without touching production
    #[arg(long)]
    dry_run: bool,

    /// Additional pattern to protect from promotion (repeatable)
    #[arg(long = "exclude", value_name = "PATTERN")]
    exclude: Vec<String>,

    #[command(flatten)]
    output: FormatArgs,
}

#[derive(Args)]
struct ValidateArgs {
    /// Local config directory
    #[arg(long, short = 'p', value_name = "PATH")]
    local_path: Option<PathBuf>,

    /// SSH target, e.g. root@homeassistant.local
    #[arg(long)]
    host: Option<String>,

    /// Only check syntax locally
    #[arg(long)]
    skip_push: bool,

    #[command(flatten)]
    output: FormatArgs,
}

#[derive(Args)]
struct InitArgs {
    /// Directory to create
    #[arg(long, short = 'p', value_name = "PATH")]
    path: Option<PathBuf>,

    /// SSH target, e.g. root@homeassistant.local
    #[arg(long)]
    host: Option<String>,

    /// Replace an existing directory
    #[arg(long)]
    force: bool,

    /// Create the repository without pulling production
    #[arg(long)]
    skip_pull: bool,

    /// Do not ask before deleting an existing directory
    #[arg(long, short = 'y')]
    yes: bool,

    #[command(flatten)]
    output: FormatArgs,
}

#[derive(Args)]
struct BackupArgs {
    /// Return right after triggering the backup
    #[arg(long)]
    no_wait: bool,

    /// Seconds to wait for the backup to appear
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    #[command(flatten)]
    output: FormatArgs,
}

#[derive(Args)]
struct CheckArgs {
    /// SSH target, e.g. root@homeassistant.local
    #[arg(long)]
    host: Option<String>,

    #[command(flatten)]
    output: FormatArgs,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "stagehand=debug,info"
    } else {
        "stagehand=info,warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(cli.config.as_deref())?;

    let code = match cli.command {
        Commands::Deploy(args) => run_deploy(config, args).await?,
        Commands::Validate(args) => run_validate(config, args).await?,
        Commands::Init(args) => run_init(config, args).await?,
        Commands::Backup(args) => run_backup(config, args).await?,
        Commands::Check(args) => run_check(config, args).await?,
    };
    Ok(exit_code(code))
}

fn load_config(path: Option<&Path>) -> Result<StagehandConfig> {
    let store = match path {
        Some(path) => ConfigStore::from_path(path),
        None => ConfigStore::from_default_location()?,
    };
    let config = store.load_layered()?;
    tracing::debug!(path = %store.config_path().display(), "Loaded configuration");
    Ok(config)
}

fn override_host(config: &mut StagehandConfig, host: Option<String>) {
    if let Some(host) = host {
        config.remote.host = Some(host);
    }
}

fn exit_code(code: i32) -> ExitCode {
    if code == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(u8::try_from(code).unwrap_or(1))
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_deploy(mut config: StagehandConfig, args: DeployArgs) -> Result<i32> {
    override_host(&mut config, args.host);
    if let Some(path) = args.local_path {
        config.local.path = path;
    }

    let remote = config.remote_settings()?;
    let controller = HttpController::new(&config.controller_settings()?)?;
    let executor = SshExecutor::from_settings(&remote);

    let mut excludes = config.promote.extra_excludes.clone();
    excludes.extend(args.exclude);
    let options = DeployOptions::new(config.local_path())
        .with_backup(!args.no_backup)
        .with_dry_run(args.dry_run)
        .with_excludes(excludes);

    tracing::info!(
        host = %remote.host,
        local = %options.local_path.display(),
        dry_run = args.dry_run,
        "Starting deployment"
    );
    let pipeline = DeployPipeline::new(&executor, &controller, remote, config.backup_settings());
    let report = pipeline.run(&options).await;
    tracing::debug!(exit_code = report.exit_code(), "Deployment finished");

    match args.output.resolve() {
        OutputFormat::Text => println!("{}", render_text(&report)),
        OutputFormat::Json => print_json(&report)?,
    }
    Ok(report.exit_code())
}

async fn run_validate(mut config: StagehandConfig, args: ValidateArgs) -> Result<i32> {
    override_host(&mut config, args.host);
    if let Some(path) = args.local_path {
        config.local.path = path;
    }
    let options = ValidateOptions::new(config.local_path()).with_skip_push(args.skip_push);

    let report = if args.skip_push {
        ValidateCommand::local_only().execute(&options).await?
    } else {
        let remote = config.remote_settings()?;
        let executor = SshExecutor::from_settings(&remote);
        ValidateCommand::with_remote(&executor, &remote)
            .execute(&options)
            .await?
    };

    match args.output.resolve() {
        OutputFormat::Text => print_validate_report(&report),
        OutputFormat::Json => print_json(&report)?,
    }
    Ok(report.exit_code())
}

fn print_validate_report(report: &ValidateReport) {
    println!("Validating {}", report.path.display());
    for file in &report.yaml.files {
        match &file.error {
            None => println!("  ✓ {}", file.file),
            Some(error) => {
                println!("  ✗ {}", file.file);
                for line in error.lines() {
                    println!("      {}", line);
                }
            }
        }
    }

    if let Some(staging) = &report.staging {
        if staging.is_success() {
            println!(
                "✓ Pushed to staging ({} files transferred)",
                report.files_transferred
            );
        } else {
            println!("✗ Push to staging failed");
            if let Some(error) = &staging.error {
                println!("  {}", error.trim_end());
            }
        }
    }
    if let Some(secrets) = report.secrets.as_ref().filter(|s| s.outcome == StepOutcome::Skipped) {
        println!("  ⚠ {}", secrets.detail);
    }

    if report.valid {
        println!("{}", style("✓ Configuration valid").green());
    } else {
        println!(
            "{}",
            style(format!(
                "✗ Validation failed ({} files with errors)",
                report.yaml.error_count()
            ))
            .red()
        );
    }
}

async fn run_init(mut config: StagehandConfig, args: InitArgs) -> Result<i32> {
    override_host(&mut config, args.host);
    let path = args.path.unwrap_or_else(|| config.local_path());

    if path.exists() && args.force && !args.yes && !interactive::confirm_overwrite(&path)? {
        tracing::debug!(path = %path.display(), "Overwrite declined");
        println!("Init cancelled.");
        return Ok(0);
    }

    let remote = config.remote_settings()?;
    let executor = SshExecutor::from_settings(&remote);
    let options = InitOptions::new(path)
        .with_force(args.force)
        .with_skip_pull(args.skip_pull);
    let report = InitCommand::new(&executor, &remote).execute(&options).await?;

    match args.output.resolve() {
        OutputFormat::Text => print_init_report(&report),
        OutputFormat::Json => print_json(&report)?,
    }
    Ok(0)
}

fn print_init_report(report: &InitReport) {
    println!(
        "✓ Initialized {} from {}",
        report.path.display(),
        report.target
    );
    if report.skipped_pull {
        println!("  • Pull skipped");
    } else {
        println!("  Pulled {} YAML files", report.files_pulled);
    }
    match &report.initial_commit {
        Some(commit) => println!("  Initial commit {}", &commit[..commit.len().min(12)]),
        None if report.git_initialized => println!("  Git repository created without a commit"),
        None => {}
    }
    for warning in &report.warnings {
        println!("  ⚠ {}", warning);
    }
}

async fn run_backup(config: StagehandConfig, args: BackupArgs) -> Result<i32> {
    let controller = HttpController::new(&config.controller_settings()?)?;
    let options = BackupOptions {
        no_wait: args.no_wait,
        timeout: args.timeout.map(Duration::from_secs),
    };
    let report = BackupCommand::new(&controller, config.backup_settings())
        .execute(&options)
        .await;

    match args.output.resolve() {
        OutputFormat::Text => print_backup_report(&report),
        OutputFormat::Json => print_json(&report)?,
    }
    Ok(report.exit_code())
}

fn print_backup_report(report: &BackupReport) {
    let marker = if report.success { "✓" } else { "✗" };
    println!("{} {}", marker, report.message);
    if let Some(backup) = &report.backup {
        if let Some(name) = &backup.name {
            println!("  Name: {}", name);
        }
        if let Some(size) = backup.size_bytes {
            println!("  Size: {:.1} MiB", size as f64 / 1_048_576.0);
        }
    }
}

async fn run_check(mut config: StagehandConfig, args: CheckArgs) -> Result<i32> {
    override_host(&mut config, args.host);
    let remote = config.remote_settings()?;
    let controller = HttpController::new(&config.controller_settings()?)?;
    let executor = SshExecutor::from_settings(&remote);

    let report = CheckCommand::new(&executor, &controller, &remote)
        .execute()
        .await;

    match args.output.resolve() {
        OutputFormat::Text => print_check_report(&report),
        OutputFormat::Json => print_json(&report)?,
    }
    Ok(report.exit_code())
}

fn print_check_report(report: &CheckReport) {
    println!("Checking {}", report.target);
    for check in &report.checks {
        let marker = match check.severity {
            Severity::Ok => style("✓").green(),
            Severity::Warning => style("⚠").yellow(),
            Severity::Error => style("✗").red(),
        };
        println!("  {} {:<16} {}", marker, check.check, check.message);
        if let Some(hint) = check.remediation.as_ref().filter(|_| check.severity != Severity::Ok) {
            println!("      {}", style(hint).dim());
        }
    }
    if report.ready {
        println!("Ready to deploy.");
    } else {
        println!("Not ready: fix the errors above first.");
    }
}
