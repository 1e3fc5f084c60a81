//! Interactive prompts.
//!
//! Uses dialoguer for terminal UI prompts.

use std::path::Path;

use anyhow::Context;
use console::style;
use dialoguer::{Confirm, theme::ColorfulTheme};

/// Ask before `init --force` deletes an existing directory.
pub fn confirm_overwrite(path: &Path) -> anyhow::Result<bool> {
    eprintln!(
        "{} {} already exists and will be deleted.",
        style("warning:").yellow().bold(),
        style(path.display()).bold()
    );
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Delete it and re-initialize from the controller?")
        .default(false)
        .interact()
        .context("Confirmation prompt failed (use --yes when not running in a terminal)")
}
