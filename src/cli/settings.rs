//! The `settings` subcommands, for inspecting and editing the program settings file.
use crate::log::LOG_LEVEL_ENV_VAR;
use crate::settings::{Settings, get_settings_file_path};
use anyhow::{Context, Result};
use clap::Subcommand;
use std::env;
use std::fs;
use std::path::Path;

/// Subcommands for settings
#[derive(Subcommand)]
pub enum SettingsSubcommands {
    /// Edit the program settings file, creating it if needed
    Edit,
    /// Show where the settings file is read from
    Path,
    /// Write the contents of a placeholder `settings.toml` to the console
    DumpDefault,
}

impl SettingsSubcommands {
    /// Execute the supplied settings subcommand
    pub fn execute(self) -> Result<()> {
        let file_path = get_settings_file_path();
        match self {
            Self::Edit => handle_edit_command(&file_path)?,
            Self::Path => println!("{}", describe_settings_file(&file_path)),
            Self::DumpDefault => print!("{}", Settings::default_file_contents()),
        }

        Ok(())
    }
}

/// Write a placeholder settings file at `file_path` if there is no file there yet.
///
/// Returns whether a file was created.
fn ensure_settings_file_exists(file_path: &Path) -> Result<bool> {
    if file_path.is_file() {
        return Ok(false);
    }

    if let Some(dir_path) = file_path.parent() {
        fs::create_dir_all(dir_path)
            .with_context(|| format!("Failed to create directory: {}", dir_path.display()))?;
    }
    fs::write(file_path, Settings::default_file_contents())
        .with_context(|| format!("Failed to write settings file: {}", file_path.display()))?;

    Ok(true)
}

/// Open the settings file in a text editor, then check that it can still be loaded
fn handle_edit_command(file_path: &Path) -> Result<()> {
    if ensure_settings_file_exists(file_path)? {
        println!("Created settings file with default values");
    }

    println!("Opening settings file for editing: {}", file_path.display());
    edit::edit_file(file_path)?;

    let settings = Settings::load_from_path(file_path).with_context(|| {
        format!("Settings file is invalid; edit it again to fix: {}", file_path.display())
    })?;
    println!(
        "Settings saved. Results will be written under {}",
        settings.results_root.display()
    );

    Ok(())
}

/// The path of the settings file, with notes on how its values are applied
fn describe_settings_file(file_path: &Path) -> String {
    let mut out = file_path.display().to_string();
    if !file_path.is_file() {
        out.push_str("\n(file not present; default settings are used)");
    }
    if let Ok(level) = env::var(LOG_LEVEL_ENV_VAR) {
        out.push_str(&format!(
            "\n(log_level is overridden by {LOG_LEVEL_ENV_VAR}={level})"
        ));
    }

    out
}
