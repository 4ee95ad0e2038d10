//! Code related to the demo models and the CLI commands for interacting with them.
use super::{InputOpts, RunOpts, handle_run_command};
use crate::settings::Settings;
use anyhow::{Context, Result, ensure};
use clap::Subcommand;
use include_dir::{Dir, DirEntry, include_dir};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// The directory containing the demo models.
const DEMOS_DIR: Dir = include_dir!("demos");

/// The available subcommands for managing demo models.
#[derive(Subcommand)]
pub enum DemoSubcommands {
    /// List available demos.
    List,
    /// Provide information about the specified demo.
    Info {
        /// The name of the demo.
        name: String,
    },
    /// Extract a demo model configuration to a new directory.
    Extract {
        /// The name of the demo to extract.
        name: String,
        /// The destination folder for the demo.
        new_path: Option<PathBuf>,
    },
    /// Run a demo.
    Run {
        /// The name of the demo to run.
        name: String,
        /// Which inputs to use
        #[command(flatten)]
        input: InputOpts,
        /// Directory for output files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Whether to overwrite the output directory if it already exists
        #[arg(long)]
        overwrite: bool,
        /// Whether to write additional information to CSV files
        #[arg(long)]
        debug_model: bool,
    },
}

impl DemoSubcommands {
    /// Execute the supplied demo subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::List => handle_demo_list_command(),
            Self::Info { name } => handle_demo_info_command(&name)?,
            Self::Extract {
                name,
                new_path: dest,
            } => handle_demo_extract_command(&name, dest.as_deref())?,
            Self::Run {
                name,
                input,
                output_dir,
                overwrite,
                debug_model,
            } => {
                let opts = RunOpts {
                    input,
                    output_dir,
                    overwrite,
                    debug_model: debug_model.then_some(true),
                };
                handle_demo_run_command(&name, &opts, None)?;
            }
        }

        Ok(())
    }
}

/// Handle the `demo list` command.
fn handle_demo_list_command() {
    for entry in DEMOS_DIR.dirs() {
        println!("{}", entry.path().display());
    }
}

/// Handle the `demo info` command.
fn handle_demo_info_command(name: &str) -> Result<()> {
    let path: PathBuf = [name, "README.txt"].iter().collect();
    let readme = DEMOS_DIR
        .get_file(path)
        .context("Demo not found.")?
        .contents_utf8()
        .expect("README.txt is not UTF-8 encoded");

    println!("{readme}");

    Ok(())
}

/// Handle the `demo extract` command
fn handle_demo_extract_command(name: &str, dest: Option<&Path>) -> Result<()> {
    let dest = dest.unwrap_or(Path::new(name));
    extract_demo(name, dest)
}

/// Extract the specified demo to a new directory
pub fn extract_demo(name: &str, new_path: &Path) -> Result<()> {
    // Find the subdirectory in DEMOS_DIR whose name matches `name`.
    let sub_dir = DEMOS_DIR.get_dir(name).context("Demo not found.")?;

    ensure!(
        !new_path.exists(),
        "Destination directory {} already exists",
        new_path.display()
    );

    copy_dir(sub_dir, new_path)
}

/// Copy the contents of an embedded directory, including scenario subfolders
fn copy_dir(dir: &Dir, new_path: &Path) -> Result<()> {
    fs::create_dir(new_path)?;
    for entry in dir.entries() {
        let file_name = entry
            .path()
            .file_name()
            .expect("Embedded paths always have a file name");
        let entry_path = new_path.join(file_name);
        match entry {
            DirEntry::Dir(sub_dir) => copy_dir(sub_dir, &entry_path)?,
            DirEntry::File(f) => fs::write(&entry_path, f.contents())?,
        }
    }

    Ok(())
}

/// Handle the `demo run` command.
pub fn handle_demo_run_command(
    name: &str,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let temp_dir = TempDir::new().context("Failed to create temporary directory.")?;
    let model_path = temp_dir.path().join(name);
    extract_demo(name, &model_path)?;
    handle_run_command(&model_path, opts, settings)
}
