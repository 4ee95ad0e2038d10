//! The command line interface for the dispatch model.
use crate::dispatch::DispatchProblem;
use crate::input::{get_input_dir, load_model};
use crate::log;
use crate::output::metadata::write_metadata;
use crate::output::{create_output_directory, get_output_dir, write_results};
use crate::settings::Settings;
use ::log::{info, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod demo;
use demo::DemoSubcommands;
pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for the dispatch model.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for selecting which inputs of a model to use
#[derive(Args, Default)]
pub struct InputOpts {
    /// Scenario subfolder of the model directory
    #[arg(long)]
    pub scenario: Option<String>,
    /// Weather year subfolder (within the scenario subfolder, if given)
    #[arg(long)]
    pub year: Option<String>,
}

/// Options for the run command
#[derive(Args, Default)]
pub struct RunOpts {
    /// Which inputs to use
    #[command(flatten)]
    pub input: InputOpts,
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
    /// Whether to write additional information to CSV files
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub debug_model: Option<bool>,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Build and solve a dispatch model.
    Run {
        /// Path to the model directory.
        model_dir: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Manage demo models.
    Demo {
        /// The available subcommands for managing demo models.
        #[command(subcommand)]
        subcommand: DemoSubcommands,
    },
    /// Validate a model by building its dispatch problem without solving it.
    Validate {
        /// The path to the model directory.
        model_dir: PathBuf,
        /// Which inputs to validate
        #[command(flatten)]
        opts: InputOpts,
    },
    /// Manage settings file.
    Settings {
        /// The subcommands for managing the settings file.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { model_dir, opts } => handle_run_command(&model_dir, &opts, None),
            Self::Demo { subcommand } => subcommand.execute(),
            Self::Validate { model_dir, opts } => {
                handle_validate_command(&model_dir, &opts, None)
            }
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and start the program
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ hourly_dispatch --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        // Output program help
        Cli::command().print_long_help()?;
        return Ok(());
    };

    command.execute()
}

/// Handle the `run` command.
pub fn handle_run_command(
    model_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    // Load program settings, if not provided
    let mut settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // These settings can be overridden by command-line arguments
    if let Some(debug_model) = opts.debug_model {
        settings.debug_model = debug_model;
    }
    if opts.overwrite {
        settings.overwrite = true;
    }

    let scenario = opts.input.scenario.as_deref();
    let year = opts.input.year.as_deref();
    let input_path = get_input_dir(model_path, scenario, year)?;

    // Get path to output folder
    let pathbuf: PathBuf;
    let output_path = if let Some(p) = opts.output_dir.as_deref() {
        p
    } else {
        pathbuf = get_output_dir(model_path, scenario, year, settings.results_root)?;
        &pathbuf
    };

    let overwrite =
        create_output_directory(output_path, settings.overwrite).with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    // Initialise program logger
    log::init(Some(settings.log_level.as_str()), Some(output_path))
        .context("Failed to initialise logging.")?;

    info!("Starting hourly_dispatch v{}", env!("CARGO_PKG_VERSION"));

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder will be overwritten");
    }

    // Load the model to run
    let model = load_model(&input_path).context("Failed to load model.")?;
    info!("Loaded model from {}", input_path.display());
    info!("Output folder: {}", output_path.display());

    // Build and solve the dispatch problem
    let problem = DispatchProblem::build(&model).context("Failed to build dispatch problem.")?;
    let solution = problem.solve()?;

    write_metadata(output_path, model_path, scenario, year)
        .context("Failed to save metadata.")?;
    write_results(output_path, &model, &solution, settings.debug_model)
        .context("Failed to save results.")?;
    info!("Run complete!");

    Ok(())
}

/// Handle the `validate` command.
pub fn handle_validate_command(
    model_path: &Path,
    opts: &InputOpts,
    settings: Option<Settings>,
) -> Result<()> {
    // Load program settings, if not provided
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // Initialise program logger (we won't save log files when running the validate command)
    log::init(Some(settings.log_level.as_str()), None).context("Failed to initialise logging.")?;

    // Load/validate the model and check that every constraint can be built
    let input_path = get_input_dir(model_path, opts.scenario.as_deref(), opts.year.as_deref())?;
    let model = load_model(&input_path).context("Failed to validate model.")?;
    DispatchProblem::build(&model).context("Failed to build dispatch problem.")?;
    info!("Model validation successful!");

    Ok(())
}
