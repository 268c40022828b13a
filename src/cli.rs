//! The command line interface for the program.
use crate::log;
use crate::model::build_model;
use crate::output::{DataWriter, OUTPUTS_DIR_NAME, create_output_directory};
use crate::settings::Settings;
use crate::system::System;
use ::log::info;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::{Path, PathBuf};

/// File name of the optional human-readable model dump
const MODEL_DUMP_FILE_NAME: &str = "model.txt";

/// The command line interface for the program.
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// The available commands.
    #[command(subcommand)]
    pub command: Commands,
}

/// The available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run a capacity-expansion model.
    Run {
        /// Path to the model directory (containing the `inputs` folder).
        model_dir: PathBuf,
        /// Directory for output files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Whether to write a human-readable dump of the assembled model
        #[arg(long)]
        debug_model: bool,
    },
}

/// Handle the `run` command.
pub fn handle_run_command(
    model_dir: &Path,
    output_dir: Option<&Path>,
    debug_model: bool,
) -> Result<()> {
    // Load model settings
    let mut settings = Settings::load(model_dir).context("Failed to load settings.")?;

    // This setting can be overridden by command-line argument
    if debug_model {
        settings.debug_model = true;
    }

    // Create output folder
    let output_path = match output_dir {
        Some(path) => path.to_owned(),
        None => model_dir.join(OUTPUTS_DIR_NAME),
    };
    create_output_directory(&output_path).context("Failed to create output directory.")?;

    // Initialise program logger
    if !log::is_logger_initialised() {
        log::init(settings.log_level.as_deref(), Some(&output_path))
            .context("Failed to initialise logging.")?;
    }

    // Load the system to optimise
    let system = System::from_path(model_dir).context("Failed to load model.")?;
    info!("Loaded model from {}", model_dir.display());
    info!("Output data will be written to {}", output_path.display());

    // Assemble the optimisation model
    let model = build_model(&system, &settings);
    if settings.debug_model {
        let mut file = File::create(output_path.join(MODEL_DUMP_FILE_NAME))?;
        model.write_debug(&mut file)?;
    }

    // Solve; on failure the termination status is surfaced and no result
    // files are written
    let solved = model.solve()?;

    let writer = DataWriter::create(&output_path)?;
    writer.write_results(&system, &solved)?;
    info!("Results written to {}", output_path.display());

    Ok(())
}
