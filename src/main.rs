//! Provides the main entry point to the capgrid program.
use anyhow::Result;
use capgrid::cli::{Cli, Commands, handle_run_command};
use clap::Parser;

/// The main entry point to the program
fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            model_dir,
            output_dir,
            debug_model,
        } => handle_run_command(&model_dir, output_dir.as_deref(), debug_model),
    }
}
