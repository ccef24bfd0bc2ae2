mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod utils;

use crate::cli::{Cli, Commands};
use crate::error::Result;
use clap::Parser;
use tracing::{debug, error, info};

fn main() {
    if let Err(e) = run_app() {
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    info!("reliontomo CLI v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);

    let environment = cli.environment.as_deref();
    let command_result = match cli.command {
        Commands::Denovo(args) => {
            info!("Dispatching to 'denovo' command.");
            commands::denovo::run(args, environment)
        }
        Commands::Reconstruct(args) => {
            info!("Dispatching to 'reconstruct' command.");
            commands::reconstruct::run(args, environment)
        }
        Commands::Schema(args) => commands::schema::run(args),
    };

    match &command_result {
        Ok(()) => info!("Command completed successfully."),
        Err(e) => error!("Command failed: {}", e),
    }
    command_result
}
