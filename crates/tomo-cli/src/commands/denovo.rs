use super::render_command;
use crate::cli::DeNovoArgs;
use crate::config::builder::build_de_novo;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use reliontomo::engine::{builders, progress::ProgressReporter, runner::ProcessRunner};
use reliontomo::workflows;
use std::path::Path;
use tracing::info;

pub fn run(args: DeNovoArgs, environment: Option<&Path>) -> Result<()> {
    let app = build_de_novo(&args, environment)?;

    if app.dry_run {
        let invocation = builders::de_novo_invocation(&app.protocol, &app.run_dir);
        println!("{}", render_command(&app.environment, &invocation));
        return Ok(());
    }

    let runner = ProcessRunner::new(app.environment).with_log_dir(app.run_dir.root().join("logs"));
    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Starting de novo initial model generation...");
    info!("Invoking the de novo workflow...");
    let result = workflows::de_novo::run(&app.protocol, &app.run_dir, &runner, &reporter)?;

    println!(
        "✓ Initial model and iteration files written to: {}",
        result.output_dir.display()
    );
    Ok(())
}
