use super::render_command;
use crate::cli::ReconstructArgs;
use crate::config::builder::build_reconstruct;
use crate::config::defaults::MANIFEST_FILE_NAME;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use reliontomo::core::forms::RECONSTRUCT_PROTOCOL;
use reliontomo::core::models::{RunDirectory, SourceRelation, Tomogram};
use reliontomo::engine::config::ReconstructConfig;
use reliontomo::engine::progress::{Progress, ProgressReporter};
use reliontomo::engine::{builders, runner::ProcessRunner};
use reliontomo::workflows::{self, reconstruct::ReconstructResult};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Outputs of a reconstruction run, as written to `outputs.toml`.
#[derive(Serialize, Debug)]
struct OutputManifest<'a> {
    protocol: &'static str,
    summary: Vec<String>,
    tomogram: &'a Tomogram,
    relation: &'a SourceRelation,
}

pub fn run(args: ReconstructArgs, environment: Option<&Path>) -> Result<()> {
    let app = build_reconstruct(&args, environment)?;

    if app.dry_run {
        let invocation = builders::reconstruct_invocation(&app.protocol, &app.run_dir);
        println!("{}", render_command(&app.environment, &invocation));
        return Ok(());
    }

    let runner = ProcessRunner::new(app.environment).with_log_dir(app.run_dir.root().join("logs"));
    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Reconstructing tomogram {}...", app.protocol.tomo_id);
    info!("Invoking the reconstruction workflow...");
    let result = workflows::reconstruct::run(&app.protocol, &app.run_dir, &runner, &reporter)?;

    let manifest = write_manifest(&app.protocol, &app.run_dir, &result, &reporter)?;
    for line in workflows::reconstruct::summary(&app.protocol, true) {
        println!("{}", line);
    }
    println!("✓ Outputs recorded in: {}", manifest.display());
    Ok(())
}

fn write_manifest(
    config: &ReconstructConfig,
    run_dir: &RunDirectory,
    result: &ReconstructResult,
    reporter: &ProgressReporter,
) -> Result<PathBuf> {
    let manifest = OutputManifest {
        protocol: RECONSTRUCT_PROTOCOL,
        summary: workflows::reconstruct::summary(config, true),
        tomogram: &result.tomogram,
        relation: &result.relation,
    };
    let content = toml::to_string_pretty(&manifest)
        .map_err(|e| CliError::Other(anyhow::anyhow!("Failed to serialize outputs: {}", e)))?;

    let path = run_dir.root().join(MANIFEST_FILE_NAME);
    std::fs::write(&path, content)?;
    info!("Wrote output manifest to {:?}", path);
    reporter.report(Progress::Message(format!(
        "Recorded {} for {}",
        MANIFEST_FILE_NAME, config.tomo_id
    )));
    Ok(path)
}
