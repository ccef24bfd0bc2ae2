use super::apply_set_values;
use super::defaults::{ENVIRONMENT_VAR, user_environment_path};
use super::file::RunFile;
use super::models::AppConfig;
use crate::cli::{DeNovoArgs, ReconstructArgs, RunArgs};
use crate::error::Result;
use reliontomo::core::forms::{de_novo_form, names, reconstruct_form};
use reliontomo::core::models::RunDirectory;
use reliontomo::core::params::{FormSchema, ParamValue, ParamValues};
use reliontomo::engine::config::{DeNovoConfig, ReconstructConfig};
use reliontomo::engine::runner::RelionEnvironment;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Merges defaults < run file < flags < `-S` overrides into a de novo configuration.
pub fn build_de_novo(
    args: &DeNovoArgs,
    environment: Option<&Path>,
) -> Result<AppConfig<DeNovoConfig>> {
    let schema = de_novo_form();
    let mut values = load_run_file(&schema, &args.run)?;

    if let Some(threads) = args.threads {
        values.set(names::NUMBER_OF_THREADS, ParamValue::Int(threads as i64));
    }
    if let Some(mpi) = args.mpi {
        values.set(names::NUMBER_OF_MPI, ParamValue::Int(mpi as i64));
    }

    let values = apply_set_values(&schema, values, &args.run.set_values)?;
    let resolved = schema.resolve(&values)?;
    let protocol = DeNovoConfig::from_params(&resolved)?;

    Ok(AppConfig {
        run_dir: RunDirectory::new(&args.run.output_dir),
        protocol,
        environment: load_environment(environment)?,
        dry_run: args.run.dry_run,
    })
}

/// Merges defaults < run file < flags < `-S` overrides into a reconstruction configuration.
pub fn build_reconstruct(
    args: &ReconstructArgs,
    environment: Option<&Path>,
) -> Result<AppConfig<ReconstructConfig>> {
    let schema = reconstruct_form();
    let mut values = load_run_file(&schema, &args.run)?;

    if let Some(tomo_id) = &args.tomo_id {
        values.set(names::TOMO_ID, ParamValue::Text(tomo_id.clone()));
    }
    if let Some(bin_factor) = args.bin_factor {
        values.set(names::BIN_FACTOR, ParamValue::Float(bin_factor));
    }
    if let Some(threads) = args.threads {
        values.set(names::NUMBER_OF_THREADS, ParamValue::Int(threads as i64));
    }

    let values = apply_set_values(&schema, values, &args.run.set_values)?;
    let resolved = schema.resolve(&values)?;
    let protocol = ReconstructConfig::from_params(&resolved)?;

    Ok(AppConfig {
        run_dir: RunDirectory::new(&args.run.output_dir),
        protocol,
        environment: load_environment(environment)?,
        dry_run: args.run.dry_run,
    })
}

fn load_run_file(schema: &FormSchema, run: &RunArgs) -> Result<ParamValues> {
    info!("Loading run file from {:?}", run.config);
    let base_dir = run.config.parent().unwrap_or(Path::new(""));
    RunFile::from_file(&run.config)?.into_values(schema, base_dir)
}

fn load_environment(flag: Option<&Path>) -> Result<RelionEnvironment> {
    let env_value = std::env::var(ENVIRONMENT_VAR).ok();
    match environment_path(flag, env_value, user_environment_path()) {
        Some(path) => {
            info!("Using RELION environment from {:?}", path);
            Ok(RelionEnvironment::load(&path)?)
        }
        None => {
            debug!("No RELION environment file found; resolving programs through PATH.");
            Ok(RelionEnvironment::default())
        }
    }
}

/// Picks the environment file: explicit flag, then the environment variable, then the
/// per-user file when it exists.
fn environment_path(
    flag: Option<&Path>,
    env_value: Option<String>,
    user_path: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(path) = flag {
        return Some(path.to_path_buf());
    }
    if let Some(value) = env_value.filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(value));
    }
    user_path.filter(|p| p.is_file())
}
