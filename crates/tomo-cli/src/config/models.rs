use reliontomo::core::models::RunDirectory;
use reliontomo::engine::runner::RelionEnvironment;

/// Everything a command needs once the run file, the flags and the environment are merged.
pub struct AppConfig<C> {
    pub run_dir: RunDirectory,
    pub protocol: C,
    pub environment: RelionEnvironment,
    pub dry_run: bool,
}
