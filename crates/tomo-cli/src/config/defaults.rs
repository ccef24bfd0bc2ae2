use directories::ProjectDirs;
use std::path::PathBuf;

/// Environment variable naming the RELION environment file.
pub const ENVIRONMENT_VAR: &str = "RELION_TOMO_ENV";

pub const ENVIRONMENT_FILE_NAME: &str = "relion.toml";

/// Manifest the `reconstruct` command writes into the run directory.
pub const MANIFEST_FILE_NAME: &str = "outputs.toml";

/// `relion.toml` inside the per-user configuration directory, if the platform has one.
pub fn user_environment_path() -> Option<PathBuf> {
    ProjectDirs::from("org", "scipion", "reliontomo")
        .map(|dirs| dirs.config_dir().join(ENVIRONMENT_FILE_NAME))
}
