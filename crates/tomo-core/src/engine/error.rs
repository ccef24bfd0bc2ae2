use super::header::HeaderError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Program '{program}' failed: {status}")]
    ProgramFailed { program: String, status: String },

    #[error("Invalid volume header in {path:?}: {source}")]
    Header {
        path: PathBuf,
        #[source]
        source: HeaderError,
    },

    #[error("Failed to load RELION environment from {path:?}: {reason}")]
    Environment { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
