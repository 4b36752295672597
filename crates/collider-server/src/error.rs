use std::path::PathBuf;

use collider_alloc::AllocError;
use thiserror::Error;

/// Errors raised while loading options or building server resources.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to {operation} {path}")]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid server options file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize server options: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid server options: {0}")]
    InvalidOptions(String),

    #[error(transparent)]
    Alloc(#[from] AllocError),
}
