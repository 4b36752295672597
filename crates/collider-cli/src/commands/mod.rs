pub mod alloc;
pub mod options;
pub mod responders;

use std::path::PathBuf;

use collider_server::ServerOptions;

use crate::error::CliError;

/// Loads options from `config`, or falls back to the defaults.
pub fn load_options(config: Option<PathBuf>) -> Result<ServerOptions, CliError> {
    match config {
        Some(path) => Ok(ServerOptions::load(&path)?),
        None => {
            log::debug!("No options file given, using defaults");
            Ok(ServerOptions::default())
        }
    }
}
