use std::path::PathBuf;

use crate::commands::load_options;
use crate::error::CliError;

pub fn handle_options(config: Option<PathBuf>) -> Result<(), CliError> {
    let options = load_options(config)?;
    print!("{}", options.to_toml_string()?);
    Ok(())
}
