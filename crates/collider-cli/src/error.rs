use miette::Diagnostic;
use thiserror::Error;

use collider_osc::OscError;
use collider_server::ConfigError;

/// CLI-specific error type that provides rich diagnostics
#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("Failed to load server options")]
    #[diagnostic(code(collider::cli::config), help("check the file passed with --config"))]
    Config(#[from] ConfigError),

    #[error("Failed to register a reply listener")]
    #[diagnostic(code(collider::cli::responder))]
    Responder(#[from] OscError),

    #[error("{what} space exhausted after {granted} allocations")]
    #[diagnostic(code(collider::cli::exhausted), help("raise the matching count in the options file"))]
    Exhausted { what: &'static str, granted: u32 },

    #[error("Worker thread panicked: {0}")]
    #[diagnostic(code(collider::cli::thread))]
    ThreadPanicked(String),
}
