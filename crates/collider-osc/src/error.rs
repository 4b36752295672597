use std::net::SocketAddr;
use thiserror::Error;

/// Errors raised while registering reply listeners.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OscError {
    /// `add()` was called on a listener that is already listening.
    #[error("Responder for {command} added twice.")]
    DuplicateRegistration { command: String },

    #[error("Reply multiplexer for {endpoint} has been disposed.")]
    Disposed { endpoint: SocketAddr },
}
