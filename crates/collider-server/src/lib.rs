//! Collider-Server: client-side bookkeeping for one synthesis server.
//!
//! [`ServerOptions`] describes the server's resource namespaces and is
//! usually loaded from a TOML file. [`ServerResources`] turns those options
//! into the allocators and the reply multiplexer a client needs to talk to
//! the server.

pub mod error;
pub mod options;
pub mod resources;

pub use error::ConfigError;
pub use options::ServerOptions;
pub use resources::ServerResources;
