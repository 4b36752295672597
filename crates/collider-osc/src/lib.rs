//! Collider-OSC: correlating asynchronous server replies with the callers
//! waiting for them.
//!
//! The synthesis server never echoes a request id. Completions arrive as
//! independent messages tagged only by a command name (`/done`, `/b_info`,
//! `/n_go`, ...). This crate fans one inbound stream out to the listeners
//! interested in each command name.
//!
//! # Architecture
//!
//! - [`Transport`]: the seam to the network layer. One receive thread
//!   pushes every inbound [`Message`] into the transport's listeners.
//! - [`MultiResponder`]: owns the single subscription to one transport and
//!   demultiplexes by command name.
//! - [`ResponderNode`]: one registered interest in one command name, with
//!   optional remove-after-first-match.
//! - [`ResponderRegistry`]: hands out exactly one [`MultiResponder`] per
//!   endpoint.
//!
//! # Thread Safety
//!
//! Registration, removal and the per-dispatch snapshot all run under one
//! lock per endpoint, shared by the multiplexer and its nodes. Callbacks run
//! outside that lock, so a callback may freely add or remove listeners.
//!
//! # Usage
//!
//! ```rust
//! use collider_osc::{LocalTransport, Message, ResponderRegistry, ResponderNode, Transport};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! let server = "127.0.0.1:57110".parse().unwrap();
//! let transport = Arc::new(LocalTransport::new(server));
//! let registry = ResponderRegistry::new();
//! let multi = registry.get_or_create(transport.clone());
//!
//! let hits = Arc::new(AtomicUsize::new(0));
//! let counter = hits.clone();
//! let node = ResponderNode::new(&multi, "/done", move |_node, _msg, _from, _time| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//! node.remove_after_first_match().add().unwrap();
//!
//! transport.post(Message::new("done", vec![]), server, 0);
//! transport.post(Message::new("/done", vec![]), server, 1);
//! transport.pump();
//! assert_eq!(hits.load(Ordering::SeqCst), 1);
//! assert!(!node.is_listening());
//! ```

mod error;
mod message;
mod multi;
mod node;
mod registry;
mod transport;

pub use error::OscError;
pub use message::{canonical_command, Arg, Message, Timestamp};
pub use multi::MultiResponder;
pub use node::{Action, ResponderNode};
pub use registry::ResponderRegistry;
pub use transport::{LocalTransport, PacketListener, Transport};
