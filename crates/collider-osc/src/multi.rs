use std::net::SocketAddr;
use std::panic;
use std::sync::{Arc, Weak};

use fxhash::FxHashMap;
use parking_lot::{Mutex, MutexGuard};

use crate::message::{canonical_command, Message, Timestamp};
use crate::node::ResponderNode;
use crate::transport::{PacketListener, Transport};

/// Listener bookkeeping for one endpoint. Only touched under the
/// multiplexer's lock.
#[derive(Default)]
pub(crate) struct Registry {
    all: Vec<ResponderNode>,
    by_command: FxHashMap<String, Vec<ResponderNode>>,
    pub(crate) disposed: bool,
}

impl Registry {
    pub(crate) fn add_node(&mut self, node: &ResponderNode) {
        self.all.push(node.clone());
        self.by_command
            .entry(node.command().to_string())
            .or_insert_with(|| Vec::with_capacity(4))
            .push(node.clone());
    }

    pub(crate) fn remove_node(&mut self, node: &ResponderNode) {
        if let Some(nodes) = self.by_command.get_mut(node.command()) {
            nodes.retain(|n| !n.ptr_eq(node));
            if nodes.is_empty() {
                self.by_command.remove(node.command());
            }
        }
        self.all.retain(|n| !n.ptr_eq(node));
        if self.all.is_empty() {
            self.by_command.clear();
        }
    }

    fn clear(&mut self) -> Vec<ResponderNode> {
        self.by_command.clear();
        std::mem::take(&mut self.all)
    }
}

/// Forwards transport deliveries to the multiplexer without keeping it alive.
struct Inbound(Weak<MultiResponder>);

impl PacketListener for Inbound {
    fn message_received(&self, message: &Message, sender: SocketAddr, time: Timestamp) {
        if let Some(multi) = self.0.upgrade() {
            multi.dispatch(message, sender, time);
        }
    }
}

/// Fans the inbound messages of one endpoint out to [`ResponderNode`]s,
/// keyed by command name.
///
/// Holds the one subscription to its transport for as long as it lives;
/// [`dispose`](MultiResponder::dispose) tears it down. Obtain instances
/// through [`crate::ResponderRegistry`] so each endpoint gets exactly one.
pub struct MultiResponder {
    transport: Arc<dyn Transport>,
    inbound: Arc<dyn PacketListener>,
    registry: Mutex<Registry>,
}

impl std::fmt::Debug for MultiResponder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiResponder")
            .field("endpoint", &self.transport.endpoint())
            .finish_non_exhaustive()
    }
}

impl MultiResponder {
    /// Creates a multiplexer and subscribes it to `transport`.
    pub(crate) fn new(transport: Arc<dyn Transport>) -> Arc<Self> {
        let multi = Arc::new_cyclic(|weak| MultiResponder {
            transport,
            inbound: Arc::new(Inbound(weak.clone())),
            registry: Mutex::new(Registry::default()),
        });
        multi.transport.add_listener(Arc::clone(&multi.inbound));
        log::debug!("Reply multiplexer subscribed to {}", multi.endpoint());
        multi
    }

    pub fn endpoint(&self) -> SocketAddr {
        self.transport.endpoint()
    }

    /// The lock shared by this multiplexer and all of its nodes.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock()
    }

    /// Number of registered listeners across all commands.
    pub fn listener_count(&self) -> usize {
        self.registry.lock().all.len()
    }

    /// Number of listeners registered for `command`.
    pub fn listener_count_for(&self, command: &str) -> usize {
        let command = canonical_command(command);
        self.registry.lock().by_command.get(&*command).map_or(0, Vec::len)
    }

    pub fn is_disposed(&self) -> bool {
        self.registry.lock().disposed
    }

    /// Delivers one inbound message to every listener registered for its
    /// command name.
    ///
    /// The matching listeners are copied out under the lock and invoked
    /// afterwards, in registration order. Each call owns its snapshot, so
    /// concurrent dispatches never share iteration state. A panicking
    /// callback is logged and does not stop the remaining ones.
    pub fn dispatch(&self, message: &Message, sender: SocketAddr, time: Timestamp) {
        let command = canonical_command(message.name());
        let snapshot: Vec<ResponderNode> = {
            let registry = self.registry.lock();
            match registry.by_command.get(&*command) {
                Some(nodes) => nodes.clone(),
                None => return,
            }
        };

        for node in &snapshot {
            if let Err(payload) = node.deliver(message, sender, time) {
                log::error!(
                    "Responder for {} on {} panicked: {}",
                    command,
                    self.endpoint(),
                    panic_message(&*payload)
                );
            }
        }
    }

    /// Unsubscribes from the transport and drops every listener.
    ///
    /// Nodes still holding a handle are left unregistered; adding them again
    /// fails with [`crate::OscError::Disposed`].
    pub fn dispose(&self) {
        let nodes = {
            let mut registry = self.registry.lock();
            if registry.disposed {
                return;
            }
            registry.disposed = true;
            let nodes = registry.clear();
            for node in &nodes {
                node.set_listening(false);
            }
            nodes
        };
        self.transport.remove_listener(&self.inbound);
        log::debug!(
            "Reply multiplexer for {} disposed, dropped {} listeners",
            self.endpoint(),
            nodes.len()
        );
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

/// Runs `f`, converting a panic into an `Err` carrying its payload.
pub(crate) fn catch<F: FnOnce()>(f: F) -> std::thread::Result<()> {
    panic::catch_unwind(panic::AssertUnwindSafe(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LocalTransport;

    fn addr() -> SocketAddr {
        "127.0.0.1:57110".parse().unwrap()
    }

    #[test]
    fn subscribes_once_and_unsubscribes_on_dispose() {
        let transport = Arc::new(LocalTransport::new(addr()));
        let multi = MultiResponder::new(transport.clone());
        assert_eq!(transport.listener_count(), 1);
        multi.dispose();
        multi.dispose();
        assert_eq!(transport.listener_count(), 0);
        assert!(multi.is_disposed());
    }

    #[test]
    fn remove_clears_command_index() {
        let transport = Arc::new(LocalTransport::new(addr()));
        let multi = MultiResponder::new(transport);
        let a = ResponderNode::new(&multi, "/done", |_, _, _, _| {});
        let b = ResponderNode::new(&multi, "/fail", |_, _, _, _| {});
        a.add().unwrap();
        b.add().unwrap();
        assert_eq!(multi.listener_count(), 2);
        assert_eq!(multi.listener_count_for("done"), 1);

        a.remove();
        assert_eq!(multi.listener_count_for("/done"), 0);
        b.remove();
        assert_eq!(multi.listener_count(), 0);
        assert!(multi.lock().by_command.is_empty());
    }

    #[test]
    fn panic_payload_is_readable() {
        let err = catch(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(&*err), "boom");
        let err = catch(|| panic!("{}", 42)).unwrap_err();
        assert_eq!(panic_message(&*err), "42");
    }
}
