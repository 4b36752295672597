use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::OscError;
use crate::message::{canonical_command, Message, Timestamp};
use crate::multi::{catch, MultiResponder};

/// Callback run for every matching message. Receives the node itself so it
/// can inspect the arguments and `remove()` itself conditionally.
pub type Action = dyn Fn(&ResponderNode, &Message, SocketAddr, Timestamp) + Send + Sync;

struct NodeInner {
    command: String,
    action: Box<Action>,
    remove_after_first_match: AtomicBool,
    /// Written only while the multiplexer lock is held.
    listening: AtomicBool,
    multi: Arc<MultiResponder>,
}

/// A registered interest in one command name on one endpoint.
///
/// Lifecycle: `unregistered -> listening -> unregistered`. [`add`] moves to
/// listening and fails if the node is already there; [`remove`] is always
/// safe to call. A removed node may be added again.
///
/// Handles are cheap to clone; all clones refer to the same registration.
///
/// [`add`]: ResponderNode::add
/// [`remove`]: ResponderNode::remove
#[derive(Clone)]
pub struct ResponderNode {
    inner: Arc<NodeInner>,
}

impl std::fmt::Debug for ResponderNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponderNode")
            .field("command", &self.inner.command)
            .field("endpoint", &self.inner.multi.endpoint())
            .field(
                "remove_after_first_match",
                &self.inner.remove_after_first_match.load(Ordering::Relaxed),
            )
            .finish_non_exhaustive()
    }
}

impl ResponderNode {
    /// Creates an unregistered node listening for `command` on `multi`'s
    /// endpoint. The separator is optional: `"done"` and `"/done"` are the
    /// same command.
    pub fn new<F>(multi: &Arc<MultiResponder>, command: impl AsRef<str>, action: F) -> Self
    where
        F: Fn(&ResponderNode, &Message, SocketAddr, Timestamp) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(NodeInner {
                command: canonical_command(command.as_ref()).into_owned(),
                action: Box::new(action),
                remove_after_first_match: AtomicBool::new(false),
                listening: AtomicBool::new(false),
                multi: Arc::clone(multi),
            }),
        }
    }

    /// Canonical command name, always starting with `/`.
    pub fn command(&self) -> &str {
        &self.inner.command
    }

    pub fn multi(&self) -> &Arc<MultiResponder> {
        &self.inner.multi
    }

    /// Makes the node unregister itself on its first matching message.
    /// Set it before [`add`](ResponderNode::add).
    pub fn remove_after_first_match(&self) -> &Self {
        self.inner.remove_after_first_match.store(true, Ordering::Release);
        self
    }

    /// Registers the node with its multiplexer.
    ///
    /// # Errors
    /// - [`OscError::DuplicateRegistration`] if the node is already listening
    /// - [`OscError::Disposed`] if the multiplexer has been disposed
    pub fn add(&self) -> Result<&Self, OscError> {
        let mut registry = self.inner.multi.lock();
        if registry.disposed {
            return Err(OscError::Disposed { endpoint: self.inner.multi.endpoint() });
        }
        if self.inner.listening.load(Ordering::Acquire) {
            return Err(OscError::DuplicateRegistration { command: self.inner.command.clone() });
        }
        registry.add_node(self);
        self.inner.listening.store(true, Ordering::Release);
        Ok(self)
    }

    /// Unregisters the node. Removing an unregistered node does nothing.
    pub fn remove(&self) -> &Self {
        let mut registry = self.inner.multi.lock();
        self.inner.listening.store(false, Ordering::Release);
        registry.remove_node(self);
        self
    }

    pub fn is_listening(&self) -> bool {
        let _registry = self.inner.multi.lock();
        self.inner.listening.load(Ordering::Acquire)
    }

    pub(crate) fn set_listening(&self, listening: bool) {
        self.inner.listening.store(listening, Ordering::Release);
    }

    pub(crate) fn ptr_eq(&self, other: &ResponderNode) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Runs the action for one matching message.
    ///
    /// The listening check and, for one-shot nodes, the removal happen in
    /// one critical section before the action runs. Of several dispatches
    /// that snapshotted the same one-shot node, exactly one gets to run it.
    pub(crate) fn deliver(
        &self,
        message: &Message,
        sender: SocketAddr,
        time: Timestamp,
    ) -> std::thread::Result<()> {
        {
            let mut registry = self.inner.multi.lock();
            if !self.inner.listening.load(Ordering::Acquire) {
                return Ok(());
            }
            if self.inner.remove_after_first_match.load(Ordering::Acquire) {
                self.inner.listening.store(false, Ordering::Release);
                registry.remove_node(self);
            }
        }
        catch(|| (self.inner.action)(self, message, sender, time))
    }
}
