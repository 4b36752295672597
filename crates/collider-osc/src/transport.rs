use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_queue::SegQueue;
use parking_lot::RwLock;

use crate::message::{Message, Timestamp};

/// Receives every message delivered by a [`Transport`].
pub trait PacketListener: Send + Sync {
    fn message_received(&self, message: &Message, sender: SocketAddr, time: Timestamp);
}

/// The inbound side of a connection to one server endpoint.
///
/// Connection lifecycle, encoding and the receive thread belong to the
/// implementation; the reply machinery only subscribes and unsubscribes.
pub trait Transport: Send + Sync {
    /// Identity of the remote endpoint. One [`crate::MultiResponder`] exists
    /// per distinct endpoint.
    fn endpoint(&self) -> SocketAddr;

    fn add_listener(&self, listener: Arc<dyn PacketListener>);

    /// Removes a listener previously passed to `add_listener`, compared by
    /// identity.
    fn remove_listener(&self, listener: &Arc<dyn PacketListener>);
}

#[inline]
pub(crate) fn same_listener(a: &Arc<dyn PacketListener>, b: &Arc<dyn PacketListener>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// In-process transport.
///
/// Any thread may [`post`](LocalTransport::post) messages; they queue up
/// until the receive thread calls [`pump`](LocalTransport::pump), which
/// delivers them to the listeners in arrival order.
pub struct LocalTransport {
    endpoint: SocketAddr,
    listeners: RwLock<Vec<Arc<dyn PacketListener>>>,
    inbox: SegQueue<(Message, SocketAddr, Timestamp)>,
    closed: AtomicBool,
}

impl std::fmt::Debug for LocalTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTransport")
            .field("endpoint", &self.endpoint)
            .field("listeners", &self.listeners.read().len())
            .field("queued", &self.inbox.len())
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish()
    }
}

impl LocalTransport {
    pub fn new(endpoint: SocketAddr) -> Self {
        Self {
            endpoint,
            listeners: RwLock::new(Vec::new()),
            inbox: SegQueue::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Queues a message for the receive thread. Messages posted after
    /// [`close`](LocalTransport::close) are dropped.
    pub fn post(&self, message: Message, sender: SocketAddr, time: Timestamp) {
        if self.closed.load(Ordering::Acquire) {
            log::debug!("Dropping {} posted to closed transport {}", message.name(), self.endpoint);
            return;
        }
        self.inbox.push((message, sender, time));
    }

    /// Delivers every queued message to the current listeners and returns
    /// how many messages were delivered.
    ///
    /// Listeners are snapshotted per message, so a listener added during
    /// delivery sees the next message.
    pub fn pump(&self) -> usize {
        let mut delivered = 0;
        while let Some((message, sender, time)) = self.inbox.pop() {
            let listeners = self.listeners.read().clone();
            for listener in &listeners {
                listener.message_received(&message, sender, time);
            }
            delivered += 1;
        }
        delivered
    }

    pub fn pending(&self) -> usize {
        self.inbox.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Stops accepting new messages and discards anything still queued.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        while self.inbox.pop().is_some() {}
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Transport for LocalTransport {
    fn endpoint(&self) -> SocketAddr {
        self.endpoint
    }

    fn add_listener(&self, listener: Arc<dyn PacketListener>) {
        self.listeners.write().push(listener);
    }

    fn remove_listener(&self, listener: &Arc<dyn PacketListener>) {
        self.listeners.write().retain(|l| !same_listener(l, listener));
    }
}
