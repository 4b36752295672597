use std::net::SocketAddr;
use std::sync::Arc;

use fxhash::FxHashMap;
use parking_lot::Mutex;

use crate::multi::MultiResponder;
use crate::transport::Transport;

/// Keeps one [`MultiResponder`] per server endpoint, so redundant
/// subscriptions to the same transport are never created.
///
/// Construct one per client and pass it to whoever opens server
/// connections; there is no process-wide instance. Dropping the registry
/// disposes every multiplexer it still holds, so it must outlive the
/// listeners registered through it.
#[derive(Debug, Default)]
pub struct ResponderRegistry {
    multis: Mutex<FxHashMap<SocketAddr, Arc<MultiResponder>>>,
}

impl ResponderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the multiplexer for `transport`'s endpoint, creating and
    /// subscribing it on first use.
    pub fn get_or_create(&self, transport: Arc<dyn Transport>) -> Arc<MultiResponder> {
        let endpoint = transport.endpoint();
        let mut multis = self.multis.lock();
        if let Some(multi) = multis.get(&endpoint) {
            if !multi.is_disposed() {
                return Arc::clone(multi);
            }
            log::debug!("Replacing disposed reply multiplexer for {}", endpoint);
        }
        let multi = MultiResponder::new(transport);
        multis.insert(endpoint, Arc::clone(&multi));
        multi
    }

    pub fn get(&self, endpoint: SocketAddr) -> Option<Arc<MultiResponder>> {
        self.multis.lock().get(&endpoint).cloned()
    }

    /// Disposes and forgets the multiplexer for `endpoint`. Returns whether
    /// one existed.
    pub fn dispose(&self, endpoint: SocketAddr) -> bool {
        let removed = self.multis.lock().remove(&endpoint);
        match removed {
            Some(multi) => {
                multi.dispose();
                true
            }
            None => false,
        }
    }

    pub fn dispose_all(&self) {
        let multis: Vec<_> = self.multis.lock().drain().map(|(_, multi)| multi).collect();
        for multi in multis {
            multi.dispose();
        }
    }

    pub fn len(&self) -> usize {
        self.multis.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.multis.lock().is_empty()
    }
}

impl Drop for ResponderRegistry {
    fn drop(&mut self) {
        self.dispose_all();
    }
}
