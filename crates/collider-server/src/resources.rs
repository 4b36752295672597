use std::net::SocketAddr;
use std::sync::Arc;

use collider_alloc::{BlockAllocator, BlockAllocatorFactory, NodeId, NodeIdAllocator, PowerOfTwoFactory};
use collider_osc::{Message, MultiResponder, ResponderNode, ResponderRegistry, Timestamp, Transport};

use crate::error::ConfigError;
use crate::options::ServerOptions;

/// Everything a client allocates against one server.
///
/// Audio buses below [`ServerOptions::first_private_bus`] belong to the
/// hardware and are never handed out. All allocators are independent
/// instances; operations on different namespaces are not ordered against
/// each other.
pub struct ServerResources {
    options: ServerOptions,
    audio_buses: Box<dyn BlockAllocator>,
    control_buses: Box<dyn BlockAllocator>,
    buffers: Box<dyn BlockAllocator>,
    node_ids: NodeIdAllocator,
    multi: Arc<MultiResponder>,
}

impl std::fmt::Debug for ServerResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerResources")
            .field("options", &self.options)
            .field("multi", &self.multi)
            .finish_non_exhaustive()
    }
}

impl ServerResources {
    /// Builds power-of-two allocators for `options` and attaches to the
    /// reply multiplexer of `transport`'s endpoint.
    pub fn new(
        options: ServerOptions,
        transport: Arc<dyn Transport>,
        registry: &ResponderRegistry,
    ) -> Result<Self, ConfigError> {
        Self::with_factory(options, transport, registry, &PowerOfTwoFactory)
    }

    /// Like [`ServerResources::new`], with a custom allocation strategy for
    /// buses and buffers.
    pub fn with_factory(
        options: ServerOptions,
        transport: Arc<dyn Transport>,
        registry: &ResponderRegistry,
        factory: &dyn BlockAllocatorFactory,
    ) -> Result<Self, ConfigError> {
        options.validate()?;
        if transport.endpoint() != options.address {
            log::warn!(
                "Transport endpoint {} differs from configured server address {}",
                transport.endpoint(),
                options.address
            );
        }

        let node_ids = NodeIdAllocator::new(options.client_id)?;
        let audio_buses =
            factory.create_with_base(options.num_audio_bus_channels, options.first_private_bus());
        let control_buses = factory.create(options.num_control_bus_channels);
        let buffers = factory.create(options.num_buffers);
        let multi = registry.get_or_create(transport);

        log::info!(
            "Server resources for {}: {} audio buses ({} private), {} control buses, {} buffers, client {}",
            multi.endpoint(),
            options.num_audio_bus_channels,
            options.num_audio_bus_channels - options.first_private_bus(),
            options.num_control_bus_channels,
            options.num_buffers,
            options.client_id
        );

        Ok(Self { options, audio_buses, control_buses, buffers, node_ids, multi })
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    pub fn endpoint(&self) -> SocketAddr {
        self.multi.endpoint()
    }

    pub fn audio_buses(&self) -> &dyn BlockAllocator {
        self.audio_buses.as_ref()
    }

    pub fn control_buses(&self) -> &dyn BlockAllocator {
        self.control_buses.as_ref()
    }

    pub fn buffers(&self) -> &dyn BlockAllocator {
        self.buffers.as_ref()
    }

    pub fn node_ids(&self) -> &NodeIdAllocator {
        &self.node_ids
    }

    pub fn multi(&self) -> &Arc<MultiResponder> {
        &self.multi
    }

    pub fn alloc_audio_bus(&self, channels: u32) -> Option<u32> {
        self.audio_buses.alloc(channels)
    }

    pub fn free_audio_bus(&self, index: u32) {
        self.audio_buses.free(index)
    }

    pub fn alloc_control_bus(&self, channels: u32) -> Option<u32> {
        self.control_buses.alloc(channels)
    }

    pub fn free_control_bus(&self, index: u32) {
        self.control_buses.free(index)
    }

    /// Reserves `count` consecutive buffer numbers.
    pub fn alloc_buffer(&self, count: u32) -> Option<u32> {
        self.buffers.alloc(count)
    }

    pub fn free_buffer(&self, number: u32) {
        self.buffers.free(number)
    }

    /// Frees every buffer block that is currently handed out and returns
    /// their first buffer numbers, in ascending order. The caller sends the
    /// matching free commands to the server.
    pub fn free_all_buffers(&self) -> Vec<u32> {
        let freed: Vec<u32> = self.buffers.list_in_use().iter().map(|block| block.address()).collect();
        for &number in &freed {
            self.buffers.free(number);
        }
        log::debug!("Freed {} buffer blocks on {}", freed.len(), self.endpoint());
        freed
    }

    pub fn next_node_id(&self) -> NodeId {
        self.node_ids.alloc()
    }

    pub fn next_perm_node_id(&self) -> NodeId {
        self.node_ids.alloc_perm()
    }

    pub fn reset_node_ids(&self) {
        self.node_ids.reset()
    }

    /// Creates an unregistered reply listener on this server's endpoint.
    pub fn responder<F>(&self, command: &str, action: F) -> ResponderNode
    where
        F: Fn(&ResponderNode, &Message, SocketAddr, Timestamp) + Send + Sync + 'static,
    {
        ResponderNode::new(&self.multi, command, action)
    }
}
