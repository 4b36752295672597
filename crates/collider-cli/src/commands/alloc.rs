use std::path::PathBuf;
use std::sync::Arc;

use collider_osc::{LocalTransport, ResponderRegistry};
use collider_server::ServerResources;

use crate::commands::load_options;
use crate::error::CliError;

pub fn handle_alloc(config: Option<PathBuf>, buses: u32, buffers: u32, nodes: u32) -> Result<(), CliError> {
    let options = load_options(config)?;
    let transport = Arc::new(LocalTransport::new(options.address));
    let registry = ResponderRegistry::new();
    let server = ServerResources::new(options, transport, &registry)?;

    println!("Server {}", server.endpoint());

    for granted in 0..buses {
        let bus = server
            .alloc_audio_bus(2)
            .ok_or(CliError::Exhausted { what: "audio bus", granted })?;
        println!("  audio bus   {:>5} (2 channels)", bus);
    }
    for granted in 0..buffers {
        let buffer = server
            .alloc_buffer(1)
            .ok_or(CliError::Exhausted { what: "buffer", granted })?;
        println!("  buffer      {:>5}", buffer);
    }
    for _ in 0..nodes {
        println!("  node        {:>5}", server.next_node_id());
    }
    println!("  group       {:>5} (permanent)", server.next_perm_node_id());

    let freed = server.free_all_buffers();
    println!("Freed {} buffers", freed.len());
    Ok(())
}
