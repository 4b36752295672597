use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use collider_osc::{Arg, LocalTransport, Message, ResponderNode, ResponderRegistry};

use crate::error::CliError;

/// Each caller waits for `/done` replies tagged with its own id while one
/// receive thread pumps the transport.
pub fn handle_responders(threads: usize, messages: u32) -> Result<(), CliError> {
    let server: SocketAddr = SocketAddr::from(([127, 0, 0, 1], 57110));
    let transport = Arc::new(LocalTransport::new(server));
    let registry = ResponderRegistry::new();
    let multi = registry.get_or_create(transport.clone());
    let stop = Arc::new(AtomicBool::new(false));
    let started = Instant::now();

    let receiver = {
        let transport = Arc::clone(&transport);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut delivered = 0;
            while !stop.load(Ordering::Acquire) {
                delivered += transport.pump();
                thread::yield_now();
            }
            delivered + transport.pump()
        })
    };

    let callers: Vec<_> = (0..threads)
        .map(|caller| {
            let multi = Arc::clone(&multi);
            let transport = Arc::clone(&transport);
            thread::spawn(move || -> Result<u32, CliError> {
                let tag = caller as i32;
                let answered = Arc::new(AtomicU32::new(0));
                for round in 0..messages {
                    let seen = Arc::clone(&answered);
                    let node = ResponderNode::new(&multi, "/done", move |node, msg, _, _| {
                        if msg.arg(0).and_then(Arg::as_i32) == Some(tag) {
                            seen.fetch_add(1, Ordering::SeqCst);
                            node.remove();
                        }
                    });
                    node.add()?;
                    transport.post(Message::new("done", vec![tag.into()]), server, round as u64);
                    while answered.load(Ordering::SeqCst) <= round {
                        thread::yield_now();
                    }
                }
                Ok(answered.load(Ordering::SeqCst))
            })
        })
        .collect();

    let mut answered = 0;
    for caller in callers {
        answered += caller
            .join()
            .map_err(|_| CliError::ThreadPanicked("caller".to_string()))??;
    }
    stop.store(true, Ordering::Release);
    let delivered = receiver
        .join()
        .map_err(|_| CliError::ThreadPanicked("receiver".to_string()))?;

    println!(
        "{} callers received {} replies ({} messages delivered) in {:.2?}",
        threads,
        answered,
        delivered,
        started.elapsed()
    );
    println!("Listeners left registered: {}", multi.listener_count());
    registry.dispose_all();
    Ok(())
}
