use collider_alloc::{BlockAllocator, NodeIdAllocator, PowerOfTwoAllocator};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

const THREADS: usize = 8;
const ROUNDS: usize = 1000;
const CAPACITY: u32 = 256;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn alloc_free_pairs_never_hand_out_a_live_address() {
    init_logging();
    let allocator = Arc::new(PowerOfTwoAllocator::new(CAPACITY));
    let outstanding: Arc<Vec<AtomicBool>> =
        Arc::new((0..CAPACITY).map(|_| AtomicBool::new(false)).collect());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let allocator = Arc::clone(&allocator);
            let outstanding = Arc::clone(&outstanding);
            thread::spawn(move || {
                // Each thread sticks to a few sizes so several size classes see contention.
                let sizes = [1u32, 2, 3, 4];
                for round in 0..ROUNDS {
                    let n = sizes[(t + round) % sizes.len()];
                    let address = allocator
                        .alloc(n)
                        .expect("8 threads holding at most one 4-slot block cannot exhaust 256 slots");
                    assert!(
                        !outstanding[address as usize].swap(true, Ordering::SeqCst),
                        "address {} handed out twice",
                        address
                    );
                    outstanding[address as usize].store(false, Ordering::SeqCst);
                    allocator.free(address);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    allocator.verify().unwrap();
    assert!(allocator.list_in_use().is_empty());
    for block in allocator.list_allocated() {
        assert!(block.address() < CAPACITY);
        assert_eq!(block.length(), 1 << block.size_class());
    }
}

#[test]
fn node_ids_unique_across_threads() {
    init_logging();
    let allocator = Arc::new(NodeIdAllocator::new(2).unwrap());
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let allocator = Arc::clone(&allocator);
            thread::spawn(move || {
                (0..ROUNDS)
                    .map(|i| if (t + i) % 10 == 0 { allocator.alloc_perm() } else { allocator.alloc() })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert_eq!(id >> 26, 2);
            assert!(seen.insert(id), "node id {} handed out twice", id);
        }
    }
    assert_eq!(seen.len(), THREADS * ROUNDS);
}
