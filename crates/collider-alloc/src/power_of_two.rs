//! Power-of-two size-class allocator for bus and buffer slots.
//!
//! Requests are rounded up to the next power of two. Fresh blocks are carved
//! from a cursor that only moves forward; freed blocks go onto a LIFO free
//! list for their size class and are only ever reused by requests of exactly
//! that class. Blocks are never split or merged.
//!
//! # Memory Layout
//!
//! ```text
//! 0            base                 cursor              capacity
//! |  reserved   | carved blocks ...   |   untouched ...    |
//! ```
//!
//! The directory is indexed by absolute address, so a block carved at
//! address `a` keeps its entry for the allocator's whole lifetime. Free-list
//! chains are threaded through the directory entries by address.

use parking_lot::Mutex;

use crate::block::{size_class_of, Block, BlockAllocator, BlockAllocatorFactory, NUM_SIZE_CLASSES};
use crate::error::AllocError;

/// Directory entry for one carved block.
#[derive(Debug, Clone, Copy)]
struct Slot {
    block: Block,
    /// Next address in this block's free list, only meaningful while `free`.
    next: Option<u32>,
    free: bool,
}

/// Mutable allocator state, only touched while the instance lock is held.
#[derive(Debug)]
struct AllocatorState {
    cursor: u32,
    directory: Vec<Option<Slot>>,
    free_heads: [Option<u32>; NUM_SIZE_CLASSES],
}

/// Allocates power-of-two runs of slots out of `[base, capacity)`.
///
/// # Thread Safety
///
/// All state lives behind one `Mutex`; `alloc`, `free` and the listing
/// operations are each a single critical section.
#[derive(Debug)]
pub struct PowerOfTwoAllocator {
    capacity: u32,
    base: u32,
    state: Mutex<AllocatorState>,
}

impl PowerOfTwoAllocator {
    /// Creates an allocator over `[0, capacity)`.
    pub fn new(capacity: u32) -> Self {
        Self::with_base(capacity, 0)
    }

    /// Creates an allocator over `[base, capacity)`.
    ///
    /// Used to split one namespace into a reserved low range (for example the
    /// hardware input/output buses) and an allocatable high range. A `base`
    /// beyond `capacity` yields an allocator that never hands anything out.
    pub fn with_base(capacity: u32, base: u32) -> Self {
        Self {
            capacity,
            base,
            state: Mutex::new(AllocatorState {
                cursor: base,
                directory: vec![None; capacity as usize],
                free_heads: [None; NUM_SIZE_CLASSES],
            }),
        }
    }

    /// Upper bound (exclusive) of the address space.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// First address this allocator may hand out.
    pub fn base(&self) -> u32 {
        self.base
    }

    /// Number of blocks currently parked on the free list for `size_class`.
    pub fn free_count(&self, size_class: u32) -> usize {
        let state = self.state.lock();
        let mut count = 0;
        let mut cursor = state.free_heads.get(size_class as usize).copied().flatten();
        while let Some(address) = cursor {
            count += 1;
            cursor = state.directory[address as usize].and_then(|slot| slot.next);
            if count > state.directory.len() {
                break;
            }
        }
        count
    }

    /// Walks every free list and checks that it is well formed.
    ///
    /// A list is well formed when each entry exists in the directory, is
    /// flagged free, belongs to the list's size class and appears only once.
    /// Every block flagged free must also be reachable from its list.
    pub fn verify(&self) -> Result<(), AllocError> {
        let state = self.state.lock();
        let mut seen = vec![false; state.directory.len()];
        let mut reachable = 0usize;

        for (class, head) in state.free_heads.iter().enumerate() {
            let size_class = class as u32;
            let mut cursor = *head;
            while let Some(address) = cursor {
                let slot = state
                    .directory
                    .get(address as usize)
                    .copied()
                    .flatten()
                    .ok_or_else(|| AllocError::FreeListCorrupt {
                        size_class,
                        reason: format!("address {} has no directory entry", address),
                    })?;
                if slot.block.size_class() != size_class {
                    return Err(AllocError::FreeListCorrupt {
                        size_class,
                        reason: format!(
                            "address {} belongs to size class {}",
                            address,
                            slot.block.size_class()
                        ),
                    });
                }
                if !slot.free {
                    return Err(AllocError::FreeListCorrupt {
                        size_class,
                        reason: format!("address {} is on a free list but in use", address),
                    });
                }
                if std::mem::replace(&mut seen[address as usize], true) {
                    return Err(AllocError::FreeListCorrupt {
                        size_class,
                        reason: format!("address {} appears twice (cycle or double free)", address),
                    });
                }
                reachable += 1;
                cursor = slot.next;
            }
        }

        let flagged = state.directory.iter().flatten().filter(|slot| slot.free).count();
        if flagged != reachable {
            return Err(AllocError::FreeListCorrupt {
                size_class: 0,
                reason: format!("{} blocks flagged free but {} reachable", flagged, reachable),
            });
        }
        Ok(())
    }

    fn collect(&self, filter: impl Fn(&Slot) -> bool) -> Vec<Block> {
        let state = self.state.lock();
        state
            .directory
            .iter()
            .flatten()
            .filter(|slot| filter(slot))
            .map(|slot| slot.block)
            .collect()
    }
}

impl BlockAllocator for PowerOfTwoAllocator {
    fn alloc(&self, n: u32) -> Option<u32> {
        let size_class = size_class_of(n)?;
        let length = 1u32 << size_class;
        let mut state = self.state.lock();

        if let Some(address) = state.free_heads[size_class as usize] {
            if let Some(slot) = state.directory[address as usize].as_mut() {
                slot.free = false;
                let next = slot.next.take();
                state.free_heads[size_class as usize] = next;
                return Some(address);
            }
        }

        let address = state.cursor;
        match address.checked_add(length) {
            Some(end) if end <= self.capacity => {
                state.directory[address as usize] = Some(Slot {
                    block: Block::new(address, size_class),
                    next: None,
                    free: false,
                });
                state.cursor = end;
                Some(address)
            }
            _ => None,
        }
    }

    fn free(&self, address: u32) {
        let mut state = self.state.lock();
        let AllocatorState { directory, free_heads, .. } = &mut *state;

        let Some(slot) = directory.get_mut(address as usize).and_then(Option::as_mut) else {
            log::debug!("Ignoring free of unallocated slot address {}", address);
            return;
        };
        if slot.free {
            log::warn!("Ignoring double free of slot address {}", address);
            return;
        }

        let head = &mut free_heads[slot.block.size_class() as usize];
        slot.free = true;
        slot.next = head.replace(address);
    }

    fn list_allocated(&self) -> Vec<Block> {
        self.collect(|_| true)
    }

    fn list_in_use(&self) -> Vec<Block> {
        self.collect(|slot| !slot.free)
    }
}

/// Factory producing [`PowerOfTwoAllocator`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct PowerOfTwoFactory;

impl BlockAllocatorFactory for PowerOfTwoFactory {
    fn create_with_base(&self, capacity: u32, base: u32) -> Box<dyn BlockAllocator> {
        Box::new(PowerOfTwoAllocator::with_base(capacity, base))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carves_sequentially_from_base() {
        let allocator = PowerOfTwoAllocator::with_base(64, 16);
        assert_eq!(allocator.alloc(1), Some(16));
        assert_eq!(allocator.alloc(2), Some(17));
        assert_eq!(allocator.alloc(3), Some(19));
        assert_eq!(allocator.alloc(8), Some(23));
        assert_eq!(allocator.base(), 16);
        assert_eq!(allocator.capacity(), 64);
    }

    #[test]
    fn reuses_freed_block_lifo() {
        let allocator = PowerOfTwoAllocator::new(32);
        let a = allocator.alloc(4).unwrap();
        let b = allocator.alloc(4).unwrap();
        allocator.free(a);
        allocator.free(b);
        assert_eq!(allocator.alloc(4), Some(b));
        assert_eq!(allocator.alloc(3), Some(a));
    }

    #[test]
    fn freed_block_only_serves_its_size_class() {
        let allocator = PowerOfTwoAllocator::new(8);
        let a = allocator.alloc(4).unwrap();
        allocator.free(a);
        // A two-slot request cannot split the free four-slot block.
        assert_eq!(allocator.alloc(2), Some(4));
        assert_eq!(allocator.alloc(2), Some(6));
        assert_eq!(allocator.alloc(2), None);
        assert_eq!(allocator.alloc(4), Some(a));
    }

    #[test]
    fn exhaustion_returns_none() {
        let allocator = PowerOfTwoAllocator::new(4);
        assert_eq!(allocator.alloc(4), Some(0));
        assert_eq!(allocator.alloc(4), None);
        assert_eq!(allocator.alloc(1), None);
    }

    #[test]
    fn base_past_capacity_never_allocates() {
        let allocator = PowerOfTwoAllocator::with_base(8, 12);
        assert_eq!(allocator.alloc(1), None);
    }

    #[test]
    fn oversized_request_returns_none() {
        let allocator = PowerOfTwoAllocator::new(16);
        assert_eq!(allocator.alloc(u32::MAX), None);
        assert_eq!(allocator.alloc(17), None);
    }

    #[test]
    fn free_of_unknown_address_is_ignored() {
        let allocator = PowerOfTwoAllocator::new(16);
        let a = allocator.alloc(2).unwrap();
        allocator.free(a + 1);
        allocator.free(1000);
        assert!(allocator.verify().is_ok());
        assert_eq!(allocator.list_in_use().len(), 1);
    }

    #[test]
    fn double_free_does_not_corrupt_free_list() {
        let allocator = PowerOfTwoAllocator::new(16);
        let a = allocator.alloc(2).unwrap();
        allocator.free(a);
        allocator.free(a);
        assert_eq!(allocator.free_count(1), 1);
        assert!(allocator.verify().is_ok());
        assert_eq!(allocator.alloc(2), Some(a));
        assert_eq!(allocator.alloc(2), Some(2));
    }

    #[test]
    fn list_allocated_includes_freed_blocks() {
        let allocator = PowerOfTwoAllocator::new(16);
        let a = allocator.alloc(1).unwrap();
        let b = allocator.alloc(4).unwrap();
        allocator.free(a);

        let allocated: Vec<_> = allocator.list_allocated().iter().map(|b| b.address()).collect();
        assert_eq!(allocated, vec![a, b]);

        let in_use = allocator.list_in_use();
        assert_eq!(in_use.len(), 1);
        assert_eq!(in_use[0].address(), b);
        assert_eq!(in_use[0].length(), 4);
    }

    #[test]
    fn factory_honours_base() {
        let allocator = PowerOfTwoFactory.create_with_base(32, 8);
        assert_eq!(allocator.alloc(1), Some(8));
        let plain = PowerOfTwoFactory.create(32);
        assert_eq!(plain.alloc(1), Some(0));
    }
}
