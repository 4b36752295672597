/// Number of free lists kept by a size-class allocator, one per power of two
/// representable in a `u32` length.
pub const NUM_SIZE_CLASSES: usize = 32;

/// One run of contiguous slots handed out by a [`BlockAllocator`].
///
/// `length` is always the rounded power-of-two size, so a request for three
/// slots produces a block of length four.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Block {
    address: u32,
    length: u32,
    size_class: u32,
}

impl Block {
    pub(crate) fn new(address: u32, size_class: u32) -> Self {
        Self { address, length: 1 << size_class, size_class }
    }

    /// First slot of the run.
    #[inline]
    pub fn address(&self) -> u32 {
        self.address
    }

    /// Number of slots in the run.
    #[inline]
    pub fn length(&self) -> u32 {
        self.length
    }

    /// `log2(length)`, the index of the free list this block returns to.
    #[inline]
    pub fn size_class(&self) -> u32 {
        self.size_class
    }
}

/// Computes the smallest `k` such that `2^k >= n`.
///
/// `n == 0` maps to class 0 (one slot). Returns `None` when the rounded size
/// would not fit in a `u32`.
#[inline]
pub fn size_class_of(n: u32) -> Option<u32> {
    n.max(1).checked_next_power_of_two().map(|np2| np2.trailing_zeros())
}

/// Allocates and frees runs of slots within a fixed-size address space.
///
/// Implementations must be safe to share between threads; every method is a
/// short critical section and never blocks on anything but the instance's own
/// lock.
pub trait BlockAllocator: Send + Sync {
    /// Reserves a run of at least `n` slots and returns its first address, or
    /// `None` when the namespace is exhausted.
    fn alloc(&self, n: u32) -> Option<u32>;

    /// Returns the block starting at `address` for reuse.
    ///
    /// Addresses that were never handed out are ignored.
    fn free(&self, address: u32);

    /// Every block ever carved from the address space, including those
    /// currently waiting on a free list. Ordered by address.
    fn list_allocated(&self) -> Vec<Block>;

    /// Blocks that are currently handed out. Ordered by address.
    fn list_in_use(&self) -> Vec<Block>;
}

/// Creates allocators, so owners can swap the allocation strategy without
/// knowing the concrete type.
pub trait BlockAllocatorFactory: Send + Sync {
    /// Creates an allocator over `[0, capacity)`.
    fn create(&self, capacity: u32) -> Box<dyn BlockAllocator> {
        self.create_with_base(capacity, 0)
    }

    /// Creates an allocator over `[base, capacity)`. Slots below `base` are
    /// reserved and never handed out.
    fn create_with_base(&self, capacity: u32, base: u32) -> Box<dyn BlockAllocator>;
}
