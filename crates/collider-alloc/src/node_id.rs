use parking_lot::Mutex;

use crate::error::AllocError;

/// A server-side node identifier.
pub type NodeId = i32;

const MASK_SHIFT: u32 = 26;
/// Largest user id that still fits above `MASK_SHIFT` in a positive `i32`.
const USER_MAX: u32 = (1 << (31 - MASK_SHIFT)) - 1;
const TEMP_MIN: NodeId = 1000;
const TEMP_MAX: NodeId = (1 << MASK_SHIFT) - 1;
const PERM_MIN: NodeId = 2;
const PERM_MAX: NodeId = TEMP_MIN - 1;

#[derive(Debug)]
struct Counters {
    temp: NodeId,
    /// Next permanent id, `None` once the permanent range is used up.
    perm: Option<NodeId>,
}

impl Counters {
    fn fresh() -> Self {
        Self { temp: TEMP_MIN, perm: Some(PERM_MIN) }
    }

    fn next_temp(&mut self, mask: NodeId) -> NodeId {
        let id = self.temp | mask;
        self.temp += 1;
        if self.temp > TEMP_MAX {
            self.temp = TEMP_MIN;
            log::warn!("Node ID allocator exceeded the maximum temporary node ID, wrapping to {}", TEMP_MIN);
        }
        id
    }
}

/// Generates node identifiers for one client of the server.
///
/// Identifiers are split into two ranges:
/// - temporary ids `1000..2^26`, handed out round-robin and wrapping on overflow
/// - permanent ids `2..1000`, for long-lived nodes such as default groups
///
/// The client's user id occupies bits 26 and above of every identifier, so
/// several clients can share one server without colliding.
#[derive(Debug)]
pub struct NodeIdAllocator {
    user: u32,
    mask: NodeId,
    counters: Mutex<Counters>,
}

impl NodeIdAllocator {
    /// Creates an allocator for the given user id.
    ///
    /// # Errors
    /// Returns [`AllocError::UserIdOutOfRange`] if `user` exceeds
    /// [`NodeIdAllocator::user_max`].
    pub fn new(user: u32) -> Result<Self, AllocError> {
        if user > USER_MAX {
            return Err(AllocError::UserIdOutOfRange { user, max: USER_MAX });
        }
        Ok(Self {
            user,
            mask: (user << MASK_SHIFT) as NodeId,
            counters: Mutex::new(Counters::fresh()),
        })
    }

    /// Largest accepted user id.
    pub const fn user_max() -> u32 {
        USER_MAX
    }

    pub fn user(&self) -> u32 {
        self.user
    }

    /// Restarts both ranges from their minimum.
    pub fn reset(&self) {
        *self.counters.lock() = Counters::fresh();
    }

    /// Returns the next temporary node id.
    ///
    /// After `2^26 - 1000` calls the counter wraps around. Ids handed out
    /// before the wrap may still be alive on the server; that risk is logged,
    /// not prevented.
    pub fn alloc(&self) -> NodeId {
        self.counters.lock().next_temp(self.mask)
    }

    /// Returns the next permanent node id.
    ///
    /// Once the permanent range is used up, a warning is logged and a
    /// temporary id is returned instead.
    pub fn alloc_perm(&self) -> NodeId {
        let mut counters = self.counters.lock();
        match counters.perm {
            Some(perm) => {
                counters.perm = (perm < PERM_MAX).then_some(perm + 1);
                perm | self.mask
            }
            None => {
                log::warn!("Node ID allocator exceeded the maximum permanent node ID, assigning a temporary ID");
                counters.next_temp(self.mask)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_ids_start_at_1000() {
        let allocator = NodeIdAllocator::new(0).unwrap();
        assert_eq!(allocator.alloc(), 1000);
        assert_eq!(allocator.alloc(), 1001);
        assert_eq!(allocator.alloc(), 1002);
    }

    #[test]
    fn perm_ids_start_at_2() {
        let allocator = NodeIdAllocator::new(0).unwrap();
        assert_eq!(allocator.alloc_perm(), 2);
        assert_eq!(allocator.alloc_perm(), 3);
    }

    #[test]
    fn user_mask_occupies_high_bits() {
        let allocator = NodeIdAllocator::new(3).unwrap();
        let id = allocator.alloc();
        assert_eq!(id >> MASK_SHIFT, 3);
        assert_eq!(id & TEMP_MAX, 1000);
        let perm = allocator.alloc_perm();
        assert_eq!(perm >> MASK_SHIFT, 3);
        assert_eq!(perm & TEMP_MAX, 2);
    }

    #[test]
    fn largest_user_stays_positive() {
        let allocator = NodeIdAllocator::new(NodeIdAllocator::user_max()).unwrap();
        assert!(allocator.alloc() > 0);
    }

    #[test]
    fn rejects_user_out_of_range() {
        let err = NodeIdAllocator::new(USER_MAX + 1).unwrap_err();
        assert_eq!(err, AllocError::UserIdOutOfRange { user: USER_MAX + 1, max: USER_MAX });
    }

    #[test]
    fn perm_exhaustion_falls_back_to_temp() {
        let allocator = NodeIdAllocator::new(0).unwrap();
        let perms: Vec<_> = (0..(PERM_MAX - PERM_MIN + 1)).map(|_| allocator.alloc_perm()).collect();
        assert_eq!(perms.first(), Some(&PERM_MIN));
        assert_eq!(perms.last(), Some(&PERM_MAX));
        assert_eq!(allocator.counters.lock().perm, None);
        assert_eq!(allocator.alloc_perm(), TEMP_MIN);
        assert_eq!(allocator.alloc(), TEMP_MIN + 1);
        assert_eq!(allocator.counters.lock().perm, None);

        allocator.reset();
        assert_eq!(allocator.alloc_perm(), PERM_MIN);
    }

    #[test]
    fn temp_wraps_around() {
        let allocator = NodeIdAllocator::new(0).unwrap();
        allocator.counters.lock().temp = TEMP_MAX;
        assert_eq!(allocator.alloc(), TEMP_MAX);
        assert_eq!(allocator.alloc(), TEMP_MIN);
    }

    #[test]
    fn interleaved_ranges_never_overlap() {
        let allocator = NodeIdAllocator::new(0).unwrap();
        let mut temps = Vec::new();
        let mut perms = Vec::new();
        for i in 0..500 {
            if i % 3 == 0 {
                perms.push(allocator.alloc_perm());
            } else {
                temps.push(allocator.alloc());
            }
        }
        assert!(perms.iter().all(|id| (PERM_MIN..=PERM_MAX).contains(id)));
        assert!(temps.iter().all(|id| (TEMP_MIN..=TEMP_MAX).contains(id)));
    }

    #[test]
    fn reset_restarts_both_ranges() {
        let allocator = NodeIdAllocator::new(1).unwrap();
        allocator.alloc();
        allocator.alloc_perm();
        allocator.reset();
        assert_eq!(allocator.alloc(), 1000 | (1 << MASK_SHIFT));
        assert_eq!(allocator.alloc_perm(), 2 | (1 << MASK_SHIFT));
    }
}
