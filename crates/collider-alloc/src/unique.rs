use std::sync::atomic::{AtomicI32, Ordering};

const DEFAULT_START: i32 = 1000;

/// Hands out process-local unique integers, for example to tag client-side
/// objects. Construct one and share it with whoever needs unique values.
///
/// After `i32::MAX` the counter starts over from its initial value and logs
/// a warning.
#[derive(Debug)]
pub struct UniqueId {
    start: i32,
    next: AtomicI32,
}

impl Default for UniqueId {
    fn default() -> Self {
        Self::new()
    }
}

impl UniqueId {
    pub fn new() -> Self {
        Self::starting_at(DEFAULT_START)
    }

    pub fn starting_at(start: i32) -> Self {
        Self { start, next: AtomicI32::new(start) }
    }

    pub fn next(&self) -> i32 {
        let step = |id: i32| Some(id.checked_add(1).unwrap_or(self.start));
        // The closure always returns `Some`, so both arms carry the previous value.
        let id = match self.next.fetch_update(Ordering::Relaxed, Ordering::Relaxed, step) {
            Ok(id) | Err(id) => id,
        };
        if id == i32::MAX {
            log::warn!("Unique id counter exceeded {}, wrapping to {}", i32::MAX, self.start);
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn counts_up_from_start() {
        let ids = UniqueId::new();
        assert_eq!(ids.next(), 1000);
        assert_eq!(ids.next(), 1001);
        assert_eq!(UniqueId::starting_at(7).next(), 7);
    }

    #[test]
    fn wraps_to_start_instead_of_going_negative() {
        let ids = UniqueId::starting_at(i32::MAX - 1);
        assert_eq!(ids.next(), i32::MAX - 1);
        assert_eq!(ids.next(), i32::MAX);
        assert_eq!(ids.next(), i32::MAX - 1);

        let ids = UniqueId::new();
        ids.next.store(i32::MAX, Ordering::Relaxed);
        assert_eq!(ids.next(), i32::MAX);
        assert_eq!(ids.next(), DEFAULT_START);
    }

    #[test]
    fn unique_across_threads() {
        let ids = Arc::new(UniqueId::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = Arc::clone(&ids);
                thread::spawn(move || (0..250).map(|_| ids.next()).collect::<Vec<_>>())
            })
            .collect();
        let all: HashSet<i32> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        assert_eq!(all.len(), 1000);
    }
}
