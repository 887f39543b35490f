use crate::error::{Error, Result};
use crate::sync::{Mutex, MutexGuard};

const WORD_BITS: usize = u64::BITS as usize;

/// Tracks which slots of a pool are free, and hands out the lowest free one.
///
/// All state lives behind one mutex.  The lock is held only while scanning or flipping a bit.
pub(crate) struct SlotAllocator {
    capacity: usize,
    state: Mutex<SlotState>,
}

struct SlotState {
    /// A set bit is a free slot.  Bit `i % 64` of word `i / 64`, numbered from the LSB.
    ///
    /// Bits past `capacity` in the last word are never set.
    free_bits: Vec<u64>,

    /// Cached popcount of `free_bits`.
    free_count: usize,
}

fn words_for(capacity: usize) -> usize {
    capacity / WORD_BITS + (capacity % WORD_BITS != 0) as usize
}

impl SlotState {
    fn new(capacity: usize) -> Result<Self> {
        let words = words_for(capacity);
        let mut free_bits = Vec::new();
        free_bits
            .try_reserve_exact(words)
            .map_err(|e| Error::allocation_failure(capacity, e))?;
        free_bits.resize(words, u64::MAX);

        let tail = capacity % WORD_BITS;
        if tail != 0 {
            if let Some(last) = free_bits.last_mut() {
                *last = (1u64 << tail) - 1;
            }
        }

        Ok(SlotState {
            free_bits,
            free_count: capacity,
        })
    }

    fn first_free(&self) -> Option<usize> {
        self.free_bits
            .iter()
            .enumerate()
            .find(|(_, w)| **w != 0)
            .map(|(i, w)| i * WORD_BITS + w.trailing_zeros() as usize)
    }

    fn is_free(&self, index: usize) -> bool {
        self.free_bits[index / WORD_BITS] & (1 << (index % WORD_BITS)) != 0
    }

    fn mark_used(&mut self, index: usize) {
        self.free_bits[index / WORD_BITS] &= !(1 << (index % WORD_BITS));
        self.free_count -= 1;
    }

    fn mark_free(&mut self, index: usize) {
        if self.is_free(index) {
            return;
        }
        self.free_bits[index / WORD_BITS] |= 1 << (index % WORD_BITS);
        self.free_count += 1;
    }
}

impl SlotAllocator {
    pub(crate) fn new(capacity: usize) -> Result<Self> {
        Ok(SlotAllocator {
            capacity,
            state: Mutex::new(SlotState::new(capacity)?),
        })
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        // Nothing panics while the lock is held, but a poisoned lock still holds a consistent bitmap.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Claim the lowest free slot, or `None` if every slot is in use.
    pub(crate) fn alloc_index(&self) -> Option<usize> {
        let mut state = self.lock();
        let index = state.first_free()?;
        state.mark_used(index);
        Some(index)
    }

    /// Return a slot to the free set.
    ///
    /// Releasing a slot which is already free is a caller bug, checked in debug builds only.
    pub(crate) fn free_index(&self, index: usize) {
        debug_assert!(
            index < self.capacity,
            "Slot {index} is out of range for capacity {}",
            self.capacity
        );
        let mut state = self.lock();
        debug_assert!(!state.is_free(index), "Slot {index} was released twice");
        state.mark_free(index);
    }

    pub(crate) fn free_count(&self) -> usize {
        self.lock().free_count
    }

    pub(crate) fn used_count(&self) -> usize {
        self.capacity - self.free_count()
    }

    /// Indices of every slot currently in use, lowest first.
    pub(crate) fn used_indices(&self) -> Vec<usize> {
        let state = self.lock();
        (0..self.capacity).filter(|i| !state.is_free(*i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::sync::Arc;
    use pretty_assertions::assert_eq;

    #[cfg(not(loom))]
    #[test]
    fn fresh_allocator_is_empty() {
        for cap in [0usize, 1, 10, 63, 64, 65, 128, 1000] {
            let slots = SlotAllocator::new(cap).unwrap();
            assert_eq!(slots.capacity(), cap);
            assert_eq!(slots.free_count(), cap);
            assert_eq!(slots.used_count(), 0);
            assert_eq!(slots.state.lock().unwrap().free_bits.len(), words_for(cap));
        }
    }

    #[cfg(not(loom))]
    #[test]
    fn zero_capacity_never_allocates() {
        let slots = SlotAllocator::new(0).unwrap();
        assert_eq!(slots.alloc_index(), None);
        assert_eq!(slots.used_count(), 0);
    }

    /// Allocation runs in index order and stops exactly at capacity, including across word boundaries.
    #[cfg(not(loom))]
    #[test]
    fn allocates_in_order_until_full() {
        const CAP: usize = 130;
        let slots = SlotAllocator::new(CAP).unwrap();
        let got = (0..CAP)
            .map(|_| slots.alloc_index().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(got, (0..CAP).collect::<Vec<_>>());
        assert_eq!(slots.alloc_index(), None);
        assert_eq!(slots.used_count(), CAP);
    }

    #[cfg(not(loom))]
    #[test]
    fn reuses_lowest_free_slot() {
        let slots = SlotAllocator::new(10).unwrap();
        for _ in 0..6 {
            slots.alloc_index().unwrap();
        }

        slots.free_index(4);
        slots.free_index(1);
        assert_eq!(slots.used_indices(), vec![0, 2, 3, 5]);
        assert_eq!(slots.alloc_index(), Some(1));
        assert_eq!(slots.alloc_index(), Some(4));
        assert_eq!(slots.alloc_index(), Some(6));
    }

    /// Freeing a slot twice must not inflate the free count past capacity.
    #[cfg(not(loom))]
    #[test]
    fn repeated_mark_free_keeps_count_consistent() {
        let mut state = SlotState::new(3).unwrap();
        state.mark_used(1);
        state.mark_free(1);
        state.mark_free(1);
        state.mark_free(2);
        assert_eq!(state.free_count, 3);
        assert_eq!(state.first_free(), Some(0));
    }

    #[cfg(all(not(loom), debug_assertions))]
    #[test]
    #[should_panic(expected = "released twice")]
    fn double_free_is_caught_in_debug() {
        let slots = SlotAllocator::new(2).unwrap();
        let i = slots.alloc_index().unwrap();
        slots.free_index(i);
        slots.free_index(i);
    }

    /// Threads grabbing slots concurrently always get unique indices and use the whole allocator.
    #[test]
    fn concurrent_allocations_are_unique() {
        crate::sync::wrap_test(|| {
            let slots = Arc::new(SlotAllocator::new(4).unwrap());

            let handles = (0..2)
                .map(|_| {
                    let slots = slots.clone();
                    crate::sync::spawn(move || {
                        (0..2)
                            .map(|_| slots.alloc_index().unwrap())
                            .collect::<Vec<_>>()
                    })
                })
                .collect::<Vec<_>>();

            let mut results = handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect::<Vec<_>>();
            results.sort_unstable();
            assert_eq!(results, vec![0, 1, 2, 3]);
            assert_eq!(slots.alloc_index(), None);
        });
    }

    /// Interleaved allocate/free from several threads never loses a slot.
    #[test]
    fn concurrent_churn_loses_nothing() {
        crate::sync::wrap_test(|| {
            let slots = Arc::new(SlotAllocator::new(2).unwrap());

            let handles = (0..2)
                .map(|_| {
                    let slots = slots.clone();
                    crate::sync::spawn(move || {
                        for _ in 0..2 {
                            if let Some(i) = slots.alloc_index() {
                                slots.free_index(i);
                            }
                        }
                    })
                })
                .collect::<Vec<_>>();

            for h in handles {
                h.join().unwrap();
            }

            assert_eq!(slots.free_count(), 2);
            assert_eq!(slots.used_indices(), Vec::<usize>::new());
        });
    }
}
