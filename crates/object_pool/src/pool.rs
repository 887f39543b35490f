use std::ptr::NonNull;

use crate::arena::Arena;
use crate::config::PoolConfig;
use crate::error::{Error, Result};
use crate::slot_allocator::SlotAllocator;

/// Callback run against a slot's contents when it goes back to the pool through a handle, or at teardown.
pub type Cleanup<T> = Box<dyn Fn(&mut T) + Send + Sync>;

/// A fixed-capacity pool of pre-constructed `T`s.
///
/// Slots are handed out lowest index first.  There are two ways to get one:
///
/// - [ObjectPool::allocate] and [ObjectPool::release] deal in raw addresses.  The cleanup callback never runs on
///   this path, except at teardown for slots which were never released.
/// - [ObjectPool::acquire_shared] wraps a slot in a [crate::SharedHandle], which runs the cleanup callback and frees
///   the slot when the last clone drops.  Handles keep the pool alive.
///
/// Exhaustion is never an error: both paths return `None` when every slot is in use.
pub struct ObjectPool<T> {
    arena: Arena<T>,
    slots: SlotAllocator,
    cleanup: Cleanup<T>,
}

impl<T: Default> ObjectPool<T> {
    /// Create a pool with `capacity` default-constructed slots and no cleanup.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_config(PoolConfig::new(capacity), |_| {})
    }

    /// Create a pool whose slots are passed to `cleanup` on their way back into the pool.
    pub fn with_cleanup(
        capacity: usize,
        cleanup: impl Fn(&mut T) + Send + Sync + 'static,
    ) -> Result<Self> {
        Self::with_config(PoolConfig::new(capacity), cleanup)
    }

    pub fn with_config(
        config: PoolConfig,
        cleanup: impl Fn(&mut T) + Send + Sync + 'static,
    ) -> Result<Self> {
        if config.capacity > config.max_capacity {
            return Err(Error::capacity_exceeded(
                config.capacity,
                config.max_capacity,
            ));
        }

        let arena = Arena::new(config.capacity)?;
        let slots = SlotAllocator::new(config.capacity)?;
        log::debug!(
            "Created pool of {} slots for {}",
            config.capacity,
            std::any::type_name::<T>()
        );

        Ok(ObjectPool {
            arena,
            slots,
            cleanup: Box::new(cleanup),
        })
    }
}

impl<T> ObjectPool<T> {
    /// The fixed number of slots in this pool.
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// How many slots are currently in use.
    pub fn size(&self) -> usize {
        self.slots.used_count()
    }

    /// How many slots are currently free.
    pub fn free_slots(&self) -> usize {
        self.slots.free_count()
    }

    /// Claim the lowest free slot and return its address.
    ///
    /// The slot still holds whatever the last user left in it.  Returns `None` if the pool is exhausted.
    pub fn allocate(&self) -> Option<NonNull<T>> {
        match self.slots.alloc_index() {
            Some(index) => Some(self.arena.slot_ptr(index)),
            None => {
                log::trace!("Pool of {} slots is exhausted", self.capacity());
                None
            }
        }
    }

    /// Return a slot obtained from [ObjectPool::allocate] to the pool.
    ///
    /// The cleanup callback is not run.
    ///
    /// # Safety
    ///
    /// `ptr` must have come from [ObjectPool::allocate] on this pool and must not have been released since.  The
    /// caller must not touch it afterward: the slot may be handed out again immediately.
    ///
    /// Addresses which do not belong to this pool panic in debug builds and are ignored otherwise.
    pub unsafe fn release(&self, ptr: NonNull<T>) {
        let index = self.arena.index_of(ptr);
        debug_assert!(
            index.is_some(),
            "{:p} does not belong to this pool",
            ptr.as_ptr()
        );

        match index {
            Some(index) => self.slots.free_index(index),
            None => log::error!(
                "Ignoring release of {:p}, which is not a slot of this pool",
                ptr.as_ptr()
            ),
        }
    }

    /// Find the slot index of an address in this pool.
    pub fn slot_index(&self, ptr: NonNull<T>) -> Option<usize> {
        self.arena.index_of(ptr)
    }

    /// Run cleanup on a slot and mark it free.
    ///
    /// # Safety
    ///
    /// `index` must be in use and exclusively owned by the caller.
    pub(crate) unsafe fn recycle(&self, index: usize) {
        unsafe {
            (self.cleanup)(self.arena.slot_mut(index));
        }
        self.slots.free_index(index);
    }

    pub(crate) fn slot_ptr(&self, index: usize) -> NonNull<T> {
        self.arena.slot_ptr(index)
    }

    pub(crate) fn alloc_index(&self) -> Option<usize> {
        self.slots.alloc_index()
    }
}

impl<T> Drop for ObjectPool<T> {
    fn drop(&mut self) {
        // Handles own the pool, so anything still in use came from allocate() and was never released.
        let leftover = self.slots.used_indices();
        if !leftover.is_empty() {
            log::debug!(
                "Tearing down pool with {} slots still in use",
                leftover.len()
            );
        }

        for index in leftover {
            // Fine: we have &mut self, and raw users were required to stop touching their slots by now.
            (self.cleanup)(unsafe { self.arena.slot_mut(index) });
        }
    }
}

impl<T> std::fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectPool")
            .field("type", &std::any::type_name::<T>())
            .field("capacity", &self.capacity())
            .field("size", &self.size())
            .finish()
    }
}

// The arena is only reached through slots handed out by the allocator, one owner per slot.
unsafe impl<T: Send> Send for ObjectPool<T> {}
unsafe impl<T: Send + Sync> Sync for ObjectPool<T> {}
