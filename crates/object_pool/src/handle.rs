use std::ops::Deref;
use std::ptr::NonNull;
use std::sync::Arc;

use crate::pool::ObjectPool;

/// Exclusive claim on one slot.  Dropping it cleans the slot and frees it.
struct SlotLease<T> {
    pool: Arc<ObjectPool<T>>,
    index: usize,
    data: NonNull<T>,
}

impl<T> Drop for SlotLease<T> {
    fn drop(&mut self) {
        // Fine: the lease is the sole owner of the slot, and this is the last reference to the lease.
        unsafe { self.pool.recycle(self.index) };
    }
}

unsafe impl<T: Send + Sync> Send for SlotLease<T> {}
unsafe impl<T: Send + Sync> Sync for SlotLease<T> {}

enum Backing<T> {
    Pooled(Arc<SlotLease<T>>),

    /// Produced by [ObjectPool::acquire_shared_or_fallback] when the pool was full.
    Standalone(Arc<T>),
}

/// A reference-counted handle to a `T`, usually living in an [ObjectPool].
///
/// Clones share one count.  When the last clone of a pooled handle drops, the pool's cleanup callback runs against the
/// value and the slot goes back to the pool.  Each handle holds the pool alive, so it is fine to drop every other
/// reference to the pool first.
///
/// Handles are `Send` and `Sync` only when `T` is both.  Handles to other types work, but stay on one thread.
pub struct SharedHandle<T> {
    backing: Backing<T>,
}

impl<T> ObjectPool<T> {
    /// Claim a slot and wrap it in a handle, or return `None` if the pool is exhausted.
    pub fn acquire_shared(self: &Arc<Self>) -> Option<SharedHandle<T>> {
        let Some(index) = self.alloc_index() else {
            log::trace!("Pool of {} slots is exhausted", self.capacity());
            return None;
        };

        let lease = SlotLease {
            pool: self.clone(),
            index,
            data: self.slot_ptr(index),
        };

        Some(SharedHandle {
            backing: Backing::Pooled(Arc::new(lease)),
        })
    }
}

impl<T: Default> ObjectPool<T> {
    /// Like [ObjectPool::acquire_shared], but falls back to a heap-allocated `T::default()` if the pool is exhausted.
    ///
    /// The fallback value never touches the pool, and the cleanup callback is not run for it.
    pub fn acquire_shared_or_fallback(self: &Arc<Self>) -> SharedHandle<T> {
        self.acquire_shared().unwrap_or_else(|| {
            log::debug!(
                "Pool of {} slots is exhausted, allocating a standalone {}",
                self.capacity(),
                std::any::type_name::<T>()
            );
            SharedHandle {
                backing: Backing::Standalone(Arc::new(T::default())),
            }
        })
    }
}

impl<T> SharedHandle<T> {
    /// Does this handle point into a pool, as opposed to a standalone fallback value?
    pub fn is_pooled(&self) -> bool {
        matches!(self.backing, Backing::Pooled(_))
    }

    /// How many clones of this handle exist, including this one.
    pub fn ref_count(&self) -> usize {
        match &self.backing {
            Backing::Pooled(l) => Arc::strong_count(l),
            Backing::Standalone(v) => Arc::strong_count(v),
        }
    }

    /// Get mutable access, if this is the only clone.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        match &mut self.backing {
            // Fine: a unique lease means nobody else can see the slot.
            Backing::Pooled(l) => Arc::get_mut(l).map(|l| unsafe { l.data.as_mut() }),
            Backing::Standalone(v) => Arc::get_mut(v),
        }
    }

    pub fn as_ptr(&self) -> *const T {
        match &self.backing {
            Backing::Pooled(l) => l.data.as_ptr(),
            Backing::Standalone(v) => Arc::as_ptr(v),
        }
    }

    /// Do both handles refer to the same value?
    pub fn ptr_eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.as_ptr(), other.as_ptr())
    }
}

impl<T> Clone for SharedHandle<T> {
    fn clone(&self) -> Self {
        let backing = match &self.backing {
            Backing::Pooled(l) => Backing::Pooled(l.clone()),
            Backing::Standalone(v) => Backing::Standalone(v.clone()),
        };
        SharedHandle { backing }
    }
}

impl<T> Deref for SharedHandle<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        match &self.backing {
            Backing::Pooled(l) => unsafe { l.data.as_ref() },
            Backing::Standalone(v) => &**v,
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for SharedHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedHandle")
            .field("pooled", &self.is_pooled())
            .field("value", &**self)
            .finish()
    }
}
