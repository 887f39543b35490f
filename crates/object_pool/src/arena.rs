use std::cell::UnsafeCell;
use std::ptr::NonNull;

use crate::error::{Error, Result};

/// The contiguous block of slots backing a pool.
///
/// Every slot is constructed up front and lives until the arena is dropped.  The slice is boxed, so slot addresses
/// never change even if the owning pool moves.
pub(crate) struct Arena<T> {
    slots: Box<[UnsafeCell<T>]>,
}

impl<T: Default> Arena<T> {
    pub(crate) fn new(capacity: usize) -> Result<Self> {
        if std::mem::size_of::<T>() == 0 {
            return Err(Error::zero_sized_type());
        }

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|e| Error::allocation_failure(capacity, e))?;
        slots.resize_with(capacity, || UnsafeCell::new(T::default()));

        Ok(Arena {
            slots: slots.into_boxed_slice(),
        })
    }
}

impl<T> Arena<T> {
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// Address of the slot at `index`.
    ///
    /// Panics if `index` is out of bounds.
    pub(crate) fn slot_ptr(&self, index: usize) -> NonNull<T> {
        // Fine: UnsafeCell::get on an element of a live slice is never null.
        unsafe { NonNull::new_unchecked(self.slots[index].get()) }
    }

    /// Map an address back to its slot index.
    ///
    /// Returns `None` for anything which is not the start of one of this arena's slots.
    pub(crate) fn index_of(&self, ptr: NonNull<T>) -> Option<usize> {
        let stride = std::mem::size_of::<T>();
        let base = self.slots.as_ptr() as usize;
        let offset = (ptr.as_ptr() as usize).checked_sub(base)?;

        if offset % stride != 0 {
            return None;
        }

        let index = offset / stride;
        (index < self.slots.len()).then_some(index)
    }

    /// Get a mutable reference to the slot at `index`.
    ///
    /// # Safety
    ///
    /// The caller must be the only party with access to this slot for the lifetime of the reference.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn slot_mut(&self, index: usize) -> &mut T {
        unsafe { &mut *self.slots[index].get() }
    }
}
