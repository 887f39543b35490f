//! A fixed-capacity object pool.
//!
//! An [ObjectPool] constructs all of its values up front and hands out slots lowest index first, either as raw
//! addresses or wrapped in reference-counted [SharedHandle]s.  It never grows: when every slot is in use, allocation
//! returns `None` immediately and the caller decides what to do, for example falling back to the heap with
//! [ObjectPool::acquire_shared_or_fallback].
//!
//! Slot bookkeeping sits behind a single mutex which is held only long enough to flip a bit, so use of the slots
//! themselves is fully concurrent.  Handles own the pool through an `Arc`, so the pool cannot be torn down while any
//! handle is alive.
mod arena;
mod config;
mod error;
mod handle;
mod pool;
mod slot_allocator;
mod sync;

pub use config::*;
pub use error::*;
pub use handle::*;
pub use pool::*;
