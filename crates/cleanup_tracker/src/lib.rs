//! Count how often a pool's cleanup callback runs, and against which values.
//!
//! Pools promise that cleanup runs exactly once each time a slot goes back through a handle or teardown, and never
//! otherwise.  To test that, create a [CleanupTracker], pass [CleanupTracker::cleanup_fn] as the pool's cleanup
//! callback, and store [Probe]s in the pool.  Each probe remembers how many times it was cleaned, and the tracker keeps
//! a total which can be checked with the `assert_*` methods.
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// Counts cleanup invocations across every [Probe] it cleans.
#[derive(Debug, Default)]
pub struct CleanupTracker {
    cleanups: AtomicU64,
}

/// A value to put in a pool under test.
///
/// `value` is free for the test to use.  Cleanup resets it to 0.
#[derive(Debug, Default)]
pub struct Probe {
    pub value: u64,
    cleanups: u64,
}

impl Probe {
    /// How many times cleanup has run against this slot.
    pub fn cleanups(&self) -> u64 {
        self.cleanups
    }
}

impl CleanupTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A cleanup callback reporting to this tracker.
    pub fn cleanup_fn(self: &Arc<Self>) -> impl Fn(&mut Probe) + Send + Sync + 'static {
        let tracker = self.clone();
        move |probe: &mut Probe| {
            probe.value = 0;
            probe.cleanups += 1;
            tracker.cleanups.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Read how many cleanups have happened so far.
    ///
    /// In concurrent contexts a cleanup which is running on another thread may not be reflected yet.
    pub fn count(&self) -> u64 {
        self.cleanups.load(Ordering::Relaxed)
    }

    /// Panic unless the total is inside `range`.
    #[track_caller]
    pub fn assert_in_range(&self, range: impl std::ops::RangeBounds<u64>) {
        let seen = self.count();
        if !range.contains(&seen) {
            panic!(
                "Cleanup ran {seen} times, outside {:?}..{:?}",
                range.start_bound(),
                range.end_bound()
            );
        }
    }

    #[track_caller]
    pub fn assert_at_least(&self, min: u64) {
        let seen = self.count();
        assert!(seen >= min, "Cleanup ran {seen} times, wanted at least {min}");
    }

    #[track_caller]
    pub fn assert_at_most(&self, max: u64) {
        let seen = self.count();
        assert!(seen <= max, "Cleanup ran {seen} times, wanted at most {max}");
    }

    /// Panic unless cleanup has run exactly `expected` times in total.
    #[track_caller]
    pub fn assert_exact(&self, expected: u64) {
        let seen = self.count();
        assert_eq!(seen, expected, "Cleanup ran {seen} times, wanted {expected}");
    }
}
