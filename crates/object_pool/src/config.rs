/// The largest capacity a pool accepts unless its [PoolConfig] says otherwise.
pub const DEFAULT_MAX_CAPACITY: usize = 1024;

/// Configuration for an [crate::ObjectPool].
///
/// Build one with [PoolConfigBuilder]; `capacity` is required.
#[derive(Clone, Debug, Eq, PartialEq, derive_builder::Builder)]
#[builder(pattern = "owned")]
pub struct PoolConfig {
    /// How many slots the pool holds.  Fixed for the pool's lifetime.
    pub capacity: usize,

    /// Upper bound on `capacity`.
    ///
    /// Construction fails if `capacity` is above this.  Default is [DEFAULT_MAX_CAPACITY].
    #[builder(default = "DEFAULT_MAX_CAPACITY")]
    pub max_capacity: usize,
}

impl PoolConfig {
    /// A config with the given capacity and the default maximum.
    pub fn new(capacity: usize) -> PoolConfig {
        PoolConfig {
            capacity,
            max_capacity: DEFAULT_MAX_CAPACITY,
        }
    }
}
