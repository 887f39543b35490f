use std::collections::TryReserveError;

use crate::config::PoolConfigBuilderError;

#[derive(Debug, derive_more::Display, derive_more::IsVariant)]
enum ErrorPayload {
    #[display(fmt = "Unable to reserve storage for {} slots: {}", capacity, source)]
    AllocationFailure {
        capacity: usize,
        source: TryReserveError,
    },

    #[display(fmt = "Capacity {} exceeds the pool maximum of {}", requested, max)]
    CapacityExceeded { requested: usize, max: usize },

    #[display(fmt = "Zero-sized types cannot be pooled")]
    ZeroSizedType,

    #[display(fmt = "Invalid pool configuration: {}", _0)]
    InvalidConfig(PoolConfigBuilderError),
}

/// Errors which can occur while constructing an [crate::ObjectPool].
///
/// Exhaustion is not an error: allocation from a full pool returns `None`.
#[derive(Debug, thiserror::Error)]
#[error("{payload}")]
pub struct Error {
    payload: ErrorPayload,
}

impl Error {
    pub(crate) fn allocation_failure(capacity: usize, source: TryReserveError) -> Error {
        Error {
            payload: ErrorPayload::AllocationFailure { capacity, source },
        }
    }

    pub(crate) fn capacity_exceeded(requested: usize, max: usize) -> Error {
        Error {
            payload: ErrorPayload::CapacityExceeded { requested, max },
        }
    }

    pub(crate) fn zero_sized_type() -> Error {
        Error {
            payload: ErrorPayload::ZeroSizedType,
        }
    }

    /// Did the arena's storage fail to allocate?
    pub fn is_allocation_failure(&self) -> bool {
        self.payload.is_allocation_failure()
    }

    /// Was the pool asked for more slots than its maximum?
    pub fn is_capacity_exceeded(&self) -> bool {
        self.payload.is_capacity_exceeded()
    }

    /// Was the value type zero-sized?
    pub fn is_zero_sized_type(&self) -> bool {
        self.payload.is_zero_sized_type()
    }

    /// Did a [crate::PoolConfigBuilder] fail to build?
    pub fn is_invalid_config(&self) -> bool {
        self.payload.is_invalid_config()
    }
}

impl From<PoolConfigBuilderError> for Error {
    fn from(value: PoolConfigBuilderError) -> Error {
        Error {
            payload: ErrorPayload::InvalidConfig(value),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_problem() {
        let e = Error::capacity_exceeded(2000, 1024);
        assert!(e.is_capacity_exceeded());
        assert!(!e.is_allocation_failure());
        assert_eq!(
            e.to_string(),
            "Capacity 2000 exceeds the pool maximum of 1024"
        );

        let e = Error::zero_sized_type();
        assert!(e.is_zero_sized_type());
        assert_eq!(e.to_string(), "Zero-sized types cannot be pooled");
    }

    #[test]
    fn reservation_failures_are_allocation_failures() {
        let source = Vec::<u64>::new().try_reserve(usize::MAX).unwrap_err();
        let e = Error::allocation_failure(usize::MAX, source);
        assert!(e.is_allocation_failure());
        assert!(e.to_string().starts_with("Unable to reserve storage for"));
    }

    #[test]
    fn builder_errors_convert() {
        let e: Error = crate::PoolConfigBuilder::default()
            .build()
            .unwrap_err()
            .into();
        assert!(e.is_invalid_config());
        assert!(e.to_string().starts_with("Invalid pool configuration"));
    }
}
