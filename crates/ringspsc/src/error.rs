//! Error types for queue construction and offers.

use thiserror::Error;

/// Rejected queue configuration. Only produced at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Capacity was zero.
    #[error("capacity must be greater than zero")]
    ZeroCapacity,

    /// Capacity was not a power of two.
    #[error("capacity must be a power of two (got {capacity})")]
    NotPowerOfTwo {
        /// The rejected capacity.
        capacity: usize,
    },
}

/// A rejected offer, carrying the item back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OfferError<T> {
    /// The queue held `capacity` elements.
    #[error("queue is full")]
    Full(T),
}

impl<T> OfferError<T> {
    /// Returns the item that could not be enqueued.
    #[inline]
    pub fn into_inner(self) -> T {
        match self {
            Self::Full(item) => item,
        }
    }

    /// Returns `true` if the queue was full.
    #[inline]
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full(_))
    }
}
