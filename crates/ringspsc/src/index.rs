//! Cursor arithmetic for the ring.
//!
//! Cursors are unbounded `u64` sequence numbers; a slot index is only derived
//! from a sequence at the point of access, as `sequence & mask`. At 10 billion
//! operations per second a `u64` takes ~58 years to wrap, and all distances are
//! computed with wrapping subtraction so even that case stays correct.

/// Logical counter + capacity mask.
///
/// Every wraparound computation in the crate goes through this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RingIndex {
    capacity: usize,
    mask: usize,
}

impl RingIndex {
    /// `capacity` must already be validated as a non-zero power of two.
    pub(crate) const fn new(capacity: usize) -> Self {
        debug_assert!(capacity.is_power_of_two());
        Self {
            capacity,
            mask: capacity - 1,
        }
    }

    #[inline]
    pub(crate) const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slot index for a cursor value.
    #[inline]
    pub(crate) const fn slot(&self, sequence: u64) -> usize {
        (sequence as usize) & self.mask
    }

    /// Number of occupied slots between `head` and `tail`.
    #[inline]
    pub(crate) const fn distance(tail: u64, head: u64) -> usize {
        tail.wrapping_sub(head) as usize
    }

    /// Occupancy clamped to `[0, capacity]`.
    ///
    /// For snapshots taken from two independent loads, where `head` may have
    /// been read before the producer moved on.
    #[inline]
    pub(crate) fn clamped_distance(&self, tail: u64, head: u64) -> usize {
        let delta = tail.wrapping_sub(head);
        // A negative difference shows up as a huge u64.
        if delta > self.capacity as u64 {
            if delta > u64::MAX / 2 {
                0
            } else {
                self.capacity
            }
        } else {
            delta as usize
        }
    }

    #[inline]
    pub(crate) const fn is_full(&self, tail: u64, head: u64) -> bool {
        Self::distance(tail, head) >= self.capacity
    }
}
