//! Debug assertion macros for queue cursor invariants.
//!
//! Only active in debug builds (`debug_assert!`), so release builds pay nothing.

// =============================================================================
// Bounded Count: 0 ≤ (tail - head) ≤ capacity
// =============================================================================

/// Assert that the occupied count does not exceed capacity.
///
/// Used in: `offer` after computing the new tail
macro_rules! debug_assert_bounded_count {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count <= $capacity,
            "bounded count violated: count {} exceeds capacity {}",
            $count,
            $capacity
        )
    };
}

/// Assert that head does not advance past tail.
///
/// Used in: `poll` and `drain` before publishing head
macro_rules! debug_assert_head_not_past_tail {
    ($new_head:expr, $tail:expr) => {
        debug_assert!(
            $tail.wrapping_sub($new_head) <= u64::MAX / 2,
            "advancing head {} beyond tail {}",
            $new_head,
            $tail
        )
    };
}

// =============================================================================
// Initialized Range: slot(i) holds a value ⟺ head ≤ i < tail
// =============================================================================

/// Assert that we're reading from an occupied slot.
///
/// Used in: `drain` before `assume_init_read()`
macro_rules! debug_assert_initialized_read {
    ($pos:expr, $head:expr, $tail:expr) => {
        debug_assert!(
            $pos.wrapping_sub($head) < $tail.wrapping_sub($head),
            "reading slot at seq {} outside occupied range [{}, {})",
            $pos,
            $head,
            $tail
        )
    };
}

pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_head_not_past_tail;
pub(crate) use debug_assert_initialized_read;
