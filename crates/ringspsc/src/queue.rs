use crate::index::RingIndex;
use crate::invariants::{
    debug_assert_bounded_count, debug_assert_head_not_past_tail, debug_assert_initialized_read,
};
use crate::metrics::Metrics;
use crate::{Config, ConfigurationError, Consumer, MetricsSnapshot, OfferError, Producer};
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::fmt;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

// =============================================================================
// MEMORY ORDERING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// `head` and `tail` are unbounded u64 sequence numbers; see `index.rs`.
//
// **Producer (`offer`):**
// 1. Load `tail` with Relaxed (only producer writes tail)
// 2. Read `cached_head` (UnsafeCell, producer-only)
// 3. If the cache says full: load `head` with Acquire and refresh the cache
// 4. Write the slot at `tail & mask`
// 5. Store `tail + 1` with Release (publishes the slot write)
//
// **Consumer (`poll`):**
// 1. Load `head` with Relaxed (only consumer writes head)
// 2. Read `cached_tail` (UnsafeCell, consumer-only)
// 3. If the cache says empty: load `tail` with Acquire and refresh the cache
// 4. Move the value out of the slot at `head & mask`
// 5. Store `head + 1` with Release (publishes the slot vacancy)
//
// A slot in [head, tail) is owned by the consumer; every other slot is owned
// by the producer. Ownership moves only through the Release/Acquire pairs above.
//
// =============================================================================

/// Bounded lock-free single-producer single-consumer queue.
///
/// A fixed-capacity ring of element handles `T`. The queue moves handles, it
/// never looks through them: with `T = &U`, `NonNull<U>` or an index into
/// caller storage, what happens to the referenced data after [`poll`] returns
/// is entirely the caller's business. With an owning token such as `Box<U>`,
/// tokens still queued when the queue is dropped are dropped with it.
///
/// # Single producer, single consumer
///
/// **At most one thread may act as producer (`offer`, `try_offer`) and at most
/// one as consumer (`poll`, `peek`, `drain`) at any time.** Nothing in a
/// shared `&BoundedSpscQueue` can enforce this, so those methods are `unsafe`.
/// [`split`] hands out a [`Producer`] and a [`Consumer`] whose `&mut self`
/// methods make the discipline a compile-time property; prefer them.
///
/// `len`, `is_empty` and `is_full` may be called from anywhere. Under
/// concurrent traffic they are snapshots, fit for diagnostics and backoff
/// heuristics but not for synchronization.
///
/// # Layout
///
/// Each cursor and each cached copy of the peer's cursor sits on its own
/// cache line, so the producer's stores never invalidate the line the consumer
/// is spinning on, and vice versa.
///
/// [`poll`]: BoundedSpscQueue::poll
/// [`split`]: BoundedSpscQueue::split
#[repr(C)]
pub struct BoundedSpscQueue<T> {
    // === PRODUCER HOT ===
    /// Tail sequence (written by producer, read by consumer)
    tail: CachePadded<AtomicU64>,
    /// Producer's cached view of head
    cached_head: CachePadded<UnsafeCell<u64>>,

    // === CONSUMER HOT ===
    /// Head sequence (written by consumer, read by producer)
    head: CachePadded<AtomicU64>,
    /// Consumer's cached view of tail
    cached_tail: CachePadded<UnsafeCell<u64>>,

    // === COLD ===
    metrics: Metrics,
    config: Config,
    index: RingIndex,

    buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

// SAFETY: handles move between the producer and consumer threads, so `T: Send`
// is required. The SPSC protocol gives each slot and each cache cell a single
// owner at a time, with ownership passed through Release/Acquire pairs.
unsafe impl<T: Send> Send for BoundedSpscQueue<T> {}
unsafe impl<T: Send> Sync for BoundedSpscQueue<T> {}

impl<T> BoundedSpscQueue<T> {
    /// Creates a queue with `capacity` slots.
    ///
    /// `capacity` must be a non-zero power of two; anything else is rejected,
    /// never rounded.
    ///
    /// ```
    /// use ringspsc_rs::{BoundedSpscQueue, ConfigurationError};
    ///
    /// assert!(BoundedSpscQueue::<u32>::new(1024).is_ok());
    /// assert_eq!(
    ///     BoundedSpscQueue::<u32>::new(3).err(),
    ///     Some(ConfigurationError::NotPowerOfTwo { capacity: 3 })
    /// );
    /// ```
    pub fn new(capacity: usize) -> Result<Self, ConfigurationError> {
        Self::with_config(Config::new(capacity))
    }

    /// Creates a queue from a full [`Config`].
    pub fn with_config(config: Config) -> Result<Self, ConfigurationError> {
        if let Err(err) = config.validate() {
            warn!(capacity = config.capacity, error = %err, "rejected queue configuration");
            return Err(err);
        }

        let buffer = (0..config.capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        debug!(
            capacity = config.capacity,
            metrics = config.enable_metrics,
            slot_bytes = std::mem::size_of::<T>(),
            "created spsc queue"
        );

        Ok(Self {
            tail: CachePadded::new(AtomicU64::new(0)),
            cached_head: CachePadded::new(UnsafeCell::new(0)),
            head: CachePadded::new(AtomicU64::new(0)),
            cached_tail: CachePadded::new(UnsafeCell::new(0)),
            metrics: Metrics::new(),
            config,
            index: RingIndex::new(config.capacity),
            buffer,
        })
    }

    /// Splits the queue into its producer and consumer handles.
    pub fn split(self) -> (Producer<T>, Consumer<T>) {
        debug!(capacity = self.capacity(), "split spsc queue into handles");
        let queue = Arc::new(self);
        (Producer::new(Arc::clone(&queue)), Consumer::new(queue))
    }

    // ---------------------------------------------------------------------
    // STATUS
    // ---------------------------------------------------------------------

    /// Returns the number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.index.capacity()
    }

    /// Returns the configuration the queue was built with.
    #[inline]
    pub fn config(&self) -> Config {
        self.config
    }

    /// Number of queued elements, as a snapshot.
    ///
    /// Head is loaded before tail so the difference is never negative; it is
    /// clamped to `capacity` in case both sides advanced between the loads.
    #[inline]
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        self.index.clamped_distance(tail, head)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    /// `capacity - len`, as a snapshot.
    #[inline]
    pub fn remaining_capacity(&self) -> usize {
        self.capacity() - self.len()
    }

    /// Get a snapshot of metrics if enabled.
    pub fn metrics(&self) -> MetricsSnapshot {
        if self.config.enable_metrics {
            self.metrics.snapshot()
        } else {
            MetricsSnapshot::default()
        }
    }

    // ---------------------------------------------------------------------
    // PRODUCER API
    // ---------------------------------------------------------------------

    /// Enqueues `item`, returning `false` if the queue is full.
    ///
    /// On `false` the item is dropped; for handles that own something, use
    /// [`try_offer`](Self::try_offer) to get it back. A "null" handle (say
    /// `None` in a queue of `Option<&U>`) is accepted and comes back out of
    /// `poll` unchanged; whether that means anything is up to the caller.
    ///
    /// # Safety
    ///
    /// No other thread may run a producer method (`offer`, `try_offer`) on
    /// this queue concurrently with this call.
    #[inline]
    pub unsafe fn offer(&self, item: T) -> bool {
        // SAFETY: forwarded to the caller.
        let accepted = unsafe { self.try_offer(item) };
        accepted.is_ok()
    }

    /// Enqueues `item`, handing it back in [`OfferError::Full`] if the queue
    /// is full.
    ///
    /// # Safety
    ///
    /// Same contract as [`offer`](Self::offer).
    pub unsafe fn try_offer(&self, item: T) -> Result<(), OfferError<T>> {
        let tail = self.tail.load(Ordering::Relaxed);

        // Fast path: check cached head
        // SAFETY: cached_head is only touched by the single producer.
        let cached_head = unsafe { *self.cached_head.get() };
        if self.index.is_full(tail, cached_head) {
            // Slow path: refresh cache
            let head = self.head.load(Ordering::Acquire);
            // SAFETY: as above. The Acquire load synchronizes with the
            // consumer's Release store of head, so the vacated slot is ours.
            unsafe { *self.cached_head.get() = head };

            if self.index.is_full(tail, head) {
                if self.config.enable_metrics {
                    self.metrics.record_offer_rejected();
                }
                return Err(OfferError::Full(item));
            }
        }

        let slot = &self.buffer[self.index.slot(tail)];
        // SAFETY: the slot is outside [head, tail), so the consumer is not
        // reading it, and only the producer writes it.
        unsafe { (*slot.get()).write(item) };

        let new_tail = tail.wrapping_add(1);
        // SAFETY: cached_head is producer-only.
        debug_assert_bounded_count!(
            RingIndex::distance(new_tail, unsafe { *self.cached_head.get() }),
            self.capacity()
        );
        self.tail.store(new_tail, Ordering::Release);

        if self.config.enable_metrics {
            self.metrics.record_offer();
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // CONSUMER API
    // ---------------------------------------------------------------------

    /// Consumer-side count of readable elements, refreshing `cached_tail`
    /// only when the cache shows nothing. Returns `(head, tail)`.
    ///
    /// # Safety
    ///
    /// Consumer only.
    #[inline]
    unsafe fn readable(&self) -> (u64, u64) {
        let head = self.head.load(Ordering::Relaxed);

        // Fast path: check cached tail
        // SAFETY: cached_tail is only touched by the single consumer.
        let mut tail = unsafe { *self.cached_tail.get() };
        if tail == head {
            // Slow path: refresh cache
            tail = self.tail.load(Ordering::Acquire);
            // SAFETY: as above. The Acquire load synchronizes with the
            // producer's Release store of tail, so [head, tail) is initialized.
            unsafe { *self.cached_tail.get() = tail };
        }
        (head, tail)
    }

    /// Dequeues the oldest element, or `None` if the queue is empty.
    ///
    /// # Safety
    ///
    /// No other thread may run a consumer method (`poll`, `peek`, `drain`) on
    /// this queue concurrently with this call.
    pub unsafe fn poll(&self) -> Option<T> {
        // SAFETY: forwarded to the caller.
        let (head, tail) = unsafe { self.readable() };
        if head == tail {
            if self.config.enable_metrics {
                self.metrics.record_poll_empty();
            }
            return None;
        }

        let slot = &self.buffer[self.index.slot(head)];
        // SAFETY: head is in [head, tail), which the producer published with
        // Release and we observed with Acquire. Moving out leaves the slot
        // logically empty once head advances.
        let item = unsafe { (*slot.get()).assume_init_read() };

        let new_head = head.wrapping_add(1);
        debug_assert_head_not_past_tail!(new_head, tail);
        self.head.store(new_head, Ordering::Release);

        if self.config.enable_metrics {
            self.metrics.record_polls(1);
        }
        Some(item)
    }

    /// Borrows the oldest element without dequeuing it.
    ///
    /// # Safety
    ///
    /// Same contract as [`poll`](Self::poll), and the returned reference must
    /// not outlive the next consumer call.
    pub unsafe fn peek(&self) -> Option<&T> {
        // SAFETY: forwarded to the caller.
        let (head, tail) = unsafe { self.readable() };
        if head == tail {
            return None;
        }
        let slot = &self.buffer[self.index.slot(head)];
        // SAFETY: the slot is initialized (see `poll`) and the producer
        // cannot reuse it until head moves, which only the consumer does.
        Some(unsafe { (*slot.get()).assume_init_ref() })
    }

    /// Moves up to `limit` elements to `handler` in FIFO order with a single
    /// head update. Returns how many were handed over.
    ///
    /// Elements produced while the drain runs are left for the next call.
    ///
    /// # Safety
    ///
    /// Same contract as [`poll`](Self::poll).
    pub unsafe fn drain<F>(&self, limit: usize, mut handler: F) -> usize
    where
        F: FnMut(T),
    {
        if limit == 0 {
            return 0;
        }

        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        // SAFETY: cached_tail is consumer-only.
        unsafe { *self.cached_tail.get() = tail };

        let count = RingIndex::distance(tail, head).min(limit);
        if count == 0 {
            if self.config.enable_metrics {
                self.metrics.record_poll_empty();
            }
            return 0;
        }

        let end = head.wrapping_add(count as u64);
        let mut guard = HeadPublisher {
            head: &*self.head,
            pos: head,
        };
        while guard.pos != end {
            debug_assert_initialized_read!(guard.pos, head, tail);
            let slot = &self.buffer[self.index.slot(guard.pos)];
            // SAFETY: pos is in [head, tail); see `poll`.
            let item = unsafe { (*slot.get()).assume_init_read() };
            guard.pos = guard.pos.wrapping_add(1);
            handler(item);
        }
        debug_assert_head_not_past_tail!(end, tail);
        // Single Release store for the whole batch
        drop(guard);

        if self.config.enable_metrics {
            self.metrics.record_polls(count as u64);
        }
        count
    }
}

/// Stores the consumer's progress on drop, so a panicking `drain` handler
/// never leaves an already moved-out slot inside [head, tail).
struct HeadPublisher<'a> {
    head: &'a AtomicU64,
    pos: u64,
}

impl Drop for HeadPublisher<'_> {
    fn drop(&mut self) {
        self.head.store(self.pos, Ordering::Release);
    }
}

impl<T> Drop for BoundedSpscQueue<T> {
    fn drop(&mut self) {
        // Drop every handle still in [head, tail)
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        let mut pos = head;
        while pos != tail {
            let slot = self.buffer[self.index.slot(pos)].get_mut();
            // SAFETY: exclusive access; slots in [head, tail) are initialized.
            unsafe { ptr::drop_in_place(slot.as_mut_ptr()) };
            pos = pos.wrapping_add(1);
        }
    }
}

impl<T> fmt::Debug for BoundedSpscQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedSpscQueue")
            .field("capacity", &self.capacity())
            .field("head", &self.head.load(Ordering::Relaxed))
            .field("tail", &self.tail.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::offset_of;
    use std::sync::atomic::AtomicUsize;

    /// Smallest cache line the layout has to keep the cursors apart on.
    const CACHE_LINE: usize = 64;

    fn queue<T>(capacity: usize) -> BoundedSpscQueue<T> {
        BoundedSpscQueue::new(capacity).unwrap()
    }

    #[test]
    fn test_construction_validation() {
        assert_eq!(
            BoundedSpscQueue::<u32>::new(0).unwrap_err(),
            ConfigurationError::ZeroCapacity
        );
        assert_eq!(
            BoundedSpscQueue::<u32>::new(3).unwrap_err(),
            ConfigurationError::NotPowerOfTwo { capacity: 3 }
        );

        let q = queue::<u32>(1024);
        assert!(q.is_empty());
        assert!(!q.is_full());
        assert_eq!(q.len(), 0);
        assert_eq!(q.capacity(), 1024);
        assert_eq!(q.remaining_capacity(), 1024);
    }

    #[test]
    fn test_capacity_four_scenario() {
        let q = queue::<char>(4);
        unsafe {
            assert!(q.offer('a'));
            assert!(q.offer('b'));
            assert!(q.offer('c'));
            assert!(q.offer('d'));
            assert!(!q.offer('e'));
            assert!(q.is_full());

            assert_eq!(q.poll(), Some('a'));
            assert!(q.offer('e'));

            assert_eq!(q.poll(), Some('b'));
            assert_eq!(q.poll(), Some('c'));
            assert_eq!(q.poll(), Some('d'));
            assert_eq!(q.poll(), Some('e'));
            assert_eq!(q.poll(), None);
        }
        assert!(q.is_empty());
    }

    #[test]
    fn test_poll_on_fresh_queue_is_none() {
        let q = queue::<u64>(8);
        assert_eq!(unsafe { q.poll() }, None);
        assert_eq!(unsafe { q.peek() }, None);
        assert_eq!(unsafe { q.drain(usize::MAX, |_| unreachable!()) }, 0);
    }

    #[test]
    fn test_capacity_boundary_across_many_wraps() {
        let q = queue::<u64>(8);
        let mut next_in = 0u64;
        let mut next_out = 0u64;
        for _ in 0..50 {
            while unsafe { q.offer(next_in) } {
                next_in += 1;
            }
            assert_eq!(q.len(), 8);
            assert_eq!(unsafe { q.poll() }, Some(next_out));
            next_out += 1;
            assert!(unsafe { q.offer(next_in) });
            next_in += 1;
            while let Some(v) = unsafe { q.poll() } {
                assert_eq!(v, next_out);
                next_out += 1;
            }
        }
        assert_eq!(next_in, next_out);
    }

    #[test]
    fn test_capacity_one() {
        let q = queue::<u8>(1);
        unsafe {
            assert!(q.offer(1));
            assert!(!q.offer(2));
            assert_eq!(q.poll(), Some(1));
            assert!(q.offer(2));
            assert_eq!(q.poll(), Some(2));
            assert_eq!(q.poll(), None);
        }
    }

    #[test]
    fn test_try_offer_returns_rejected_item() {
        let q = queue::<String>(1);
        unsafe {
            q.try_offer("first".to_owned()).unwrap();
            let err = q.try_offer("second".to_owned()).unwrap_err();
            assert_eq!(err.into_inner(), "second");
            assert_eq!(q.poll().as_deref(), Some("first"));
        }
    }

    #[test]
    fn test_peek_does_not_advance() {
        let q = queue::<u32>(4);
        unsafe {
            assert!(q.offer(7));
            assert!(q.offer(8));
            assert_eq!(q.peek(), Some(&7));
            assert_eq!(q.peek(), Some(&7));
            assert_eq!(q.len(), 2);
            assert_eq!(q.poll(), Some(7));
            assert_eq!(q.peek(), Some(&8));
        }
    }

    #[test]
    fn test_drain_respects_limit_and_order() {
        let q = queue::<u32>(8);
        for i in 0..6 {
            assert!(unsafe { q.offer(i) });
        }

        let mut out = Vec::new();
        assert_eq!(unsafe { q.drain(4, |v| out.push(v)) }, 4);
        assert_eq!(out, vec![0, 1, 2, 3]);
        assert_eq!(q.len(), 2);

        // Wraps around the end of the buffer
        for i in 6..12 {
            assert!(unsafe { q.offer(i) });
        }
        assert!(q.is_full());
        assert_eq!(unsafe { q.drain(usize::MAX, |v| out.push(v)) }, 8);
        assert_eq!(out, (0..12).collect::<Vec<_>>());
        assert!(q.is_empty());
        assert_eq!(unsafe { q.drain(0, |_| unreachable!()) }, 0);
    }

    #[test]
    fn test_null_handle_round_trips() {
        let value = 5u32;
        let q = queue::<Option<&u32>>(2);
        unsafe {
            assert!(q.offer(None));
            assert!(q.offer(Some(&value)));
            assert_eq!(q.poll(), Some(None));
            assert_eq!(q.poll(), Some(Some(&value)));
        }
    }

    #[test]
    fn test_metrics_counted_when_enabled() {
        let q = BoundedSpscQueue::<u32>::with_config(Config::new(2).with_metrics(true)).unwrap();
        assert_eq!(q.config(), Config::new(2).with_metrics(true));
        unsafe {
            assert!(q.offer(1));
            assert!(q.offer(2));
            assert!(!q.offer(3));
            assert_eq!(q.poll(), Some(1));
            assert_eq!(q.drain(8, |_| {}), 1);
            assert_eq!(q.poll(), None);
        }
        assert_eq!(
            q.metrics(),
            MetricsSnapshot {
                offers: 2,
                offers_rejected: 1,
                polls: 2,
                polls_empty: 1,
            }
        );
    }

    #[test]
    fn test_metrics_zero_when_disabled() {
        let q = queue::<u32>(2);
        unsafe {
            assert!(q.offer(1));
            assert_eq!(q.poll(), Some(1));
        }
        assert_eq!(q.metrics(), MetricsSnapshot::default());
    }

    #[test]
    fn test_drop_releases_queued_items() {
        static DROP_COUNT: AtomicUsize = AtomicUsize::new(0);

        struct DropTracker;

        impl Drop for DropTracker {
            fn drop(&mut self) {
                DROP_COUNT.fetch_add(1, Ordering::SeqCst);
            }
        }

        DROP_COUNT.store(0, Ordering::SeqCst);
        {
            let q = queue::<DropTracker>(4);
            unsafe {
                // Move head off zero so the remaining items straddle the wrap
                assert!(q.offer(DropTracker));
                assert!(q.offer(DropTracker));
                assert!(q.offer(DropTracker));
                drop(q.poll());
                drop(q.poll());
                assert!(q.offer(DropTracker));
                assert!(q.offer(DropTracker));
                assert!(q.offer(DropTracker));
            }
            assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 2);
            assert_eq!(q.len(), 4);
        }
        assert_eq!(DROP_COUNT.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_cursors_on_separate_cache_lines() {
        type Q = BoundedSpscQueue<u64>;
        let tail = offset_of!(Q, tail);
        let cached_head = offset_of!(Q, cached_head);
        let head = offset_of!(Q, head);
        let cached_tail = offset_of!(Q, cached_tail);

        assert!(head - tail >= CACHE_LINE, "tail/head share a line");
        assert!(cached_head - tail >= CACHE_LINE);
        assert!(head - cached_head >= CACHE_LINE);
        assert!(cached_tail - head >= CACHE_LINE);
        assert!(std::mem::align_of::<Q>() >= CACHE_LINE);
    }
}
