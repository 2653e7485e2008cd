//! Producer and consumer halves of a split queue.

use crate::{Backoff, BoundedSpscQueue, MetricsSnapshot, OfferError};
use std::fmt;
use std::sync::Arc;

/// The producing half of a [`BoundedSpscQueue`].
///
/// Not `Clone`, and every enqueue takes `&mut self`, so there is exactly one
/// producer for the life of the queue. Move it to the producer thread.
pub struct Producer<T> {
    queue: Arc<BoundedSpscQueue<T>>,
}

/// The consuming half of a [`BoundedSpscQueue`].
///
/// Not `Clone`, and every dequeue takes `&mut self`, so there is exactly one
/// consumer for the life of the queue. Move it to the consumer thread.
pub struct Consumer<T> {
    queue: Arc<BoundedSpscQueue<T>>,
}

impl<T> Producer<T> {
    pub(crate) fn new(queue: Arc<BoundedSpscQueue<T>>) -> Self {
        Self { queue }
    }

    /// Enqueues `item`; `false` if the queue is full (the item is dropped).
    #[inline]
    pub fn offer(&mut self, item: T) -> bool {
        // SAFETY: `&mut self` on the only Producer makes this the only producer call.
        unsafe { self.queue.offer(item) }
    }

    /// Enqueues `item`, handing it back if the queue is full.
    #[inline]
    pub fn try_offer(&mut self, item: T) -> Result<(), OfferError<T>> {
        // SAFETY: see `offer`.
        unsafe { self.queue.try_offer(item) }
    }

    /// Retries `try_offer` under `backoff` until it succeeds or the backoff
    /// gives up, in which case the item comes back in the error.
    pub fn offer_with_backoff(
        &mut self,
        item: T,
        backoff: &mut Backoff,
    ) -> Result<(), OfferError<T>> {
        let mut pending = Some(item);
        let result = backoff.retry(|| match pending.take() {
            // SAFETY: see `offer`.
            Some(item) => unsafe { self.queue.try_offer(item) }.map_err(|err| {
                pending = Some(err.into_inner());
            }),
            None => Ok(()),
        });
        match (result, pending) {
            (Err(()), Some(item)) => Err(OfferError::Full(item)),
            _ => Ok(()),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.queue.is_full()
    }

    #[inline]
    pub fn remaining_capacity(&self) -> usize {
        self.queue.remaining_capacity()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.queue.metrics()
    }

    /// Returns `true` once the [`Consumer`] has been dropped.
    pub fn is_abandoned(&self) -> bool {
        Arc::strong_count(&self.queue) == 1
    }
}

impl<T> Consumer<T> {
    pub(crate) fn new(queue: Arc<BoundedSpscQueue<T>>) -> Self {
        Self { queue }
    }

    /// Dequeues the oldest element, or `None` if the queue is empty.
    #[inline]
    pub fn poll(&mut self) -> Option<T> {
        // SAFETY: `&mut self` on the only Consumer makes this the only consumer call.
        unsafe { self.queue.poll() }
    }

    /// Borrows the oldest element without dequeuing it.
    #[inline]
    pub fn peek(&mut self) -> Option<&T> {
        // SAFETY: see `poll`; the borrow of `self` keeps the reference from
        // outliving the next consumer call.
        unsafe { self.queue.peek() }
    }

    /// Moves up to `limit` elements to `handler` with a single head update.
    #[inline]
    pub fn drain<F>(&mut self, limit: usize, handler: F) -> usize
    where
        F: FnMut(T),
    {
        // SAFETY: see `poll`.
        unsafe { self.queue.drain(limit, handler) }
    }

    /// Retries `poll` under `backoff` until an element arrives or the backoff
    /// gives up.
    pub fn poll_with_backoff(&mut self, backoff: &mut Backoff) -> Option<T> {
        // SAFETY: see `poll`.
        backoff.retry(|| unsafe { self.queue.poll() }.ok_or(())).ok()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.queue.is_full()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.queue.metrics()
    }

    /// Returns `true` once the [`Producer`] has been dropped.
    ///
    /// Elements it enqueued before going away are still delivered.
    pub fn is_abandoned(&self) -> bool {
        Arc::strong_count(&self.queue) == 1
    }
}

impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer").field("queue", &self.queue).finish()
    }
}

impl<T> fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer").field("queue", &self.queue).finish()
    }
}
