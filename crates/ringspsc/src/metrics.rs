use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters written only by the producer.
#[derive(Debug, Default)]
struct ProducerCounters {
    offers: AtomicU64,
    offers_rejected: AtomicU64,
}

/// Counters written only by the consumer.
#[derive(Debug, Default)]
struct ConsumerCounters {
    polls: AtomicU64,
    polls_empty: AtomicU64,
}

/// Optional counters for monitoring queue traffic.
///
/// Each side has a single writer, so increments are a relaxed load + store
/// rather than a read-modify-write. The two sides live on separate cache lines.
#[derive(Debug, Default)]
pub(crate) struct Metrics {
    producer: CachePadded<ProducerCounters>,
    consumer: CachePadded<ConsumerCounters>,
}

#[inline]
fn bump(counter: &AtomicU64, n: u64) {
    counter.store(counter.load(Ordering::Relaxed) + n, Ordering::Relaxed);
}

impl Metrics {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_offer(&self) {
        bump(&self.producer.offers, 1);
    }

    #[inline]
    pub(crate) fn record_offer_rejected(&self) {
        bump(&self.producer.offers_rejected, 1);
    }

    #[inline]
    pub(crate) fn record_polls(&self, n: u64) {
        bump(&self.consumer.polls, n);
    }

    #[inline]
    pub(crate) fn record_poll_empty(&self) {
        bump(&self.consumer.polls_empty, 1);
    }

    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            offers: self.producer.offers.load(Ordering::Relaxed),
            offers_rejected: self.producer.offers_rejected.load(Ordering::Relaxed),
            polls: self.consumer.polls.load(Ordering::Relaxed),
            polls_empty: self.consumer.polls_empty.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the queue counters.
///
/// All zero unless the queue was built with `enable_metrics`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Successful offers.
    pub offers: u64,
    /// Offers rejected because the queue was full.
    pub offers_rejected: u64,
    /// Elements handed to the consumer by `poll` or `drain`.
    pub polls: u64,
    /// Polls that found the queue empty.
    pub polls_empty: u64,
}
