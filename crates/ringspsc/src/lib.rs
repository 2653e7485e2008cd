//! RingSPSC - Bounded Lock-Free Single-Producer Single-Consumer Queue
//!
//! A fixed-capacity ring buffer through which exactly one producer thread and
//! one consumer thread exchange element handles without locks.
//!
//! # Key Features
//!
//! - Non-blocking `offer` / `poll`: full and empty are ordinary results
//! - Power-of-two capacity, validated at construction (never rounded)
//! - Cache-padded cursors and cached peer cursors (no false sharing)
//! - Plain Release/Acquire loads and stores, no compare-and-swap
//! - Safe [`Producer`] / [`Consumer`] halves via [`BoundedSpscQueue::split`]
//!
//! # Single-producer / single-consumer
//!
//! Two producers or two consumers on one queue is undefined behavior. The raw
//! queue methods are `unsafe` for that reason; the split handles rule it out
//! at compile time.
//!
//! # Example
//!
//! ```
//! use ringspsc_rs::BoundedSpscQueue;
//! use std::thread;
//!
//! let (mut producer, mut consumer) = BoundedSpscQueue::<u64>::new(1024).unwrap().split();
//!
//! let handle = thread::spawn(move || {
//!     for i in 0..10_000 {
//!         while !producer.offer(i) {
//!             std::hint::spin_loop();
//!         }
//!     }
//! });
//!
//! let mut expected = 0;
//! while expected < 10_000 {
//!     if let Some(v) = consumer.poll() {
//!         assert_eq!(v, expected);
//!         expected += 1;
//!     }
//! }
//! handle.join().unwrap();
//! ```

mod backoff;
mod config;
mod error;
mod handle;
mod index;
mod invariants;
mod metrics;
mod queue;

pub use backoff::Backoff;
pub use config::{Config, HIGH_THROUGHPUT_CONFIG, LOW_LATENCY_CONFIG};
pub use error::{ConfigurationError, OfferError};
pub use handle::{Consumer, Producer};
pub use metrics::MetricsSnapshot;
pub use queue::BoundedSpscQueue;
