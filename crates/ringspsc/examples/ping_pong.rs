//! Two threads bouncing a handle between a pair of queues.
//!
//! Run with: `RUST_LOG=ringspsc_rs=debug cargo run -p ringspsc-rs --release --example ping_pong`

use ringspsc_rs::{Backoff, BoundedSpscQueue, Config, LOW_LATENCY_CONFIG};
use std::thread;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const ROUND_TRIPS: u64 = 1_000_000;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config: Config = LOW_LATENCY_CONFIG.with_metrics(true);
    let (mut ping_tx, mut ping_rx) = BoundedSpscQueue::<&'static u64>::with_config(config)
        .expect("valid config")
        .split();
    let (mut pong_tx, mut pong_rx) = BoundedSpscQueue::<&'static u64>::with_config(config)
        .expect("valid config")
        .split();

    let ball: &'static u64 = Box::leak(Box::new(7));

    let echo = thread::spawn(move || {
        let mut backoff = Backoff::new();
        for _ in 0..ROUND_TRIPS {
            let handle = loop {
                if let Some(h) = ping_rx.poll_with_backoff(&mut backoff) {
                    break h;
                }
                backoff.reset();
            };
            backoff.reset();
            while !pong_tx.offer(handle) {
                std::hint::spin_loop();
            }
        }
        ping_rx.metrics()
    });

    let start = Instant::now();
    for _ in 0..ROUND_TRIPS {
        while !ping_tx.offer(ball) {
            std::hint::spin_loop();
        }
        while pong_rx.poll().is_none() {
            std::hint::spin_loop();
        }
    }
    let elapsed = start.elapsed();
    let ping_metrics = echo.join().expect("echo thread panicked");

    println!(
        "{} round trips in {:?} ({:.1} ns/round trip)",
        ROUND_TRIPS,
        elapsed,
        elapsed.as_nanos() as f64 / ROUND_TRIPS as f64
    );
    println!("ping queue: {:?}", ping_metrics);
    println!("pong queue: {:?}", pong_rx.metrics());
}
