//! Miri-compatible tests for detecting undefined behavior.
//!
//! Run with: `cargo +nightly miri test -p ringspsc-rs --test miri_tests`
//!
//! Small capacities and item counts keep the interpreter fast while still
//! walking the unsafe paths: uninitialized slots, moves out of `MaybeUninit`,
//! wrap-around, and dropping whatever is left in the ring.

use ringspsc_rs::BoundedSpscQueue;
use std::rc::Rc;
use std::thread;

/// Heap-owning items through several wraps.
#[test]
fn miri_owned_items_wrap_around() {
    let (mut tx, mut rx) = BoundedSpscQueue::<String>::new(4).unwrap().split();

    for round in 0..3 {
        for i in 0..4 {
            assert!(tx.offer(format!("{round}-{i}")), "offer failed at round {round} item {i}");
        }
        for i in 0..4 {
            assert_eq!(rx.poll(), Some(format!("{round}-{i}")));
        }
    }
    assert_eq!(rx.poll(), None);
}

/// Items left behind are dropped exactly once when the last handle goes.
#[test]
fn miri_leftovers_dropped_once() {
    let tracker = Rc::new(());
    {
        let q = BoundedSpscQueue::<Rc<()>>::new(4).unwrap();
        let (mut tx, mut rx) = q.split();
        for _ in 0..3 {
            assert!(tx.offer(Rc::clone(&tracker)));
        }
        drop(rx.poll());
        assert!(tx.offer(Rc::clone(&tracker)));
        assert!(tx.offer(Rc::clone(&tracker)));
        assert_eq!(Rc::strong_count(&tracker), 5);
        drop(tx);
        assert_eq!(Rc::strong_count(&tracker), 5);
    }
    assert_eq!(Rc::strong_count(&tracker), 1);
}

/// A drain handler that panics must not cause a double drop.
#[test]
fn miri_drain_panic_is_safe() {
    let tracker = Rc::new(());
    let (mut tx, mut rx) = BoundedSpscQueue::<Rc<()>>::new(4).unwrap().split();
    for _ in 0..4 {
        assert!(tx.offer(Rc::clone(&tracker)));
    }

    let mut calls = 0;
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        rx.drain(4, |item| {
            calls += 1;
            if calls == 2 {
                panic!("handler failure");
            }
            drop(item);
        });
    }));
    assert!(result.is_err());

    // Two consumed (one dropped normally, one during unwind), two still queued
    assert_eq!(rx.len(), 2);
    assert_eq!(Rc::strong_count(&tracker), 3);
    drop((tx, rx));
    assert_eq!(Rc::strong_count(&tracker), 1);
}

/// Cross-thread handoff, small enough for miri's data race detector.
#[test]
fn miri_two_threads() {
    let (mut tx, mut rx) = BoundedSpscQueue::<Box<u32>>::new(2).unwrap().split();

    let producer = thread::spawn(move || {
        for i in 0..16 {
            let mut item = Box::new(i);
            while let Err(err) = tx.try_offer(item) {
                item = err.into_inner();
                thread::yield_now();
            }
        }
    });

    let mut expected = 0;
    while expected < 16 {
        match rx.poll() {
            Some(v) => {
                assert_eq!(*v, expected);
                expected += 1;
            }
            None => thread::yield_now(),
        }
    }
    producer.join().unwrap();
}
