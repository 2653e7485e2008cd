use std::hint;
use std::thread;

/// Caller-side retry policy for a failed `offer` or `poll`.
///
/// The queue never waits. A caller that wants to retry spins with PAUSE hints,
/// then yields to the OS, then gives up; the limits are configurable because
/// latency-bound callers usually want to spin longer than they yield.
#[derive(Debug, Clone)]
pub struct Backoff {
    step: u32,
    spin_limit: u32,
    yield_limit: u32,
}

impl Backoff {
    /// 2^6 = 64 spins max before yielding
    pub const DEFAULT_SPIN_LIMIT: u32 = 6;
    /// Steps after which [`Backoff::is_completed`] reports true
    pub const DEFAULT_YIELD_LIMIT: u32 = 10;

    /// Creates a backoff with the default limits.
    #[inline]
    pub fn new() -> Self {
        Self::with_limits(Self::DEFAULT_SPIN_LIMIT, Self::DEFAULT_YIELD_LIMIT)
    }

    /// Creates a backoff that spins for `spin_limit` steps and gives up after
    /// `yield_limit` steps. `yield_limit` is raised to `spin_limit` if lower.
    #[inline]
    pub fn with_limits(spin_limit: u32, yield_limit: u32) -> Self {
        let spin_limit = spin_limit.min(16);
        Self {
            step: 0,
            spin_limit,
            yield_limit: yield_limit.max(spin_limit),
        }
    }

    /// Spin `2^step` PAUSE hints; never yields.
    #[inline]
    pub fn spin(&mut self) {
        for _ in 0..1u32 << self.step.min(self.spin_limit) {
            hint::spin_loop();
        }
        if self.step <= self.spin_limit {
            self.step += 1;
        }
    }

    /// Spin while under the spin limit, yield afterwards.
    #[inline]
    pub fn snooze(&mut self) {
        if self.step <= self.spin_limit {
            self.spin();
        } else {
            thread::yield_now();
            if self.step <= self.yield_limit {
                self.step += 1;
            }
        }
    }

    #[inline]
    pub fn is_completed(&self) -> bool {
        self.step > self.yield_limit
    }

    #[inline]
    pub fn reset(&mut self) {
        self.step = 0;
    }

    /// Calls `attempt` until it yields a value or patience runs out.
    ///
    /// `attempt` runs at least once. Returns the last `Err` on give-up so
    /// callers can recover whatever they tried to hand over.
    pub fn retry<R, E>(&mut self, mut attempt: impl FnMut() -> Result<R, E>) -> Result<R, E> {
        loop {
            match attempt() {
                Ok(value) => return Ok(value),
                Err(err) if self.is_completed() => return Err(err),
                Err(_) => self.snooze(),
            }
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}
