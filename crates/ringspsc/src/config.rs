use crate::ConfigurationError;

/// Configuration for [`BoundedSpscQueue`](crate::BoundedSpscQueue).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Number of slots. Must be a non-zero power of two.
    pub capacity: usize,
    /// Enable metrics collection (slight overhead)
    pub enable_metrics: bool,
}

impl Config {
    /// Creates a configuration with the given capacity and metrics disabled.
    ///
    /// The capacity is not checked here; see [`Config::validate`].
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            enable_metrics: false,
        }
    }

    /// Creates a configuration holding `2^ring_bits` slots.
    ///
    /// Shifts that overflow `usize` produce a zero capacity, which
    /// [`Config::validate`] rejects.
    pub const fn from_bits(ring_bits: u32) -> Self {
        let capacity = match 1usize.checked_shl(ring_bits) {
            Some(capacity) => capacity,
            None => 0,
        };
        Self::new(capacity)
    }

    /// Sets whether metrics are collected.
    pub const fn with_metrics(mut self, enable_metrics: bool) -> Self {
        self.enable_metrics = enable_metrics;
        self
    }

    /// Checks that the capacity is a non-zero power of two.
    pub const fn validate(&self) -> Result<(), ConfigurationError> {
        if self.capacity == 0 {
            return Err(ConfigurationError::ZeroCapacity);
        }
        if !self.capacity.is_power_of_two() {
            return Err(ConfigurationError::NotPowerOfTwo {
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        LOW_LATENCY_CONFIG
    }
}

/// Low latency configuration (1K slots, fits in L1 cache)
pub const LOW_LATENCY_CONFIG: Config = Config::new(1024);

/// High throughput configuration (256K slots)
pub const HIGH_THROUGHPUT_CONFIG: Config = Config::from_bits(18);
