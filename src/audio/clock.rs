use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Monotonic audio-time source in seconds.
///
/// Every position the controller reports is derived from this clock, never from render timing.
pub trait AudioClock: Send + Sync {
    /// Current clock time in seconds.
    fn now(&self) -> f64;
}

/// Wall clock anchored at construction.
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Start a clock at zero.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioClock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Externally stepped clock, used for offline export and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: PositionCell,
}

impl ManualClock {
    /// Start a manual clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Jump to an absolute time.
    pub fn set(&self, secs: f64) {
        self.now.store(secs);
    }

    /// Move forward by `dt` seconds.
    pub fn advance(&self, dt: f64) {
        self.now.store(self.now.load() + dt);
    }
}

impl AudioClock for ManualClock {
    fn now(&self) -> f64 {
        self.now.load()
    }
}

/// Single-writer, multi-reader `f64` cell.
#[derive(Debug, Default)]
pub struct PositionCell {
    bits: AtomicU64,
}

impl PositionCell {
    /// Create a cell holding `value`.
    pub fn new(value: f64) -> Self {
        Self {
            bits: AtomicU64::new(value.to_bits()),
        }
    }

    /// Publish a new value.
    pub fn store(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Release);
    }

    /// Read the last published value.
    pub fn load(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }
}
