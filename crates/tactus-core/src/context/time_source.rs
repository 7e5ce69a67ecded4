//! Audio time sources.

use crate::lockfree::AtomicDouble;
use std::time::Instant;

/// Authoritative, monotonically non-decreasing audio time in seconds.
pub trait TimeSource: Send + Sync {
    fn current_time(&self) -> f64;
}

/// Monotonic wall clock measured from construction.
#[derive(Debug, Clone)]
pub struct WallClock {
    origin: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for WallClock {
    fn current_time(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Externally advanced time, for offline rendering and deterministic tests.
///
/// Moving backwards is ignored.
#[derive(Debug, Default)]
pub struct ManualTime {
    time: AtomicDouble,
}

impl ManualTime {
    pub fn new(start: f64) -> Self {
        Self {
            time: AtomicDouble::new(start),
        }
    }

    pub fn set_time(&self, time: f64) {
        self.time.fetch_max(time);
    }

    pub fn advance(&self, delta: f64) {
        if delta > 0.0 {
            self.time.fetch_add(delta);
        }
    }
}

impl TimeSource for ManualTime {
    fn current_time(&self) -> f64 {
        self.time.get()
    }
}
