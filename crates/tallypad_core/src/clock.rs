//! Wall-clock source for time-dependent core logic.
//!
//! # Responsibility
//! - Provide "now" in epoch milliseconds to the save scheduler and the
//!   session timer.
//! - Keep time injectable so policy logic stays deterministic under test.
//!
//! # Invariants
//! - Elapsed-time math is wall-clock based, never tick-counted; consumers
//!   clamp negative differences instead of assuming monotonicity.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current wall-clock time in epoch milliseconds.
pub trait Clock {
    fn now_millis(&self) -> i64;
}

/// Production clock backed by the operating system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX),
            // Pre-epoch system clocks collapse to zero; downstream math clamps.
            Err(_) => 0,
        }
    }
}

/// Hand-driven clock for tests and host shells that simulate time.
///
/// Clones share the same underlying instant, so a test can keep one handle
/// while the component under test owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    /// Creates a clock frozen at `start_millis`.
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start_millis)),
        }
    }

    /// Moves the clock forward by `delta_millis`.
    pub fn advance(&self, delta_millis: i64) {
        self.now.fetch_add(delta_millis, Ordering::SeqCst);
    }

    /// Pins the clock to an absolute instant.
    pub fn set(&self, now_millis: i64) {
        self.now.store(now_millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
