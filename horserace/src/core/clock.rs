//! Time sources for the frame loop.
//!
//! The simulation never reads the wall clock directly. A session owns one clock and hands clones
//! of it to the orchestrator and the simulation, so both always agree on "now".

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub trait Clock {
    /// Current time in milliseconds since the clock's origin.
    fn now_ms(&self) -> f64;
}

/// Wall clock, optionally running faster or slower than real time.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
    time_scale: f64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::with_time_scale(1.0)
    }

    /// `time_scale` must be positive, otherwise the clock stands still or runs backwards.
    pub fn with_time_scale(time_scale: f64) -> Self {
        debug_assert!(time_scale > 0.0, "Time scale must be positive!");
        SystemClock {
            origin: Instant::now(),
            time_scale,
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0 * self.time_scale
    }
}

/// Manually advanced clock. Clones share the same time, so advancing one handle advances all of
/// them. Used for headless sessions and tests.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_us: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now_us.fetch_add(by.as_micros() as u64, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms))
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now_us.load(Ordering::SeqCst) as f64 / 1000.0
    }
}
