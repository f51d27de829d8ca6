//! Time source abstraction for supporting both real and skewed wall clocks.
//!
//! Trigger engines read the wall clock through an injected `Arc<dyn TimeSource>`
//! rather than calling `Local::now()` directly. Production uses
//! [`SystemTimeSource`]; tests inject [`SkewedTimeSource`] to reproduce the
//! clock jumps (DST shifts, system suspend) that the drift self-check exists
//! to catch, without waiting for a real one.
//!
//! Run-loop sleeping stays on monotonic `std::time::Instant` deadlines and is
//! deliberately outside this abstraction: a skewed wall clock must *not* move
//! the underlying timers, otherwise there would be no drift to detect.

use chrono::{DateTime, Local};

#[cfg(feature = "testing-support")]
use chrono::Duration as ChronoDuration;
#[cfg(feature = "testing-support")]
use std::sync::{Mutex, PoisonError};

/// Trait for abstracting wall-clock reads.
pub trait TimeSource: Send + Sync {
    /// Get the current wall-clock time.
    fn now(&self) -> DateTime<Local>;
}

/// Real-time implementation that uses the actual system clock.
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Wall clock that tracks real time plus an adjustable offset.
///
/// The offset starts at zero, so an unskewed instance behaves exactly like
/// [`SystemTimeSource`]. Shifting the offset mid-run reproduces what a DST
/// change or a suspend/resume cycle does to the relationship between the
/// wall clock and the monotonic timers underneath the engine.
#[cfg(feature = "testing-support")]
pub struct SkewedTimeSource {
    offset: Mutex<ChronoDuration>,
}

#[cfg(feature = "testing-support")]
impl SkewedTimeSource {
    /// Create a skewed source with no initial offset.
    pub fn new() -> Self {
        Self {
            offset: Mutex::new(ChronoDuration::zero()),
        }
    }

    /// Shift the reported wall clock by `delta` (negative shifts rewind).
    pub fn shift(&self, delta: ChronoDuration) {
        let mut offset = self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        *offset += delta;
    }

    /// The accumulated offset applied to real time.
    pub fn offset(&self) -> ChronoDuration {
        *self.offset.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(feature = "testing-support")]
impl Default for SkewedTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "testing-support")]
impl TimeSource for SkewedTimeSource {
    fn now(&self) -> DateTime<Local> {
        Local::now() + *self.offset.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
