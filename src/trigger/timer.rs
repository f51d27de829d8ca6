//! Countdown and drift bookkeeping for an armed trigger.
//!
//! A countdown pairs a monotonic deadline (what the run loop sleeps on) with
//! a wall-clock target (what remaining-time reads are computed from). When
//! the wall clock jumps the two sides disagree, and the drift monitor picks
//! that up from the wall-clock side on its next periodic check.

use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

/// One outstanding countdown.
#[derive(Debug, Clone)]
pub(crate) struct Countdown {
    deadline: Instant,
    wall_target: DateTime<Local>,
}

impl Countdown {
    pub fn start(now_wall: DateTime<Local>, duration_ms: u64) -> Self {
        Self {
            deadline: Instant::now() + Duration::from_millis(duration_ms),
            wall_target: now_wall + chrono::Duration::milliseconds(duration_ms as i64),
        }
    }

    /// Monotonic instant the run loop sleeps toward.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Wall-clock moment the countdown aims at.
    pub fn wall_target(&self) -> DateTime<Local> {
        self.wall_target
    }

    /// Milliseconds until the wall-clock target, floored at zero.
    pub fn remaining_ms(&self, now_wall: DateTime<Local>) -> u64 {
        self.wall_target
            .signed_duration_since(now_wall)
            .num_milliseconds()
            .max(0) as u64
    }
}

/// Verdict of one periodic remaining-time check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum DriftVerdict {
    /// Remaining time is tracking the schedule within tolerance.
    OnSchedule,
    /// The countdown should already have fired. Force the expiry.
    Overdue,
    /// Remaining time diverged from the schedule. Restart the countdown at
    /// the expected value.
    Restart { expected_ms: u64 },
}

/// Periodic re-validation of an armed countdown against the wall clock.
///
/// Each check compares the observed remaining time with what the previous
/// check predicts (previous value minus one period). A negative prediction
/// means the countdown expires naturally within the period, so no verdict is
/// issued for it.
#[derive(Debug)]
pub(crate) struct DriftMonitor {
    period: Duration,
    tolerance_ms: u64,
    next_check: Instant,
    last_remaining_ms: u64,
}

impl DriftMonitor {
    pub fn start(period_ms: u64, tolerance_ms: u64, initial_remaining_ms: u64) -> Self {
        let period = Duration::from_millis(period_ms);
        Self {
            period,
            tolerance_ms,
            next_check: Instant::now() + period,
            last_remaining_ms: initial_remaining_ms,
        }
    }

    /// Monotonic instant of the next scheduled check.
    pub fn next_check(&self) -> Instant {
        self.next_check
    }

    /// Judges the countdown from its current remaining time and schedules
    /// the following check.
    pub fn check(&mut self, actual_remaining_ms: u64) -> DriftVerdict {
        let expected_ms = self.last_remaining_ms as i64 - self.period.as_millis() as i64;
        self.next_check = Instant::now() + self.period;

        if expected_ms < 0 {
            self.last_remaining_ms = actual_remaining_ms;
            return DriftVerdict::OnSchedule;
        }
        let divergence = (actual_remaining_ms as i64 - expected_ms).unsigned_abs();
        if divergence <= self.tolerance_ms {
            self.last_remaining_ms = actual_remaining_ms;
            return DriftVerdict::OnSchedule;
        }
        if actual_remaining_ms == 0 {
            self.last_remaining_ms = 0;
            DriftVerdict::Overdue
        } else {
            // The caller restarts the countdown at the expected value, so
            // that value is what the next check measures against. Keeping
            // the drifted reading here would flag the same divergence on
            // every following check.
            self.last_remaining_ms = expected_ms as u64;
            DriftVerdict::Restart {
                expected_ms: expected_ms as u64,
            }
        }
    }
}
