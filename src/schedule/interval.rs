//! Fixed-interval scheduling.

use chrono::{DateTime, Local};

use crate::schedule::{ScheduleVerdict, Scheduler};
use crate::trigger::TimeRange;

/// Replays the configured timeout range on every arming pass. The trigger
/// fires over and over, each countdown drawn fresh from the same range.
pub(crate) struct IntervalScheduler {
    timeout: TimeRange,
}

impl IntervalScheduler {
    pub fn new(timeout: TimeRange) -> Self {
        Self { timeout }
    }
}

impl Scheduler for IntervalScheduler {
    fn begin_arming(&mut self, _now: DateTime<Local>) -> ScheduleVerdict {
        ScheduleVerdict::Ready(self.timeout)
    }

    fn rearm(&mut self, _now: DateTime<Local>) -> ScheduleVerdict {
        ScheduleVerdict::Ready(self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_pass_replays_the_configured_range() {
        let mut scheduler = IntervalScheduler::new(TimeRange::new(5_000, 250));
        let now = Local::now();

        for verdict in [scheduler.begin_arming(now), scheduler.rearm(now)] {
            match verdict {
                ScheduleVerdict::Ready(range) => {
                    assert_eq!(range, TimeRange::new(5_000, 250));
                }
                other => panic!("expected Ready, got {other:?}"),
            }
        }
    }

    #[test]
    fn interval_needs_no_drift_check_or_refresh() {
        let mut scheduler = IntervalScheduler::new(TimeRange::new(1_000, 0));
        assert!(scheduler.drift_check_period_ms().is_none());
        assert!(scheduler.take_refresh(Local::now()).is_none());
    }
}
