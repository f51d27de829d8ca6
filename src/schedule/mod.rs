//! Scheduling strategies.
//!
//! The trigger engine owns states, timers, and events; a [`Scheduler`]
//! decides how far away the next trip is. Two strategies exist: a fixed
//! interval that re-uses its configured range, and a calendar strategy that
//! hunts for the next qualifying day-of-week window, optionally anchored to
//! an astronomical phenomenon resolved through an asynchronous fetch.

pub mod calendar;
pub mod days;
pub mod interval;

use anyhow::{Result, bail};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::astro::{AstroRequest, AstronomicalDay, EventOffset, Location, Phenomenon};
use crate::constants::{
    DEFAULT_DRIFT_CHECK_PERIOD_MS, MAXIMUM_HOUR, MAXIMUM_MINUTE, MINIMUM_HOUR, MINIMUM_MINUTE,
};
use crate::schedule::days::DayMask;
use crate::trigger::TimeRange;

/// Wall-clock fields naming a time of day, also used for the symmetric
/// tolerance around it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClockTime {
    pub hour: i32,
    pub minute: i32,
}

impl ClockTime {
    pub fn new(hour: i32, minute: i32) -> Self {
        Self { hour, minute }
    }

    /// Bounds check, one wider than a clock reads on each side. `what`
    /// names the field in the failure message.
    pub fn validate(&self, what: &str) -> Result<()> {
        if !(MINIMUM_HOUR..=MAXIMUM_HOUR).contains(&self.hour) {
            bail!(
                "{what} hour must be between {MINIMUM_HOUR} and {MAXIMUM_HOUR} (got {})",
                self.hour
            );
        }
        if !(MINIMUM_MINUTE..=MAXIMUM_MINUTE).contains(&self.minute) {
            bail!(
                "{what} minute must be between {MINIMUM_MINUTE} and {MAXIMUM_MINUTE} (got {})",
                self.minute
            );
        }
        Ok(())
    }
}

/// Astronomical anchoring of a calendar schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AstroSpec {
    pub phenomenon: Phenomenon,
    pub location: Location,
    #[serde(default)]
    pub offset: EventOffset,
}

/// Calendar schedule configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarSpec {
    /// Days of the week the trigger may fire on.
    #[serde(default)]
    pub days: DayMask,
    /// Nominal time of day. Ignored while astronomical data is available,
    /// but still serves as the fallback before the first successful fetch.
    pub time: Option<ClockTime>,
    /// Symmetric window half-width around the nominal time.
    #[serde(default = "CalendarSpec::default_tolerance")]
    pub tolerance: ClockTime,
    /// Anchor the nominal time to a fetched phenomenon.
    pub astronomical: Option<AstroSpec>,
    /// Remaining-time re-validation period while armed.
    #[serde(default = "CalendarSpec::default_drift_period")]
    pub drift_check_period_ms: u64,
}

impl CalendarSpec {
    fn default_tolerance() -> ClockTime {
        ClockTime::new(0, 0)
    }

    fn default_drift_period() -> u64 {
        DEFAULT_DRIFT_CHECK_PERIOD_MS
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(time) = &self.time {
            time.validate("trigger time")?;
        }
        self.tolerance.validate("trigger time tolerance")?;
        if let Some(astro) = &self.astronomical {
            astro.location.validate()?;
            astro.offset.validate()?;
        } else if self.time.is_none() {
            bail!("calendar schedule needs a trigger time or an astronomical anchor");
        }
        if self.drift_check_period_ms == 0 {
            bail!("drift check period must be positive (got 0)");
        }
        Ok(())
    }
}

/// How the engine should schedule trips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    /// Fire on the configured timeout range, over and over.
    Interval,
    /// Fire inside day-of-week windows, optionally astronomically anchored.
    Calendar(CalendarSpec),
}

impl ScheduleKind {
    pub fn validate(&self) -> Result<()> {
        match self {
            ScheduleKind::Interval => Ok(()),
            ScheduleKind::Calendar(spec) => spec.validate(),
        }
    }
}

/// Verdict of a scheduling pass.
#[derive(Debug, Clone)]
pub(crate) enum ScheduleVerdict {
    /// Timeout range ready. The engine realizes a value from it and arms.
    Ready(TimeRange),
    /// Astronomical data must be resolved first. The engine runs the fetch
    /// and feeds the response back through [`Scheduler::absorb`].
    Fetch(AstroRequest),
    /// No viable schedule. The engine winds the trigger down.
    Unschedulable,
}

/// Strategy consulted by the engine whenever timer values regenerate.
///
/// All methods take `now` from the engine's time source so a strategy never
/// reads the clock itself.
pub(crate) trait Scheduler: Send {
    /// Arming entry. The only pass allowed to hold the trigger in Arming by
    /// returning [`ScheduleVerdict::Fetch`].
    fn begin_arming(&mut self, now: DateTime<Local>) -> ScheduleVerdict;

    /// Tripped-to-Armed handoff. Must produce a range without waiting; a
    /// strategy that schedules from fetched data recomputes from its last
    /// known nominal time and queues a background refresh instead.
    fn rearm(&mut self, now: DateTime<Local>) -> ScheduleVerdict;

    /// Background refresh queued by [`Scheduler::rearm`], drained by the
    /// engine once the transition has committed.
    fn take_refresh(&mut self, _now: DateTime<Local>) -> Option<AstroRequest> {
        None
    }

    /// Feeds back a fetch response. The returned verdict applies while the
    /// trigger is still Arming on the issuing generation; for anything
    /// stale the engine discards the verdict and only the cached nominal
    /// time survives.
    fn absorb(
        &mut self,
        _now: DateTime<Local>,
        _response: Result<AstronomicalDay>,
    ) -> ScheduleVerdict {
        ScheduleVerdict::Unschedulable
    }

    /// Remaining-time re-validation period while armed. `None` skips the
    /// drift check entirely.
    fn drift_check_period_ms(&self) -> Option<u64> {
        None
    }

    /// Records a trip so an already-consumed window is not reused.
    fn note_tripped(&mut self, _at: DateTime<Local>) {}

    /// Inactive entry. Forgets the recorded trip so a restarted trigger can
    /// reuse a still-open window.
    fn reset(&mut self) {}
}

/// Builds the strategy for a schedule kind. The interval strategy replays
/// `timeout`; the calendar strategy derives its own ranges.
pub(crate) fn build_scheduler(kind: &ScheduleKind, timeout: TimeRange) -> Box<dyn Scheduler> {
    match kind {
        ScheduleKind::Interval => Box::new(interval::IntervalScheduler::new(timeout)),
        ScheduleKind::Calendar(spec) => Box::new(calendar::CalendarScheduler::new(spec.clone())),
    }
}
