//! Day-of-week window scheduling, optionally anchored to an astronomical
//! phenomenon.
//!
//! Each arming pass hunts for the next qualifying tolerance window around
//! the nominal trigger time and hands the engine a countdown range covering
//! it. Anchored schedules derive the nominal time from fetched phenomenon
//! data and keep the last derived value as a fallback, so a failed fetch
//! degrades to yesterday's time instead of stalling the trigger.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Datelike, Days, Duration, Local, NaiveDate, TimeZone, Timelike};

use crate::astro::{AstroRequest, AstronomicalDay};
use crate::constants::DAYS_PER_WEEK;
use crate::schedule::days::{day_delta, day_number};
use crate::schedule::{CalendarSpec, ClockTime, ScheduleVerdict, Scheduler};
use crate::trigger::TimeRange;

pub(crate) struct CalendarScheduler {
    spec: CalendarSpec,
    /// Nominal time derived from the last successful fetch. Outranks the
    /// configured time once present.
    derived_time: Option<ClockTime>,
    last_trip: Option<DateTime<Local>>,
    refresh_queued: bool,
}

impl CalendarScheduler {
    pub fn new(spec: CalendarSpec) -> Self {
        Self {
            spec,
            derived_time: None,
            last_trip: None,
            refresh_queued: false,
        }
    }

    /// Best-known nominal time: astronomically derived when available,
    /// otherwise the configured one.
    fn nominal_time(&self) -> Option<ClockTime> {
        self.derived_time.or(self.spec.time)
    }

    /// Ready verdict for the next window, or Unschedulable when no nominal
    /// time is known yet.
    fn window_verdict(&self, now: DateTime<Local>) -> ScheduleVerdict {
        let Some(nominal) = self.nominal_time() else {
            return ScheduleVerdict::Unschedulable;
        };
        match self.window(now, nominal) {
            Ok(range) => ScheduleVerdict::Ready(range),
            Err(error) => {
                log_error!("Calendar window computation failed: {error:#}");
                ScheduleVerdict::Unschedulable
            }
        }
    }

    /// Countdown range from `now` to the next qualifying window.
    fn window(&self, now: DateTime<Local>, nominal: ClockTime) -> Result<TimeRange> {
        let today = now.date_naive();
        let today_number = day_number(now.weekday());
        let candidates = self.spec.days.candidates_from(today_number);
        let first = *candidates
            .first()
            .ok_or_else(|| anyhow!("day mask selects no days"))?;

        // Place the tolerance window on the first candidate day.
        let width_ms = self.window_width_ms(today, nominal)?;
        let mut date_min = (instant_at(today, nominal)? - Duration::milliseconds(width_ms / 2))
            .checked_add_days(Days::new(u64::from(day_delta(today_number, first)?)))
            .ok_or_else(|| anyhow!("window start out of calendar range"))?;
        let mut date_max = date_min + Duration::milliseconds(width_ms);

        if date_min < now {
            let in_window = date_max >= now;
            let already_tripped = self
                .last_trip
                .is_some_and(|trip| trip >= date_min && trip <= date_max);
            if in_window && !already_tripped {
                // The window is open and unconsumed. Fire as soon as the
                // drawn value allows.
                date_min = now;
            } else {
                // Window missed or already consumed. Move both ends to the
                // next selected day, a week out when today is the only one.
                let offset_days = match candidates.get(1) {
                    Some(&next) => day_delta(today_number, next)?,
                    None => DAYS_PER_WEEK,
                };
                date_min = date_min
                    .checked_add_days(Days::new(u64::from(offset_days)))
                    .ok_or_else(|| anyhow!("window start out of calendar range"))?;
                date_max = date_max
                    .checked_add_days(Days::new(u64::from(offset_days)))
                    .ok_or_else(|| anyhow!("window end out of calendar range"))?;
            }
        }

        let min_ms = date_min.signed_duration_since(now).num_milliseconds();
        let max_ms = date_max.signed_duration_since(now).num_milliseconds();
        let tolerance_ms = (max_ms - min_ms) / 2;
        let mut nominal_ms = min_ms + tolerance_ms;
        // A window straddling now counts down from zero instead of aiming
        // at an instant already gone.
        if nominal_ms < 0 && nominal_ms + tolerance_ms >= 0 {
            nominal_ms = 0;
        }
        Ok(TimeRange {
            nominal_ms,
            tolerance_ms,
        })
    }

    /// Width of the tolerance window in milliseconds: `nominal - tolerance`
    /// through `nominal + tolerance`, with the upper bound rolled forward a
    /// day when the arithmetic wraps it behind the lower one.
    fn window_width_ms(&self, today: NaiveDate, nominal: ClockTime) -> Result<i64> {
        let nominal_instant = instant_at(today, nominal)?;
        let tolerance = Duration::hours(i64::from(self.spec.tolerance.hour))
            + Duration::minutes(i64::from(self.spec.tolerance.minute));
        let min = nominal_instant - tolerance;
        let mut max = nominal_instant + tolerance;
        if max < min {
            max = max
                .checked_add_days(Days::new(1))
                .ok_or_else(|| anyhow!("tolerance window out of calendar range"))?;
        }
        Ok(max.signed_duration_since(min).num_milliseconds())
    }
}

impl Scheduler for CalendarScheduler {
    fn begin_arming(&mut self, now: DateTime<Local>) -> ScheduleVerdict {
        // Anchored schedules resolve fresh data on every arming pass; the
        // window is computed once the response is absorbed.
        if let Some(astro) = &self.spec.astronomical {
            return ScheduleVerdict::Fetch(AstroRequest::for_day(now.date_naive(), astro.location));
        }
        self.window_verdict(now)
    }

    fn rearm(&mut self, now: DateTime<Local>) -> ScheduleVerdict {
        // Re-arming cannot wait on a fetch. Compute from the best-known
        // nominal time now and refresh the anchor in the background once
        // the trigger is armed again.
        let verdict = self.window_verdict(now);
        if self.spec.astronomical.is_some() && matches!(verdict, ScheduleVerdict::Ready(_)) {
            self.refresh_queued = true;
        }
        verdict
    }

    fn take_refresh(&mut self, now: DateTime<Local>) -> Option<AstroRequest> {
        if !self.refresh_queued {
            return None;
        }
        self.refresh_queued = false;
        self.spec
            .astronomical
            .as_ref()
            .map(|astro| AstroRequest::for_day(now.date_naive(), astro.location))
    }

    fn absorb(
        &mut self,
        now: DateTime<Local>,
        response: Result<AstronomicalDay>,
    ) -> ScheduleVerdict {
        let Some(astro) = self.spec.astronomical else {
            return self.window_verdict(now);
        };
        let day = match response {
            Ok(day) if day.valid => day,
            // Failed or unusable response. Fall back to the best nominal
            // time already known; without one the schedule is dead.
            Ok(_) | Err(_) => return self.window_verdict(now),
        };
        let Some(moment) = day.phenomenon_time(astro.phenomenon) else {
            // The phenomenon does not occur on this day (polar night, no
            // moonrise). Same fallback as a failed fetch.
            return self.window_verdict(now);
        };

        let anchored = moment + Duration::minutes(astro.offset.offset_minutes());
        self.derived_time = Some(ClockTime::new(
            anchored.hour() as i32,
            anchored.minute() as i32,
        ));

        let verdict = self.window_verdict(now);
        if let ScheduleVerdict::Ready(range) = &verdict {
            // The response only answers for its own day. A trip landing on
            // a different day needs that day's data instead.
            let trip_day = (now + Duration::milliseconds(range.nominal_ms)).date_naive();
            if trip_day != day.date {
                return ScheduleVerdict::Fetch(AstroRequest::for_day(trip_day, astro.location));
            }
        }
        verdict
    }

    fn drift_check_period_ms(&self) -> Option<u64> {
        Some(self.spec.drift_check_period_ms)
    }

    fn note_tripped(&mut self, at: DateTime<Local>) {
        self.last_trip = Some(at);
    }

    fn reset(&mut self) {
        // The derived time survives: it is knowledge about the sky, not
        // about this run.
        self.last_trip = None;
    }
}

/// Local midnight of `date`. On days without a representable midnight the
/// earliest valid wall time stands in.
fn local_midnight(date: NaiveDate) -> Result<DateTime<Local>> {
    let naive = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("invalid date {date}"))?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| anyhow!("no representable midnight on {date}"))
}

/// The instant `clock` names on `date`: midnight plus the clock fields as
/// durations, so the permissive -1 and 24/60 edges roll into neighboring
/// days the way the window arithmetic expects.
fn instant_at(date: NaiveDate, clock: ClockTime) -> Result<DateTime<Local>> {
    Ok(local_midnight(date)?
        + Duration::hours(i64::from(clock.hour))
        + Duration::minutes(i64::from(clock.minute)))
}
