//! Field-compatibility checks and clock-string parsing for `[[trigger]]`
//! entries.
//!
//! Interval and calendar triggers share one TOML shape; this module rejects
//! combinations that would otherwise be silently ignored, such as a `time`
//! on an interval trigger.

use anyhow::{Result, anyhow, bail};
use once_cell::sync::Lazy;
use regex::Regex;

use super::{TriggerEntry, TriggerKind};
use crate::astro::{EventOffset, OffsetDirection};
use crate::schedule::ClockTime;

static CLOCK_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2}):(\d{2})$").expect("clock pattern is valid"));

static OFFSET_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([+-])?(\d{1,2}):(\d{2})$").expect("offset pattern is valid"));

/// Parses a wall-clock `"HH:MM"` string. `what` names the field in failure
/// messages.
pub fn parse_clock(text: &str, what: &str) -> Result<ClockTime> {
    let captures = CLOCK_PATTERN
        .captures(text.trim())
        .ok_or_else(|| anyhow!("{what} must be formatted as HH:MM (got '{text}')"))?;
    let hour: i32 = captures[1].parse()?;
    let minute: i32 = captures[2].parse()?;
    if hour > 23 {
        bail!("{what} hour must be between 0 and 23 (got {hour})");
    }
    if minute > 59 {
        bail!("{what} minute must be between 0 and 59 (got {minute})");
    }
    Ok(ClockTime::new(hour, minute))
}

/// Parses a signed `"HH:MM"` offset relative to the anchoring phenomenon.
/// A leading `-` schedules before the event; `+` or no sign schedules after.
pub fn parse_offset(text: &str) -> Result<EventOffset> {
    let captures = OFFSET_PATTERN
        .captures(text.trim())
        .ok_or_else(|| anyhow!("offset must be formatted as [+|-]HH:MM (got '{text}')"))?;
    let direction = match captures.get(1).map(|sign| sign.as_str()) {
        Some("-") => OffsetDirection::Before,
        _ => OffsetDirection::After,
    };
    let hour: i32 = captures[2].parse()?;
    let minute: i32 = captures[3].parse()?;
    if hour > 23 {
        bail!("offset hour must be between 0 and 23 (got {hour})");
    }
    if minute > 59 {
        bail!("offset minute must be between 0 and 59 (got {minute})");
    }
    Ok(EventOffset {
        direction,
        hour,
        minute,
    })
}

/// Rejects field combinations that do not fit the entry's kind.
pub fn validate_entry(entry: &TriggerEntry) -> Result<()> {
    match entry.kind {
        TriggerKind::Interval => {
            let calendar_only = [
                ("days", entry.days.is_some()),
                ("time", entry.time.is_some()),
                ("tolerance", entry.tolerance.is_some()),
                ("drift_check_period_ms", entry.drift_check_period_ms.is_some()),
                ("phenomenon", entry.phenomenon.is_some()),
                ("latitude", entry.latitude.is_some()),
                ("longitude", entry.longitude.is_some()),
                ("offset", entry.offset.is_some()),
            ];
            for (field, present) in calendar_only {
                if present {
                    bail!("'{field}' only applies to calendar triggers");
                }
            }
        }
        TriggerKind::Calendar => {
            if entry.time.is_none() && entry.phenomenon.is_none() {
                bail!("calendar triggers need a 'time' or a 'phenomenon' to aim for");
            }
            if entry.phenomenon.is_some() {
                if entry.latitude.is_none() || entry.longitude.is_none() {
                    bail!("astronomical triggers need both 'latitude' and 'longitude'");
                }
            } else if entry.latitude.is_some() || entry.longitude.is_some() || entry.offset.is_some()
            {
                bail!("'latitude', 'longitude', and 'offset' need a 'phenomenon' to anchor to");
            }
        }
    }
    Ok(())
}
