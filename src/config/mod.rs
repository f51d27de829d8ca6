//! Daemon configuration: TOML loading, validation, and conversion into
//! trigger construction parameters.
//!
//! The daemon reads `config.toml` from `~/.config/timetriggers/` (or a path
//! given on the command line). Each `[[trigger]]` entry describes one
//! trigger; fields that do not apply to the entry's kind are rejected at
//! load time so a typo fails the whole load instead of silently arming
//! something else.
//!
//! ```toml
//! [daemon]
//! debug_logging = false     # default engine diagnostics for every trigger
//!
//! # Fires every 10 seconds, give or take 2.
//! [[trigger]]
//! kind = "interval"
//! name = "heartbeat"
//! timeout = { nominal_ms = 10000, tolerance_ms = 2000 }
//! duration = { nominal_ms = 250 }
//!
//! # Fires weekday evenings somewhere between 19:00 and 20:00.
//! [[trigger]]
//! kind = "calendar"
//! name = "evening-lights"
//! days = ["weekdays"]
//! time = "19:30"
//! tolerance = "00:30"
//!
//! # Fires 45 minutes before sunset, any day, at most twice per start.
//! [[trigger]]
//! kind = "calendar"
//! name = "porch-lamp"
//! phenomenon = "sunset"
//! latitude = 37.7749
//! longitude = -122.4194
//! offset = "-00:45"
//! trip_limit = 2
//! ```

pub mod validation;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;

use crate::astro::{EventOffset, Location, Phenomenon};
use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_DRIFT_CHECK_PERIOD_MS, TRIP_LIMIT_UNLIMITED,
};
use crate::schedule::days::DayMask;
use crate::schedule::{AstroSpec, CalendarSpec, ClockTime, ScheduleKind};
use crate::trigger::{TimeRange, TriggerParams};

/// Template written when no configuration file exists yet.
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# timetriggers configuration
#
# Every [[trigger]] entry describes one trigger the daemon should run.
#
# kind = "interval"  fires on a fixed timeout:
#   timeout  = { nominal_ms = 10000, tolerance_ms = 2000 }
#   duration = { nominal_ms = 250 }
#
# kind = "calendar"  fires at a wall-clock time on selected days:
#   days      = ["monday", "weekends"]   # omit for every day
#   time      = "19:30"                  # HH:MM
#   tolerance = "00:30"                  # spread around the time
#
# Calendar triggers may anchor to an astronomical phenomenon instead of
# (or in addition to) a fixed time:
#   phenomenon = "sunset"                # see the documentation for the list
#   latitude   = 37.7749
#   longitude  = -122.4194
#   offset     = "-00:45"                # fire 45 minutes before the event

[daemon]
debug_logging = false

[[trigger]]
kind = "interval"
name = "heartbeat"
timeout = { nominal_ms = 10000, tolerance_ms = 2000 }
duration = { nominal_ms = 250 }
"#;

/// Top-level configuration file contents.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonSection,
    #[serde(default, rename = "trigger")]
    pub triggers: Vec<TriggerEntry>,
}

/// `[daemon]` section: settings that apply to every trigger unless an
/// entry overrides them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DaemonSection {
    pub debug_logging: Option<bool>,
}

/// Which scheduling family a `[[trigger]]` entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    Interval,
    Calendar,
}

/// A `nominal_ms`/`tolerance_ms` pair as written in the file.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RangeEntry {
    pub nominal_ms: i64,
    #[serde(default)]
    pub tolerance_ms: i64,
}

impl From<RangeEntry> for TimeRange {
    fn from(entry: RangeEntry) -> Self {
        TimeRange::new(entry.nominal_ms, entry.tolerance_ms)
    }
}

/// One `[[trigger]]` entry. Everything is optional at the TOML level;
/// kind-dependent requirements are enforced by [`validation::validate_entry`].
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerEntry {
    pub kind: TriggerKind,
    pub name: Option<String>,
    pub signature: Option<String>,
    pub trip_limit: Option<u32>,
    pub debug_logging: Option<bool>,
    pub timeout: Option<RangeEntry>,
    pub duration: Option<RangeEntry>,

    // Calendar-only fields.
    pub days: Option<Vec<String>>,
    pub time: Option<String>,
    pub tolerance: Option<String>,
    pub drift_check_period_ms: Option<u64>,

    // Astronomical anchoring, calendar-only.
    pub phenomenon: Option<Phenomenon>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub offset: Option<String>,
}

impl TriggerEntry {
    /// Converts this entry into trigger construction parameters.
    ///
    /// `default_debug` is the `[daemon]` `debug_logging` value; an entry's
    /// own flag wins when present.
    pub fn trigger_params(&self, default_debug: bool) -> Result<TriggerParams> {
        validation::validate_entry(self)?;

        let schedule = match self.kind {
            TriggerKind::Interval => ScheduleKind::Interval,
            TriggerKind::Calendar => ScheduleKind::Calendar(self.calendar_spec()?),
        };
        schedule.validate()?;

        let timeout = self.timeout.map(TimeRange::from);
        if let Some(range) = &timeout {
            range.validate("timeout")?;
        }
        let duration = self.duration.map(TimeRange::from);
        if let Some(range) = &duration {
            range.validate("duration")?;
        }

        Ok(TriggerParams {
            name: self.name.clone(),
            signature: self.signature.clone(),
            timeout,
            duration,
            trip_limit: self.trip_limit.unwrap_or(TRIP_LIMIT_UNLIMITED),
            schedule,
            debug_logging: self.debug_logging.unwrap_or(default_debug),
            time_source: None,
            provider: None,
        })
    }

    fn calendar_spec(&self) -> Result<CalendarSpec> {
        let days = match &self.days {
            Some(names) if names.is_empty() => {
                bail!("'days' must name at least one day when present")
            }
            Some(names) => {
                let mut mask = DayMask::from_name(&names[0])?;
                for name in &names[1..] {
                    mask = mask | DayMask::from_name(name)?;
                }
                mask
            }
            None => DayMask::ALL_DAYS,
        };

        let time = match &self.time {
            Some(text) => Some(validation::parse_clock(text, "trigger time")?),
            None => None,
        };
        let tolerance = match &self.tolerance {
            Some(text) => validation::parse_clock(text, "trigger tolerance")?,
            None => ClockTime::new(0, 0),
        };

        let astronomical = match self.phenomenon {
            Some(phenomenon) => {
                let (Some(latitude), Some(longitude)) = (self.latitude, self.longitude) else {
                    bail!("astronomical triggers need both 'latitude' and 'longitude'");
                };
                let offset = match &self.offset {
                    Some(text) => validation::parse_offset(text)?,
                    None => EventOffset::default(),
                };
                Some(AstroSpec {
                    phenomenon,
                    location: Location {
                        latitude,
                        longitude,
                    },
                    offset,
                })
            }
            None => None,
        };

        Ok(CalendarSpec {
            days,
            time,
            tolerance,
            astronomical,
            drift_check_period_ms: self
                .drift_check_period_ms
                .unwrap_or(DEFAULT_DRIFT_CHECK_PERIOD_MS),
        })
    }
}

impl Config {
    /// Checks every entry by running the full parameter conversion. Trigger
    /// construction validates again; this pass exists so a bad file fails
    /// the load with the offending entry called out.
    pub fn validate(&self) -> Result<()> {
        let default_debug = self.daemon.debug_logging.unwrap_or(false);
        for (index, entry) in self.triggers.iter().enumerate() {
            entry
                .trigger_params(default_debug)
                .with_context(|| format!("Invalid [[trigger]] entry {}", index + 1))?;
        }
        Ok(())
    }
}

/// Default configuration path: `~/.config/timetriggers/config.toml`.
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|base| base.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
        .ok_or_else(|| anyhow!("Could not determine the user configuration directory"))
}

/// Loads and validates the configuration file at `path`.
pub fn load_from_path(path: &Path) -> Result<Config> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: Config =
        toml::from_str(&raw).with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Writes the commented starter configuration to `path`, creating parent
/// directories as needed. Refuses to overwrite an existing file.
pub fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("config file already exists: {}", path.display());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write default config: {}", path.display()))
}

#[cfg(test)]
mod tests;
