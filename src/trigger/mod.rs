//! Trigger engine.
//!
//! A [`TimeTrigger`] runs a four-state lifecycle (idle, arming, armed,
//! tripped) on its own worker thread and publishes transitions as
//! [`TriggerEvent`]s. How far away each trip lands is decided by the
//! configured [`ScheduleKind`]: a plain interval replays its timeout range,
//! while a calendar schedule computes day-of-week windows, optionally
//! anchored to astronomical data.
//!
//! Construction validates everything up front and fails fast; after that
//! the trigger only reports problems through events and log output.

pub mod core;
pub mod events;
pub mod state;
pub(crate) mod timer;

use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use anyhow::{Context, Result, anyhow, bail};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::astro::AstronomicalProvider;
use crate::astro::solar::SolarCalculator;
use crate::constants::{
    DEFAULT_DURATION_NOMINAL_MS, DEFAULT_DURATION_TOLERANCE_MS, DEFAULT_TIMEOUT_NOMINAL_MS,
    DEFAULT_TIMEOUT_TOLERANCE_MS, NAME_PREFIX_LENGTH, TRIP_LIMIT_UNLIMITED,
};
use crate::schedule::{ScheduleKind, build_scheduler};
use crate::time_source::{SystemTimeSource, TimeSource};
use crate::trigger::core::{EngineSeed, Snapshot, TriggerCommand};
use crate::trigger::events::TriggerEvent;
use crate::trigger::state::TriggerState;

/// Inclusive range a timer value is drawn from: `nominal ± tolerance`
/// milliseconds, clamped at zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub nominal_ms: i64,
    pub tolerance_ms: i64,
}

impl TimeRange {
    pub fn new(nominal_ms: i64, tolerance_ms: i64) -> Self {
        Self {
            nominal_ms,
            tolerance_ms,
        }
    }

    /// Configured ranges must be non-negative on both fields. Window ranges
    /// computed internally may carry a negative nominal until realized, so
    /// this is only applied to caller-supplied configuration.
    pub fn validate(&self, what: &str) -> Result<()> {
        if self.nominal_ms < 0 {
            bail!(
                "{what} nominal must be non-negative (got {})",
                self.nominal_ms
            );
        }
        if self.tolerance_ms < 0 {
            bail!(
                "{what} tolerance must be non-negative (got {})",
                self.tolerance_ms
            );
        }
        Ok(())
    }

    /// Draws the effective value for this range.
    pub fn realize(&self) -> u64 {
        let low = self.nominal_ms - self.tolerance_ms;
        let high = self.nominal_ms + self.tolerance_ms;
        let drawn = if high > low {
            rand::rng().random_range(low..=high)
        } else {
            low
        };
        drawn.max(0) as u64
    }
}

/// Construction parameters for a [`TimeTrigger`].
#[derive(Clone)]
pub struct TriggerParams {
    /// Friendly label. Defaults to a prefix of the signature.
    pub name: Option<String>,
    /// Stable external key for persistence and matching. Defaults to a
    /// hash of the configuration.
    pub signature: Option<String>,
    /// Armed countdown range. Calendar schedules supersede it with their
    /// computed windows.
    pub timeout: Option<TimeRange>,
    /// Tripped hold range.
    pub duration: Option<TimeRange>,
    /// Trips before winding down to idle. Zero means unlimited.
    pub trip_limit: u32,
    pub schedule: ScheduleKind,
    /// Per-trigger diagnostic logging.
    pub debug_logging: bool,
    /// Clock override, mainly for tests. Defaults to the system clock.
    pub time_source: Option<Arc<dyn TimeSource>>,
    /// Astronomical data source. Defaults to the local solar calculator
    /// when the schedule carries an astronomical anchor.
    pub provider: Option<Arc<dyn AstronomicalProvider>>,
}

impl fmt::Debug for TriggerParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerParams")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("timeout", &self.timeout)
            .field("duration", &self.duration)
            .field("trip_limit", &self.trip_limit)
            .field("schedule", &self.schedule)
            .field("debug_logging", &self.debug_logging)
            .field("time_source", &self.time_source.as_ref().map(|_| ".."))
            .field("provider", &self.provider.as_ref().map(|_| ".."))
            .finish()
    }
}

impl Default for TriggerParams {
    fn default() -> Self {
        Self {
            name: None,
            signature: None,
            timeout: None,
            duration: None,
            trip_limit: TRIP_LIMIT_UNLIMITED,
            schedule: ScheduleKind::Interval,
            debug_logging: false,
            time_source: None,
            provider: None,
        }
    }
}

/// The identity triple every trigger carries. `uuid` is process-unique and
/// correlates events; `signature` and `name` are stable across restarts for
/// the same configuration.
#[derive(Debug, Clone)]
struct Identity {
    uuid: Uuid,
    signature: String,
    name: String,
}

/// Serialized view of the configuration fields a content-derived signature
/// hashes over.
#[derive(Serialize)]
struct SignatureView<'a> {
    schedule: &'a ScheduleKind,
    timeout: TimeRange,
    duration: TimeRange,
    trip_limit: u32,
}

fn derive_identity(
    params: &TriggerParams,
    timeout: TimeRange,
    duration: TimeRange,
) -> Result<Identity> {
    let signature = match &params.signature {
        Some(signature) if !signature.is_empty() => signature.clone(),
        _ => {
            let view = SignatureView {
                schedule: &params.schedule,
                timeout,
                duration,
                trip_limit: params.trip_limit,
            };
            let canonical = serde_json::to_string(&view)
                .context("Failed to serialize trigger configuration for its signature")?;
            sha256::digest(canonical)
        }
    };
    let name = match &params.name {
        Some(name) if !name.is_empty() => name.clone(),
        _ => signature
            .get(..NAME_PREFIX_LENGTH)
            .unwrap_or(&signature)
            .to_string(),
    };
    Ok(Identity {
        uuid: Uuid::new_v4(),
        signature,
        name,
    })
}

/// Handle to a running trigger.
///
/// The trigger lives on its own worker thread. Dropping the handle shuts
/// the worker down and waits for it to finish.
pub struct TimeTrigger {
    identity: Identity,
    trip_limit: u32,
    commands: Sender<TriggerCommand>,
    snapshot: Arc<Mutex<Snapshot>>,
    time_source: Arc<dyn TimeSource>,
    worker: Option<JoinHandle<()>>,
}

impl TimeTrigger {
    /// Validates `params`, spawns the worker, and returns the handle along
    /// with a subscription that is guaranteed to observe the initial idle
    /// announcement.
    pub fn new(params: TriggerParams) -> Result<(Self, Receiver<TriggerEvent>)> {
        let timeout = params.timeout.unwrap_or(TimeRange {
            nominal_ms: DEFAULT_TIMEOUT_NOMINAL_MS,
            tolerance_ms: DEFAULT_TIMEOUT_TOLERANCE_MS,
        });
        timeout.validate("timeout")?;
        let duration = params.duration.unwrap_or(TimeRange {
            nominal_ms: DEFAULT_DURATION_NOMINAL_MS,
            tolerance_ms: DEFAULT_DURATION_TOLERANCE_MS,
        });
        duration.validate("duration")?;
        params.schedule.validate()?;

        let identity = derive_identity(&params, timeout, duration)?;
        let time_source: Arc<dyn TimeSource> = match &params.time_source {
            Some(source) => Arc::clone(source),
            None => Arc::new(SystemTimeSource),
        };
        let provider: Option<Arc<dyn AstronomicalProvider>> =
            match (&params.provider, &params.schedule) {
                (Some(provider), _) => Some(Arc::clone(provider)),
                (None, ScheduleKind::Calendar(spec)) if spec.astronomical.is_some() => {
                    Some(Arc::new(SolarCalculator))
                }
                _ => None,
            };

        let (command_tx, command_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let snapshot = Arc::new(Mutex::new(Snapshot::new()));

        let seed = EngineSeed {
            uuid: identity.uuid,
            name: identity.name.clone(),
            timeout_range: timeout,
            duration_range: duration,
            trip_limit: params.trip_limit,
            debug_logging: params.debug_logging,
            scheduler: build_scheduler(&params.schedule, timeout),
            provider,
            time_source: Arc::clone(&time_source),
            snapshot: Arc::clone(&snapshot),
            commands: command_rx,
            loopback: command_tx.clone(),
            initial_sink: event_tx,
        };
        let worker = std::thread::Builder::new()
            .name(format!("trigger-{}", identity.name))
            .spawn(move || core::run(seed))
            .context("Failed to spawn trigger worker thread")?;

        Ok((
            Self {
                identity,
                trip_limit: params.trip_limit,
                commands: command_tx,
                snapshot,
                time_source,
                worker: Some(worker),
            },
            event_rx,
        ))
    }

    /// Starts (or restarts) the trigger. A trigger that is not idle is
    /// wound down first, so Start always arms from a clean slate.
    pub fn start(&self) -> Result<()> {
        self.send(TriggerCommand::Start)
    }

    /// Winds the trigger down to idle.
    pub fn stop(&self) -> Result<()> {
        self.send(TriggerCommand::Stop)
    }

    /// Adds a subscription. Events already published are not replayed; use
    /// the receiver returned by [`TimeTrigger::new`] to observe the trigger
    /// from its very first transition.
    pub fn subscribe(&self) -> Result<Receiver<TriggerEvent>> {
        let (event_tx, event_rx) = mpsc::channel();
        self.send(TriggerCommand::Subscribe(event_tx))?;
        Ok(event_rx)
    }

    fn send(&self, command: TriggerCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| anyhow!("trigger '{}' worker is gone", self.identity.name))
    }

    pub fn identifier(&self) -> Uuid {
        self.identity.uuid
    }

    pub fn signature(&self) -> &str {
        &self.identity.signature
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn state(&self) -> TriggerState {
        self.read_snapshot().state
    }

    /// Last realized armed countdown, in milliseconds.
    pub fn timeout_ms(&self) -> u64 {
        self.read_snapshot().timeout_ms
    }

    /// Last realized tripped hold, in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.read_snapshot().duration_ms
    }

    pub fn trip_count(&self) -> u32 {
        self.read_snapshot().trip_count
    }

    /// Configured trip ceiling; zero means unlimited.
    pub fn trip_limit(&self) -> u32 {
        self.trip_limit
    }

    /// Milliseconds until the outstanding countdown fires, floored at zero.
    /// Zero when no countdown is running.
    pub fn time_remaining_ms(&self) -> u64 {
        match self.read_snapshot().countdown_target {
            Some(target) => target
                .signed_duration_since(self.time_source.now())
                .num_milliseconds()
                .max(0) as u64,
            None => 0,
        }
    }

    fn read_snapshot(&self) -> Snapshot {
        self.snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Drop for TimeTrigger {
    fn drop(&mut self) {
        let _ = self.commands.send(TriggerCommand::Terminate);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
