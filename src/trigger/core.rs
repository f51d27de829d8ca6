//! Trigger engine internals.
//!
//! Every trigger runs one engine on a dedicated worker thread. The engine
//! owns the state machine, both timers, the scheduling strategy, and the
//! subscriber fanout; the public handle talks to it exclusively through the
//! command channel and reads a mutex-guarded snapshot that the engine
//! refreshes after every transition.
//!
//! Transitions evaluate synchronously, but scheduling verdicts advance the
//! machine through a deferred action queue drained at the top of the run
//! loop. Arming therefore never jumps straight to Armed inside a single
//! call stack, which keeps entry work, event publication, and command
//! handling strictly ordered.

use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Local};
use uuid::Uuid;

use crate::astro::{AstroRequest, AstronomicalDay, AstronomicalProvider};
use crate::constants::{DRIFT_TOLERANCE_MS, TRIP_LIMIT_UNLIMITED};
use crate::schedule::{ScheduleVerdict, Scheduler};
use crate::time_source::TimeSource;
use crate::trigger::TimeRange;
use crate::trigger::events::{EventSinks, TriggerEvent};
use crate::trigger::state::{TriggerAction, TriggerState};
use crate::trigger::timer::{Countdown, DriftMonitor, DriftVerdict};

/// Commands accepted by the worker.
pub(crate) enum TriggerCommand {
    Start,
    Stop,
    Subscribe(Sender<TriggerEvent>),
    /// Completion of an astronomical fetch. `generation` names the fetch
    /// the response answers; a stale generation still refreshes the
    /// scheduler's cached data but drives no transition.
    AstroComplete {
        generation: u64,
        response: Result<AstronomicalDay>,
    },
    Terminate,
}

/// Trigger state mirrored out to the handle for accessor reads.
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    pub state: TriggerState,
    pub timeout_ms: u64,
    pub duration_ms: u64,
    pub trip_count: u32,
    pub countdown_target: Option<DateTime<Local>>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self {
            state: TriggerState::Inactive,
            timeout_ms: 0,
            duration_ms: 0,
            trip_count: 0,
            countdown_target: None,
        }
    }
}

/// Everything the worker needs, assembled by the handle constructor.
pub(crate) struct EngineSeed {
    pub uuid: Uuid,
    pub name: String,
    pub timeout_range: TimeRange,
    pub duration_range: TimeRange,
    pub trip_limit: u32,
    pub debug_logging: bool,
    pub scheduler: Box<dyn Scheduler>,
    pub provider: Option<Arc<dyn AstronomicalProvider>>,
    pub time_source: Arc<dyn TimeSource>,
    pub snapshot: Arc<Mutex<Snapshot>>,
    pub commands: Receiver<TriggerCommand>,
    pub loopback: Sender<TriggerCommand>,
    pub initial_sink: Sender<TriggerEvent>,
}

/// Worker entry point. Returns once a Terminate command arrives.
pub(crate) fn run(seed: EngineSeed) {
    Engine::new(seed).run();
}

struct Engine {
    uuid: Uuid,
    name: String,
    trip_limit: u32,
    debug_logging: bool,
    timeout_range: TimeRange,
    duration_range: TimeRange,
    timeout_ms: u64,
    duration_ms: u64,
    trip_count: u32,
    state: TriggerState,
    scheduler: Box<dyn Scheduler>,
    provider: Option<Arc<dyn AstronomicalProvider>>,
    time_source: Arc<dyn TimeSource>,
    snapshot: Arc<Mutex<Snapshot>>,
    commands: Receiver<TriggerCommand>,
    loopback: Sender<TriggerCommand>,
    sinks: EventSinks,
    pending: VecDeque<TriggerAction>,
    countdown: Option<Countdown>,
    drift: Option<DriftMonitor>,
    astro_generation: u64,
}

impl Engine {
    fn new(seed: EngineSeed) -> Self {
        let mut sinks = EventSinks::new();
        sinks.add(seed.initial_sink);
        Self {
            uuid: seed.uuid,
            name: seed.name,
            trip_limit: seed.trip_limit,
            debug_logging: seed.debug_logging,
            timeout_range: seed.timeout_range,
            duration_range: seed.duration_range,
            timeout_ms: 0,
            duration_ms: 0,
            trip_count: 0,
            state: TriggerState::Inactive,
            scheduler: seed.scheduler,
            provider: seed.provider,
            time_source: seed.time_source,
            snapshot: seed.snapshot,
            commands: seed.commands,
            loopback: seed.loopback,
            sinks,
            pending: VecDeque::new(),
            countdown: None,
            drift: None,
            astro_generation: 0,
        }
    }

    fn run(mut self) {
        // Settle into Inactive first: realizes the initial timer values and
        // announces the resting state before any command is looked at.
        self.transition_to(TriggerState::Inactive);
        self.update_snapshot();

        loop {
            while let Some(action) = self.pending.pop_front() {
                self.evaluate(action);
            }

            let command = match self.next_deadline() {
                Some(deadline) => {
                    let now = Instant::now();
                    if deadline <= now {
                        self.handle_deadlines();
                        continue;
                    }
                    match self.commands.recv_timeout(deadline - now) {
                        Ok(command) => command,
                        Err(RecvTimeoutError::Timeout) => {
                            self.handle_deadlines();
                            continue;
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match self.commands.recv() {
                    Ok(command) => command,
                    Err(_) => break,
                },
            };
            if !self.handle_command(command) {
                break;
            }
        }
        if self.debug_logging {
            log_debug!("Trigger '{}' worker exiting", self.name);
        }
    }

    /// Returns false once the worker should exit.
    fn handle_command(&mut self, command: TriggerCommand) -> bool {
        match command {
            TriggerCommand::Start => {
                if self.debug_logging {
                    log_debug!("Trigger '{}' start requested", self.name);
                }
                // Starting anywhere but Inactive winds the machine down
                // first, so Start always arms from a clean slate.
                if self.state != TriggerState::Inactive {
                    self.evaluate(TriggerAction::Abort);
                }
                self.evaluate(TriggerAction::Next);
            }
            TriggerCommand::Stop => {
                if self.debug_logging {
                    log_debug!("Trigger '{}' stop requested", self.name);
                }
                self.evaluate(TriggerAction::Abort);
            }
            TriggerCommand::Subscribe(sink) => self.sinks.add(sink),
            TriggerCommand::AstroComplete {
                generation,
                response,
            } => self.absorb_astro(generation, response),
            TriggerCommand::Terminate => return false,
        }
        true
    }

    fn evaluate(&mut self, action: TriggerAction) {
        let target = self.state.on_action(action, self.trip_limit_expired());
        self.transition_to(target);
        self.update_snapshot();
    }

    fn transition_to(&mut self, next: TriggerState) {
        // The exit whitelist is the machine's safety net. The policy table
        // only produces legal targets, so a rejection here is a bug report,
        // not a crash.
        if !self.state.may_exit_to(next) {
            log_error!(
                "Trigger '{}' rejected transition {} -> {}",
                self.name,
                self.state,
                next
            );
            return;
        }
        let now = self.time_source.now();

        // Exit work runs before the change of state commits.
        if self.state == TriggerState::Tripped && next == TriggerState::Armed {
            // Re-arming must produce a countdown without waiting. A
            // scheduler that cannot winds the trigger down instead.
            match self.scheduler.rearm(now) {
                ScheduleVerdict::Ready(range) => {
                    self.timeout_range = range;
                    self.timeout_ms = range.realize();
                }
                ScheduleVerdict::Fetch(_) | ScheduleVerdict::Unschedulable => {
                    log_warning!("Trigger '{}' could not re-arm, winding down", self.name);
                    self.pending.push_back(TriggerAction::Abort);
                    return;
                }
            }
        }
        if next == TriggerState::Inactive {
            self.stop_timers();
            self.timeout_ms = self.timeout_range.realize();
            self.duration_ms = self.duration_range.realize();
        }

        let previous = self.state;
        self.state = next;
        if self.debug_logging {
            log_debug!("Trigger '{}' {} -> {}", self.name, previous, next);
        }
        if previous != next {
            self.sinks.publish(TriggerEvent::StateChanged {
                uuid: self.uuid,
                old_state: previous,
                new_state: next,
            });
        }
        self.notify_current_state();

        // Entry work runs after subscribers have seen the commit.
        match next {
            TriggerState::Inactive => {
                self.trip_count = 0;
                self.scheduler.reset();
            }
            TriggerState::Arming => {
                let verdict = self.scheduler.begin_arming(now);
                self.apply_arming_verdict(verdict);
            }
            TriggerState::Armed => {
                self.start_countdown(self.timeout_ms);
                self.drift = self.scheduler.drift_check_period_ms().map(|period_ms| {
                    DriftMonitor::start(period_ms, DRIFT_TOLERANCE_MS, self.timeout_ms)
                });
                if let Some(request) = self.scheduler.take_refresh(now) {
                    self.dispatch_fetch(request);
                }
            }
            TriggerState::Tripped => {
                self.scheduler.note_tripped(now);
                self.drift = None;
                self.trip_count += 1;
                self.start_countdown(self.duration_ms);
            }
        }
    }

    /// Applies a scheduling verdict produced while the trigger is Arming.
    fn apply_arming_verdict(&mut self, verdict: ScheduleVerdict) {
        match verdict {
            ScheduleVerdict::Ready(range) => {
                self.timeout_range = range;
                self.timeout_ms = range.realize();
                if self.debug_logging {
                    log_debug!(
                        "Trigger '{}' armed countdown set to {}ms",
                        self.name,
                        self.timeout_ms
                    );
                }
                self.pending.push_back(TriggerAction::Next);
            }
            ScheduleVerdict::Fetch(request) => self.dispatch_fetch(request),
            ScheduleVerdict::Unschedulable => {
                log_warning!(
                    "Trigger '{}' has no viable schedule, winding down",
                    self.name
                );
                self.pending.push_back(TriggerAction::Abort);
            }
        }
    }

    fn absorb_astro(&mut self, generation: u64, response: Result<AstronomicalDay>) {
        // The scheduler always sees the response so late data still lands
        // in its cache. The verdict only drives a transition when it
        // answers the current fetch and the trigger is still waiting on it.
        let verdict = self.scheduler.absorb(self.time_source.now(), response);
        if generation != self.astro_generation || self.state != TriggerState::Arming {
            if self.debug_logging {
                log_debug!(
                    "Trigger '{}' absorbed an out-of-band astronomical response",
                    self.name
                );
            }
            return;
        }
        self.apply_arming_verdict(verdict);
    }

    fn dispatch_fetch(&mut self, request: AstroRequest) {
        self.astro_generation += 1;
        let generation = self.astro_generation;

        let Some(provider) = self.provider.as_ref().map(Arc::clone) else {
            log_error!(
                "Trigger '{}' needs astronomical data but has no provider",
                self.name
            );
            self.fetch_failed(generation, anyhow!("no astronomical provider configured"));
            return;
        };
        if self.debug_logging {
            log_debug!(
                "Trigger '{}' requesting astronomical data for {}",
                self.name,
                request.date
            );
        }
        let loopback = self.loopback.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("astro-{}", self.name))
            .spawn(move || {
                let response = provider.one_day(&request);
                let _ = loopback.send(TriggerCommand::AstroComplete {
                    generation,
                    response,
                });
            });
        if let Err(error) = spawned {
            log_error!(
                "Trigger '{}' failed to launch astronomical fetch: {}",
                self.name,
                error
            );
            self.fetch_failed(generation, anyhow!("fetch thread failed to launch"));
        }
    }

    /// Feeds a synthetic failure back through the normal absorption path.
    fn fetch_failed(&mut self, generation: u64, error: anyhow::Error) {
        self.absorb_astro(generation, Err(error));
    }

    fn handle_deadlines(&mut self) {
        let now = Instant::now();

        let countdown_due = self
            .countdown
            .as_ref()
            .is_some_and(|countdown| countdown.deadline() <= now);
        if countdown_due {
            self.countdown = None;
            if self.debug_logging {
                log_debug!(
                    "Trigger '{}' countdown expired while {}",
                    self.name,
                    self.state
                );
            }
            self.evaluate(TriggerAction::Next);
            return;
        }

        let drift_due = self
            .drift
            .as_ref()
            .is_some_and(|monitor| monitor.next_check() <= now);
        if !drift_due {
            return;
        }
        let verdict = match (self.countdown.as_ref(), self.drift.as_mut()) {
            (Some(countdown), Some(monitor)) => {
                monitor.check(countdown.remaining_ms(self.time_source.now()))
            }
            _ => {
                self.drift = None;
                return;
            }
        };
        match verdict {
            DriftVerdict::OnSchedule => {}
            DriftVerdict::Overdue => {
                log_warning!(
                    "Trigger '{}' countdown is overdue, forcing the trip",
                    self.name
                );
                self.countdown = None;
                self.drift = None;
                self.evaluate(TriggerAction::Next);
            }
            DriftVerdict::Restart { expected_ms } => {
                log_warning!(
                    "Trigger '{}' drifted off schedule, restarting countdown at {}ms",
                    self.name,
                    expected_ms
                );
                self.start_countdown(expected_ms);
                self.notify_current_state();
                self.update_snapshot();
            }
        }
    }

    fn notify_current_state(&mut self) {
        self.sinks.publish(TriggerEvent::StateNotify {
            uuid: self.uuid,
            current_state: self.state,
        });
    }

    fn start_countdown(&mut self, duration_ms: u64) {
        self.countdown = Some(Countdown::start(self.time_source.now(), duration_ms));
    }

    fn stop_timers(&mut self) {
        self.countdown = None;
        self.drift = None;
    }

    fn trip_limit_expired(&self) -> bool {
        self.trip_limit != TRIP_LIMIT_UNLIMITED && self.trip_count >= self.trip_limit
    }

    fn next_deadline(&self) -> Option<Instant> {
        let countdown = self.countdown.as_ref().map(Countdown::deadline);
        let drift = self.drift.as_ref().map(DriftMonitor::next_check);
        match (countdown, drift) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }

    fn update_snapshot(&self) {
        let mut snapshot = self
            .snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        snapshot.state = self.state;
        snapshot.timeout_ms = self.timeout_ms;
        snapshot.duration_ms = self.duration_ms;
        snapshot.trip_count = self.trip_count;
        snapshot.countdown_target = self.countdown.as_ref().map(Countdown::wall_target);
    }
}
