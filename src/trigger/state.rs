//! Trigger lifecycle states and control actions.
//!
//! The state set, the action policy table, and the exit whitelist all live
//! here as pure functions. Entry and exit side effects (timer starts, value
//! regeneration, trip accounting) belong to the engine in
//! `trigger::core`, which keeps this module a small auditable table.

use std::fmt;

/// Control actions evaluated against the current state.
#[derive(Debug, PartialEq, Copy, Clone)]
pub enum TriggerAction {
    /// Advance the lifecycle: arm, fire, or re-arm.
    Next,
    /// Wind down to Inactive from wherever the trigger currently is.
    Abort,
}

/// Lifecycle states of a trigger.
///
/// The numeric values appear in published event payloads and must not be
/// reordered.
#[derive(Debug, PartialEq, Copy, Clone)]
#[repr(u8)]
pub enum TriggerState {
    /// Resting state. Not scheduled to fire; trip accounting resets here.
    Inactive = 0,
    /// Generating timer values, possibly waiting on astronomical data.
    Arming = 1,
    /// Counting down to a trip.
    Armed = 2,
    /// Fired, holding for the trip duration.
    Tripped = 3,
}

impl TriggerState {
    /// Diagnostic label. The resting state reads as "Idle" in logs even
    /// though its published value is `Inactive`.
    pub fn display_name(&self) -> &'static str {
        match self {
            TriggerState::Inactive => "Idle",
            TriggerState::Arming => "Arming",
            TriggerState::Armed => "Armed",
            TriggerState::Tripped => "Tripped",
        }
    }

    /// States this state may legally hand off to.
    pub fn valid_exits(&self) -> &'static [TriggerState] {
        use TriggerState::*;
        match self {
            Inactive => &[Inactive, Arming],
            Arming => &[Inactive, Armed],
            Armed => &[Inactive, Tripped],
            Tripped => &[Armed, Inactive],
        }
    }

    /// True when a hand-off from `self` to `next` is allowed. Checked once,
    /// on exit, before any transition commits.
    pub fn may_exit_to(&self, next: TriggerState) -> bool {
        self.valid_exits().contains(&next)
    }

    /// Target state for `action`. This is the entire policy table of the
    /// machine.
    ///
    /// `trip_limit_expired` only matters when leaving Tripped on `Next`: an
    /// exhausted trip budget winds the trigger down instead of re-arming.
    pub fn on_action(&self, action: TriggerAction, trip_limit_expired: bool) -> TriggerState {
        use TriggerAction::*;
        use TriggerState::*;
        match (self, action) {
            (Inactive, Next) => Arming,
            (Arming, Next) => Armed,
            (Armed, Next) => Tripped,
            (Tripped, Next) if trip_limit_expired => Inactive,
            (Tripped, Next) => Armed,
            (_, Abort) => Inactive,
        }
    }
}

impl fmt::Display for TriggerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
