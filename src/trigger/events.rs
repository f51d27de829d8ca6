//! Published trigger events and subscriber fanout.
//!
//! Subscribers hand the trigger a channel sender and receive every event in
//! commit order. Events are emitted after a transition has committed, never
//! from inside transition mechanics, so a subscriber that immediately calls
//! back into the trigger observes a settled state.

use std::sync::mpsc::Sender;

use uuid::Uuid;

use crate::trigger::state::TriggerState;

/// Events published by a trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerEvent {
    /// A committed state change.
    StateChanged {
        uuid: Uuid,
        old_state: TriggerState,
        new_state: TriggerState,
    },
    /// A transition that settled in the state it started in: the initial
    /// idle announcement, an abort acknowledged from idle, or a countdown
    /// restarted in place after drift correction.
    StateNotify {
        uuid: Uuid,
        current_state: TriggerState,
    },
}

impl TriggerEvent {
    /// Trigger that published this event.
    pub fn uuid(&self) -> Uuid {
        match self {
            TriggerEvent::StateChanged { uuid, .. } => *uuid,
            TriggerEvent::StateNotify { uuid, .. } => *uuid,
        }
    }

    /// State the trigger is in once this event is observed.
    pub fn state(&self) -> TriggerState {
        match self {
            TriggerEvent::StateChanged { new_state, .. } => *new_state,
            TriggerEvent::StateNotify { current_state, .. } => *current_state,
        }
    }
}

/// Fanout of events to subscriber channels. Senders whose receiving end has
/// been dropped are pruned on the next publish.
#[derive(Default)]
pub(crate) struct EventSinks {
    sinks: Vec<Sender<TriggerEvent>>,
}

impl EventSinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, sink: Sender<TriggerEvent>) {
        self.sinks.push(sink);
    }

    pub fn publish(&mut self, event: TriggerEvent) {
        self.sinks.retain(|sink| sink.send(event.clone()).is_ok());
    }
}
