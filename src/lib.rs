//! # Timetriggers Library
//!
//! Internal library for the timetriggers binary application
//!
//! This library exists to enable testing of complex internals and provide
//! clean separation between CLI dispatch (main.rs) and the trigger engine.
//!
//! ## Architecture
//!
//! The library is organized into several layers:
//!
//! - **Entry Point**: [`TimeTrigger`] is the public handle; constructing one
//!   spawns a worker thread that owns the whole lifecycle
//! - **Engine**: `trigger` module with the state machine, countdown and
//!   drift timers, and the event stream
//! - **Scheduling**: `schedule` module deciding how far away the next trip
//!   is, either a fixed interval or calendar day-of-week windows
//! - **Astronomy**: `astro` module resolving sunrise/sunset style phenomena
//!   for astronomically anchored schedules
//! - **Configuration**: `config` module for the daemon's TOML settings
//! - **Infrastructure**: daemon orchestration, signal handling, logging,
//!   and the injectable time source

// Import macros from logger module for use in all submodules
#[macro_use]
pub mod logger;

// Public API modules
pub mod args;
pub mod astro;
pub mod config;
pub mod constants;
pub mod daemon;
pub mod schedule;
pub mod time_source;
pub mod trigger;

// Re-export the surface most callers need
pub use schedule::ScheduleKind;
pub use trigger::events::TriggerEvent;
pub use trigger::state::TriggerState;
pub use trigger::{TimeRange, TimeTrigger, TriggerParams};
