//! Daemon orchestration.
//!
//! Builds every configured trigger, fans their event streams into one
//! channel, and runs until SIGINT or SIGTERM arrives. Trigger workers are
//! wound down by dropping their handles, which terminates and joins each
//! worker thread.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use anyhow::{Context, Result};
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use uuid::Uuid;

use crate::config::{self, TriggerKind};
use crate::constants::TRIP_LIMIT_UNLIMITED;
use crate::trigger::TimeTrigger;
use crate::trigger::events::TriggerEvent;

/// Everything the daemon loop reacts to.
enum DaemonMessage {
    Event(TriggerEvent),
    Shutdown(&'static str),
}

/// Runs the daemon until a shutdown signal arrives.
///
/// `debug_enabled` comes from the command line and turns on engine
/// diagnostics for every trigger; individual entries may still override it
/// in the configuration file.
pub fn run(debug_enabled: bool, config_path: Option<String>) -> Result<()> {
    log_version!();

    let path = match config_path {
        Some(path) => PathBuf::from(path),
        None => config::default_config_path()?,
    };
    if !path.exists() {
        log_block_start!("No configuration found, writing a starter file");
        log_indented!("{}", path.display());
        config::write_default_config(&path)?;
    }

    log_block_start!("Loading configuration");
    log_indented!("{}", path.display());
    let config = config::load_from_path(&path)?;
    if config.triggers.is_empty() {
        log_warning!("Configuration defines no triggers; nothing to run");
        log_end!();
        return Ok(());
    }

    let default_debug = debug_enabled || config.daemon.debug_logging.unwrap_or(false);
    let (message_tx, message_rx) = mpsc::channel();

    let mut triggers = Vec::with_capacity(config.triggers.len());
    let mut names: HashMap<Uuid, String> = HashMap::new();
    for (index, entry) in config.triggers.iter().enumerate() {
        let params = entry
            .trigger_params(default_debug)
            .with_context(|| format!("Invalid [[trigger]] entry {}", index + 1))?;
        let (trigger, events) = TimeTrigger::new(params)
            .with_context(|| format!("Failed to build [[trigger]] entry {}", index + 1))?;

        log_block_start!("Registered trigger '{}'", trigger.name());
        log_indented!(
            "schedule: {}",
            match entry.kind {
                TriggerKind::Interval => "interval",
                TriggerKind::Calendar => "calendar",
            }
        );
        log_indented!("uuid: {}", trigger.identifier());
        log_indented!("signature: {}", trigger.signature());
        if trigger.trip_limit() != TRIP_LIMIT_UNLIMITED {
            log_indented!("trip limit: {}", trigger.trip_limit());
        }

        names.insert(trigger.identifier(), trigger.name().to_string());
        spawn_forwarder(trigger.name(), events, message_tx.clone())?;
        triggers.push(trigger);
    }

    register_shutdown_signals(message_tx)?;

    for trigger in &triggers {
        trigger.start()?;
    }
    log_block_start!("Running {} trigger(s), Ctrl+C to stop", triggers.len());

    for message in message_rx.iter() {
        match message {
            DaemonMessage::Event(event) => log_event(&names, &event, default_debug),
            DaemonMessage::Shutdown(signal_name) => {
                log_block_start!("Received {signal_name}, shutting down");
                break;
            }
        }
    }

    // Dropping the handles terminates and joins every worker.
    drop(triggers);
    log_end!();
    Ok(())
}

fn log_event(names: &HashMap<Uuid, String>, event: &TriggerEvent, debug: bool) {
    let name = names
        .get(&event.uuid())
        .map(String::as_str)
        .unwrap_or("unknown");
    match event {
        TriggerEvent::StateChanged {
            old_state,
            new_state,
            ..
        } => {
            log_decorated!("'{name}' {old_state} -> {new_state}");
        }
        TriggerEvent::StateNotify { current_state, .. } => {
            if debug {
                log_debug!("'{name}' notify: {current_state}");
            }
        }
    }
}

/// Forwards one trigger's events into the daemon channel. The thread ends
/// when the trigger worker goes away and its event stream disconnects.
fn spawn_forwarder(
    name: &str,
    events: Receiver<TriggerEvent>,
    sink: Sender<DaemonMessage>,
) -> Result<()> {
    thread::Builder::new()
        .name(format!("events-{name}"))
        .spawn(move || {
            for event in events.iter() {
                if sink.send(DaemonMessage::Event(event)).is_err() {
                    break;
                }
            }
        })
        .context("Failed to spawn event forwarder thread")?;
    Ok(())
}

fn register_shutdown_signals(sink: Sender<DaemonMessage>) -> Result<()> {
    let mut signals =
        Signals::new([SIGINT, SIGTERM]).context("failed to register signal handlers")?;
    thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            for signal in signals.forever() {
                let name = match signal {
                    SIGINT => "SIGINT",
                    SIGTERM => "SIGTERM",
                    _ => "signal",
                };
                if sink.send(DaemonMessage::Shutdown(name)).is_err() {
                    break;
                }
            }
        })
        .context("Failed to spawn signal handling thread")?;
    Ok(())
}
