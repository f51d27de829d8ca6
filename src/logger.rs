//! Structured logging with visual formatting.
//!
//! Provides the leveled macros and box-drawing block style used across the
//! crate. Diagnostic output from trigger instances is additionally gated by
//! the per-trigger `debug_logging` flag at the call site, so the engine never
//! consults process-global debug state to decide behavior.
//!
//! ## Conventions
//!
//! - **`log_version!`**: startup header, once at launch.
//! - **`log_block_start!`**: begins a new conceptual block (daemon phase
//!   changes, trigger registration): an empty `┃` line, then `┣ message`.
//! - **`log_decorated!`**: `┣ message`, a continuation line or standalone
//!   single-line status.
//! - **`log_indented!`**: `┃   message`, nested details within a block.
//! - **`log_pipe!`**: a single `┃` line for vertical spacing.
//! - **`log_end!`**: final `╹` marker, once at shutdown.
//! - **`log_warning!`/`log_error!`/`log_debug!`**: semantic `[LEVEL]` lines
//!   for everything else.
//!
//! Every macro funnels through [`write_line`], which applies the global
//! enable gate. Disabling the gate gives quiet operation for automated
//! processes or tests whose output would otherwise be noise.

use std::fmt::Arguments;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

// AtomicBool rather than thread_local so worker threads share the gate.
static LOGGING_ENABLED: AtomicBool = AtomicBool::new(true);

/// Runtime control over log output.
pub struct Log;

impl Log {
    /// Enable or disable logging globally.
    pub fn set_enabled(enabled: bool) {
        LOGGING_ENABLED.store(enabled, Ordering::SeqCst);
    }

    /// Check if logging is currently enabled.
    pub fn is_enabled() -> bool {
        LOGGING_ENABLED.load(Ordering::SeqCst)
    }
}

/// Single sink behind the macros: prefix, message, newline, flush. Flushing
/// per line keeps block characters in order when worker threads interleave.
pub fn write_line(prefix: &str, message: Arguments<'_>) {
    if !Log::is_enabled() {
        return;
    }
    print!("{prefix}{message}\n");
    let _ = std::io::stdout().flush();
}

// # Logging Macros
//
// Each macro takes either a format literal with arguments or a single
// displayable expression.

/// Log a decorated message, typically as part of an existing block or for
/// standalone emphasis.
#[macro_export]
macro_rules! log_decorated {
    ($fmt:literal $($arg:tt)*) => {
        $crate::logger::write_line("┣ ", format_args!($fmt $($arg)*))
    };
    ($expr:expr) => {
        $crate::logger::write_line("┣ ", format_args!("{}", $expr))
    };
}

/// Log an indented message for sub-items or details within a block.
#[macro_export]
macro_rules! log_indented {
    ($fmt:literal $($arg:tt)*) => {
        $crate::logger::write_line("┃   ", format_args!($fmt $($arg)*))
    };
    ($expr:expr) => {
        $crate::logger::write_line("┃   ", format_args!("{}", $expr))
    };
}

/// Log a visual pipe separator for vertical spacing.
#[macro_export]
macro_rules! log_pipe {
    () => {
        $crate::logger::write_line("┃", format_args!(""))
    };
}

/// Log a block start message, initiating a new conceptual block.
#[macro_export]
macro_rules! log_block_start {
    ($fmt:literal $($arg:tt)*) => {
        $crate::logger::write_line("┃\n┣ ", format_args!($fmt $($arg)*))
    };
    ($expr:expr) => {
        $crate::logger::write_line("┃\n┣ ", format_args!("{}", $expr))
    };
}

/// Log the application version header.
#[macro_export]
macro_rules! log_version {
    () => {
        $crate::logger::write_line(
            "┏ ",
            format_args!("timetriggers v{} ━━╸", env!("CARGO_PKG_VERSION")),
        )
    };
}

/// Log the final termination marker.
#[macro_export]
macro_rules! log_end {
    () => {
        $crate::logger::write_line("╹", format_args!(""))
    };
}

/// Log a warning message with pipe prefix and yellow-colored level tag.
#[macro_export]
macro_rules! log_warning {
    ($fmt:literal $($arg:tt)*) => {
        $crate::logger::write_line("┣[\x1b[33mWARNING\x1b[0m] ", format_args!($fmt $($arg)*))
    };
    ($expr:expr) => {
        $crate::logger::write_line("┣[\x1b[33mWARNING\x1b[0m] ", format_args!("{}", $expr))
    };
}

/// Log an error message with pipe prefix and red-colored level tag.
#[macro_export]
macro_rules! log_error {
    ($fmt:literal $($arg:tt)*) => {
        $crate::logger::write_line("┣[\x1b[31mERROR\x1b[0m] ", format_args!($fmt $($arg)*))
    };
    ($expr:expr) => {
        $crate::logger::write_line("┣[\x1b[31mERROR\x1b[0m] ", format_args!("{}", $expr))
    };
}

/// Log a debug/operational message with pipe prefix and green-colored
/// level tag.
#[macro_export]
macro_rules! log_debug {
    ($fmt:literal $($arg:tt)*) => {
        $crate::logger::write_line("┣[\x1b[32mDEBUG\x1b[0m] ", format_args!($fmt $($arg)*))
    };
    ($expr:expr) => {
        $crate::logger::write_line("┣[\x1b[32mDEBUG\x1b[0m] ", format_args!("{}", $expr))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_round_trips() {
        assert!(Log::is_enabled());
        Log::set_enabled(false);
        assert!(!Log::is_enabled());
        Log::set_enabled(true);
        assert!(Log::is_enabled());
    }
}
