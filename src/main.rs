//! Main application entry point.
//!
//! Parses the command line and hands control to the daemon. All application
//! logic lives in the library so it stays testable; this file only
//! dispatches.

use anyhow::Result;

use timetriggers::args::{self, CliAction, ParsedArgs};
use timetriggers::constants::EXIT_FAILURE;
use timetriggers::daemon;

fn main() -> Result<()> {
    let parsed_args = ParsedArgs::from_env();

    match parsed_args.action {
        CliAction::ShowVersion => {
            args::display_version_info();
            Ok(())
        }
        CliAction::ShowHelp => {
            args::display_help();
            Ok(())
        }
        CliAction::ShowHelpDueToError => {
            args::display_help();
            std::process::exit(EXIT_FAILURE);
        }
        CliAction::Run {
            debug_enabled,
            config_path,
        } => daemon::run(debug_enabled, config_path),
    }
}
