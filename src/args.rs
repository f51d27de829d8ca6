//! Command-line argument parsing and processing.
//!
//! The daemon takes flags only, no subcommands. Unknown options fall
//! through to the help screen with a warning rather than being silently
//! ignored.

/// What the process should do for the arguments it was given.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Run the daemon with these settings.
    Run {
        debug_enabled: bool,
        config_path: Option<String>,
    },
    /// Print the help screen and exit.
    ShowHelp,
    /// Print version information and exit.
    ShowVersion,
    /// Print the help screen and exit non-zero.
    ShowHelpDueToError,
}

/// Result of parsing command-line arguments.
pub struct ParsedArgs {
    pub action: CliAction,
}

impl ParsedArgs {
    /// Parses an argument list. The first element is the program name.
    ///
    /// Precedence when flags conflict: `--version` wins outright, then bad
    /// input forces the help-with-error screen, then `--help`, then a
    /// normal run.
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut debug_enabled = false;
        let mut wants_help = false;
        let mut wants_version = false;
        let mut bad_input = false;
        let mut config_path: Option<String> = None;

        let mut words = args
            .into_iter()
            .skip(1)
            .map(|word| word.as_ref().to_string());
        while let Some(word) = words.next() {
            match word.as_str() {
                "--debug" | "-d" => debug_enabled = true,
                "--help" | "-h" => wants_help = true,
                "--version" | "-V" | "-v" => wants_version = true,
                "--config" | "-c" => match words.next() {
                    Some(path) => config_path = Some(path),
                    None => {
                        log_warning!("Missing path for --config. Usage: --config <file>");
                        bad_input = true;
                    }
                },
                other if other.starts_with('-') => {
                    log_warning!("Unknown option: {other}");
                    bad_input = true;
                }
                other => {
                    log_warning!("Unexpected argument: {other}");
                    bad_input = true;
                }
            }
        }

        let action = if wants_version {
            CliAction::ShowVersion
        } else if bad_input {
            CliAction::ShowHelpDueToError
        } else if wants_help {
            CliAction::ShowHelp
        } else {
            CliAction::Run {
                debug_enabled,
                config_path,
            }
        };
        ParsedArgs { action }
    }

    pub fn from_env() -> ParsedArgs {
        Self::parse(std::env::args())
    }
}

/// Version banner in the logger's box style.
pub fn display_version_info() {
    log_version!();
    log_pipe!();
    println!("┗ {}", env!("CARGO_PKG_DESCRIPTION"));
}

/// Help screen in the logger's box style.
pub fn display_help() {
    log_version!();
    log_block_start!(env!("CARGO_PKG_DESCRIPTION"));
    log_block_start!("Usage:");
    log_indented!("timetriggers [OPTIONS]");
    log_block_start!("Options:");
    log_indented!("-c, --config <file>    Use a custom configuration file");
    log_indented!("-d, --debug            Enable detailed debug output");
    log_indented!("-h, --help             Print help information");
    log_indented!("-V, --version          Print version information");
    log_end!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(words: &[&str]) -> CliAction {
        ParsedArgs::parse(words.iter().copied()).action
    }

    #[test]
    fn bare_invocation_runs_with_defaults() {
        assert_eq!(
            parse(&["timetriggers"]),
            CliAction::Run {
                debug_enabled: false,
                config_path: None,
            }
        );
    }

    #[test]
    fn debug_flag_enables_diagnostics() {
        for words in [
            &["timetriggers", "--debug"][..],
            &["timetriggers", "-d"][..],
        ] {
            assert_eq!(
                parse(words),
                CliAction::Run {
                    debug_enabled: true,
                    config_path: None,
                }
            );
        }
    }

    #[test]
    fn config_flag_consumes_the_following_path() {
        assert_eq!(
            parse(&["timetriggers", "-c", "/tmp/custom.toml", "-d"]),
            CliAction::Run {
                debug_enabled: true,
                config_path: Some("/tmp/custom.toml".to_string()),
            }
        );
    }

    #[test]
    fn config_flag_without_a_path_is_an_error() {
        assert_eq!(
            parse(&["timetriggers", "--config"]),
            CliAction::ShowHelpDueToError
        );
    }

    #[test]
    fn help_flag_shows_the_help_screen() {
        assert_eq!(parse(&["timetriggers", "-h"]), CliAction::ShowHelp);
    }

    #[test]
    fn version_flag_wins_over_everything_else() {
        assert_eq!(parse(&["timetriggers", "-V"]), CliAction::ShowVersion);
        assert_eq!(
            parse(&["timetriggers", "--help", "--nonsense", "--version"]),
            CliAction::ShowVersion
        );
    }

    #[test]
    fn unknown_options_fall_through_to_help() {
        assert_eq!(
            parse(&["timetriggers", "--frobnicate"]),
            CliAction::ShowHelpDueToError
        );
    }

    #[test]
    fn stray_words_fall_through_to_help() {
        assert_eq!(
            parse(&["timetriggers", "run"]),
            CliAction::ShowHelpDueToError
        );
    }
}
