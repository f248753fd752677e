//! Command-line argument parsing and processing.
//!
//! Supports a default `run` command, the `schedule` preview command and the
//! shared `--config`, `--debug` and `--log` flags. Unknown options fall back
//! to the help screen instead of aborting.

/// Represents the parsed command-line arguments and their intended actions.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Capture one day (the default)
    Run {
        debug_enabled: bool,
        config_dir: Option<String>,
        log_file: Option<String>,
    },
    /// Print today's schedule and frame budget, then exit
    Schedule {
        debug_enabled: bool,
        config_dir: Option<String>,
    },
    /// Display help information and exit
    ShowHelp,
    /// Display version information and exit
    ShowVersion,
    /// Show help due to unknown arguments and exit
    ShowHelpDueToError,
}

/// Result of parsing command-line arguments.
pub struct ParsedArgs {
    pub action: CliAction,
}

impl ParsedArgs {
    /// Parse command-line arguments (including the program name) into an action.
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args_vec: Vec<String> = args
            .into_iter()
            .skip(1)
            .map(|s| s.as_ref().to_string())
            .collect();

        let mut debug_enabled = false;
        let mut display_help = false;
        let mut display_version = false;
        let mut config_dir: Option<String> = None;
        let mut log_file: Option<String> = None;
        let mut command: Option<String> = None;
        let mut unknown_arg_found = false;

        let mut idx = 0;
        while idx < args_vec.len() {
            let arg = args_vec[idx].as_str();
            match arg {
                "--debug" | "-d" => debug_enabled = true,
                "--help" | "-h" => display_help = true,
                "--version" | "-V" | "-v" => display_version = true,
                "--config" | "-c" | "--log" | "-l" => {
                    let Some(value) = args_vec.get(idx + 1).filter(|v| !v.starts_with('-')) else {
                        log_warning!("Missing value for {arg}");
                        return ParsedArgs {
                            action: CliAction::ShowHelpDueToError,
                        };
                    };
                    if matches!(arg, "--config" | "-c") {
                        config_dir = Some(value.clone());
                    } else {
                        log_file = Some(value.clone());
                    }
                    idx += 1;
                }
                _ if arg.starts_with('-') => {
                    log_warning!("Unknown argument: {arg}");
                    unknown_arg_found = true;
                }
                _ if command.is_none() => command = Some(arg.to_string()),
                _ => {
                    log_error!("Unexpected argument: '{arg}'");
                    unknown_arg_found = true;
                }
            }
            idx += 1;
        }

        let action = if display_version {
            CliAction::ShowVersion
        } else if display_help {
            CliAction::ShowHelp
        } else if unknown_arg_found {
            CliAction::ShowHelpDueToError
        } else {
            match command.as_deref() {
                None | Some("run") | Some("r") => CliAction::Run {
                    debug_enabled,
                    config_dir,
                    log_file,
                },
                Some("schedule") | Some("s") => {
                    if log_file.is_some() {
                        log_warning!("--log only applies to the run command");
                    }
                    CliAction::Schedule {
                        debug_enabled,
                        config_dir,
                    }
                }
                Some(unknown) => {
                    log_warning!("Unknown command: {unknown}");
                    CliAction::ShowHelpDueToError
                }
            }
        };

        ParsedArgs { action }
    }

    /// Convenience method to parse from std::env::args()
    pub fn from_env() -> ParsedArgs {
        Self::parse(std::env::args())
    }
}

/// Displays version information using custom logging style.
pub fn display_version_info() {
    log_version!();
    log_pipe!();
    println!("┗ {}", env!("CARGO_PKG_DESCRIPTION"));
}

/// Displays custom help message using logger methods.
pub fn display_help() {
    log_version!();
    log_block_start!(env!("CARGO_PKG_DESCRIPTION"));
    log_block_start!("Usage:");
    log_indented!("longlapse [OPTIONS] [COMMAND]");
    log_block_start!("Options:");
    log_indented!("-c, --config <dir>     Use custom configuration directory");
    log_indented!("-d, --debug            Enable detailed debug output");
    log_indented!("-l, --log <file>       Append the run log to a file");
    log_indented!("-h, --help             Print help information");
    log_indented!("-V, --version          Print version information");
    log_block_start!("Commands:");
    log_indented!("run, r                 Capture today's timelapse (default)");
    log_indented!("schedule, s            Show the next sunrise, sunset and frame budget");
    log_end!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_no_args() {
        let parsed = ParsedArgs::parse(vec!["longlapse"]);
        assert_eq!(
            parsed.action,
            CliAction::Run {
                debug_enabled: false,
                config_dir: None,
                log_file: None,
            }
        );
    }

    #[test]
    fn test_parse_run_with_flags() {
        let parsed = ParsedArgs::parse(vec![
            "longlapse",
            "-d",
            "--config",
            "/etc/longlapse",
            "run",
            "--log",
            "/var/log/longlapse.log",
        ]);
        assert_eq!(
            parsed.action,
            CliAction::Run {
                debug_enabled: true,
                config_dir: Some("/etc/longlapse".to_string()),
                log_file: Some("/var/log/longlapse.log".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_schedule_command() {
        let parsed = ParsedArgs::parse(vec!["longlapse", "schedule", "-c", "/tmp/cfg"]);
        assert_eq!(
            parsed.action,
            CliAction::Schedule {
                debug_enabled: false,
                config_dir: Some("/tmp/cfg".to_string()),
            }
        );
    }

    #[test]
    fn test_version_and_help_take_precedence() {
        assert_eq!(
            ParsedArgs::parse(vec!["longlapse", "schedule", "--version"]).action,
            CliAction::ShowVersion
        );
        assert_eq!(
            ParsedArgs::parse(vec!["longlapse", "--help", "--bogus"]).action,
            CliAction::ShowHelp
        );
    }

    #[test]
    fn test_unknown_arguments_show_help() {
        assert_eq!(
            ParsedArgs::parse(vec!["longlapse", "--bogus"]).action,
            CliAction::ShowHelpDueToError
        );
        assert_eq!(
            ParsedArgs::parse(vec!["longlapse", "timelapse"]).action,
            CliAction::ShowHelpDueToError
        );
        assert_eq!(
            ParsedArgs::parse(vec!["longlapse", "run", "schedule"]).action,
            CliAction::ShowHelpDueToError
        );
    }

    #[test]
    fn test_missing_flag_value() {
        assert_eq!(
            ParsedArgs::parse(vec!["longlapse", "--config"]).action,
            CliAction::ShowHelpDueToError
        );
    }
}
