//! Main application entry point.
//!
//! Parses the command line, dispatches to the run coordinator or a one-shot
//! command, and turns any error into a logged message and a failure exit code.

use longlapse::Longlapse;
use longlapse::args::{self, CliAction, ParsedArgs};
use longlapse::commands;
use longlapse::common::constants::{EXIT_FAILURE, EXIT_SUCCESS};
use longlapse::config;
use longlapse::log_error_exit;

fn main() {
    let parsed_args = ParsedArgs::from_env();

    let result = match parsed_args.action {
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
            config_dir,
            log_file,
        } => config::set_config_dir(config_dir)
            .and_then(|_| Longlapse::new(debug_enabled).with_log_file(log_file).run()),
        CliAction::Schedule {
            debug_enabled,
            config_dir,
        } => config::set_config_dir(config_dir)
            .and_then(|_| commands::schedule::handle_schedule_command(debug_enabled)),
    };

    match result {
        Ok(()) => std::process::exit(EXIT_SUCCESS),
        Err(e) => {
            log_error_exit!("{e}");
            // Full chain for context beyond the headline
            for cause in e.chain().skip(1) {
                eprintln!("  caused by: {cause}");
            }
            std::process::exit(EXIT_FAILURE);
        }
    }
}
