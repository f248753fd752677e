//! Implementation of the schedule command.
//!
//! Computes the coming day's schedule from the configured location and prints
//! it together with the frame budget. Nothing is captured and no lock is taken,
//! so it is safe to run next to a capturing instance.

use anyhow::{Context, Result};

use crate::common::constants::*;
use crate::config::Config;
use crate::core::calculate_frame_count;
use crate::geo::{SunClock, log_frame_budget, log_schedule};
use crate::time::{Clock, SystemClock};

/// Print the schedule and frame budget for the coming day without capturing.
pub fn handle_schedule_command(debug_enabled: bool) -> Result<()> {
    let config = Config::load().context("Configuration failed")?;

    log_version!();
    if debug_enabled || config.logging.debug.unwrap_or(false) {
        config.log_config();
    }

    let location = config.location.observer()?;
    let timezone = config.location.resolve_timezone(&location)?;
    let sun = SunClock::new(location, timezone, config.capture.awake_interval_mode());
    let schedule = sun.compute_schedule(SystemClock.now())?;

    let cadence = config.capture.cadence();
    let frame_count = calculate_frame_count(schedule.awake_interval, cadence);
    log_schedule(&schedule, sun.location());
    log_frame_budget(&schedule, cadence, frame_count);
    if frame_count > FRAME_COUNTER_MAX {
        log_pipe!();
        log_warning!(
            "{frame_count} frames exceed the {FRAME_COUNTER_WIDTH}-digit counter; names will widen"
        );
    }
    log_end!();
    Ok(())
}
