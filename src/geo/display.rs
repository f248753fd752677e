//! Display and formatting utilities for the geo module.
//!
//! Renders a [`DaySchedule`] and the resulting frame budget in the same
//! box-drawing layout as the rest of the log.

use chrono::{DateTime, Offset};
use chrono_tz::Tz;
use std::time::Duration;

use super::schedule::{AwakeIntervalMode, DaySchedule};
use super::solar::ObserverLocation;
use crate::common::utils::{format_duration, format_signed_duration};

/// Log the computed schedule for the coming day.
pub fn log_schedule(schedule: &DaySchedule, location: &ObserverLocation) {
    log_block_start!("Schedule for {}", schedule.date_label);
    log_indented!(
        "Observer: {:.4}°, {:.4}° @ {} m, horizon {}°",
        location.latitude,
        location.longitude,
        location.elevation,
        location.horizon
    );
    log_indented!(
        "Timezone: {} ({})",
        schedule.timezone,
        format_utc_offset(&schedule.next_sunrise)
    );
    log_indented!("Next sunrise: {}", format_event(&schedule.next_sunrise));
    log_indented!("Next sunset:  {}", format_event(&schedule.next_sunset));
    log_indented!(
        "Sleep until sunrise: {}",
        format_duration(schedule.sleep_interval)
    );

    match schedule.mode {
        AwakeIntervalMode::Daylight => log_indented!(
            "Awake interval: {} (sunrise to sunset)",
            format_duration(schedule.awake_magnitude())
        ),
        AwakeIntervalMode::Legacy => log_indented!(
            "Awake interval: {} (legacy, next sunrise - next sunset)",
            format_signed_duration(schedule.awake_interval)
        ),
    }
}

/// Log how many frames the schedule yields at `cadence`.
pub fn log_frame_budget(schedule: &DaySchedule, cadence: Duration, frame_count: u32) {
    log_block_start!(
        "Frame budget: {} frames every {}",
        frame_count,
        format_duration(cadence)
    );
    log_indented!(
        "Capture window ends around {}",
        schedule.capture_window_end().format("%H:%M:%S")
    );
}

fn format_event(time: &DateTime<Tz>) -> String {
    time.format("%Y-%m-%d %H:%M:%S %Z").to_string()
}

/// Render a zone offset as `+HH:MM`.
pub fn format_utc_offset(time: &DateTime<Tz>) -> String {
    let offset_secs = time.offset().fix().local_minus_utc();
    let sign = if offset_secs < 0 { '-' } else { '+' };
    let hours = offset_secs.abs() / 3600;
    let minutes = (offset_secs.abs() % 3600) / 60;
    format!("{sign}{hours:02}:{minutes:02}")
}
