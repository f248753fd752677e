//! Sun-driven scheduling.
//!
//! ## Module Structure
//!
//! - [`solar`]: sunrise/sunset events at a configurable horizon, with
//!   pressure-dependent refraction and observer altitude
//! - [`schedule`]: [`SunClock`] and the per-day [`DaySchedule`]
//! - [`display`]: log rendering of schedules and frame budgets
//!
//! Polar day and night are not approximated: when the sun never crosses the
//! configured horizon the schedule is reported as unavailable.

pub mod display;
pub mod schedule;
pub mod solar;

pub use display::{log_frame_budget, log_schedule};
pub use schedule::{AwakeIntervalMode, DaySchedule, SunClock};
pub use solar::{ObserverLocation, SunEvent};

#[cfg(test)]
mod tests;
