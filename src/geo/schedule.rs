//! Daily capture schedule derived from the next sunrise and sunset.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::solar::{ObserverLocation, SunEvent, next_event_after};
use crate::common::constants::BATCH_DATE_FORMAT;
use crate::core::CaptureError;

/// How the awake (capture) interval is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AwakeIntervalMode {
    /// From the next sunrise to the first sunset after it.
    #[default]
    Daylight,
    /// `next_sunrise - next_sunset`, negative while the sun is down.
    Legacy,
}

impl fmt::Display for AwakeIntervalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AwakeIntervalMode::Daylight => write!(f, "daylight"),
            AwakeIntervalMode::Legacy => write!(f, "legacy"),
        }
    }
}

/// Everything one run needs to know about the coming day.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySchedule {
    pub timezone: Tz,
    pub computed_at: DateTime<Tz>,
    pub next_sunrise: DateTime<Tz>,
    pub next_sunset: DateTime<Tz>,
    /// Time to wait before the first frame
    pub sleep_interval: Duration,
    /// Signed length of the capture window, see [`AwakeIntervalMode`]
    pub awake_interval: ChronoDuration,
    pub mode: AwakeIntervalMode,
    /// Sunrise date in the observer timezone, names the batch directory
    pub date_label: String,
}

impl DaySchedule {
    /// Assemble a schedule from already computed events.
    ///
    /// `following_sunset` is the first sunset after `next_sunrise`; it is only
    /// consulted in [`AwakeIntervalMode::Daylight`].
    pub fn from_events(
        now: DateTime<Utc>,
        next_sunrise: DateTime<Utc>,
        next_sunset: DateTime<Utc>,
        following_sunset: Option<DateTime<Utc>>,
        mode: AwakeIntervalMode,
        timezone: Tz,
    ) -> Self {
        let sleep_interval = next_sunrise
            .signed_duration_since(now)
            .to_std()
            .unwrap_or_default();

        let awake_interval = match mode {
            AwakeIntervalMode::Legacy => next_sunrise.signed_duration_since(next_sunset),
            AwakeIntervalMode::Daylight => {
                let end = following_sunset.unwrap_or(next_sunset);
                end.signed_duration_since(next_sunrise)
            }
        };

        let sunrise_local = next_sunrise.with_timezone(&timezone);

        Self {
            timezone,
            computed_at: now.with_timezone(&timezone),
            next_sunrise: sunrise_local,
            next_sunset: next_sunset.with_timezone(&timezone),
            sleep_interval,
            awake_interval,
            mode,
            date_label: sunrise_local.format(BATCH_DATE_FORMAT).to_string(),
        }
    }

    /// Absolute length of the awake interval.
    pub fn awake_magnitude(&self) -> Duration {
        self.awake_interval.abs().to_std().unwrap_or_default()
    }

    /// Nominal end of capture: sunrise plus the awake magnitude.
    pub fn capture_window_end(&self) -> DateTime<Tz> {
        self.next_sunrise + self.awake_interval.abs()
    }
}

/// Sunrise/sunset calculator bound to one observer.
#[derive(Debug, Clone)]
pub struct SunClock {
    location: ObserverLocation,
    timezone: Tz,
    mode: AwakeIntervalMode,
}

impl SunClock {
    pub fn new(location: ObserverLocation, timezone: Tz, mode: AwakeIntervalMode) -> Self {
        Self {
            location,
            timezone,
            mode,
        }
    }

    pub fn location(&self) -> &ObserverLocation {
        &self.location
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn mode(&self) -> AwakeIntervalMode {
        self.mode
    }

    /// Compute the schedule for the next daylight period after `now`.
    pub fn compute_schedule(&self, now: DateTime<Utc>) -> Result<DaySchedule, CaptureError> {
        let next_sunrise = self.next(now, SunEvent::Rise)?;
        let next_sunset = self.next(now, SunEvent::Set)?;

        let following_sunset = match self.mode {
            AwakeIntervalMode::Daylight if next_sunset > next_sunrise => Some(next_sunset),
            AwakeIntervalMode::Daylight => Some(self.next(next_sunrise, SunEvent::Set)?),
            AwakeIntervalMode::Legacy => None,
        };

        Ok(DaySchedule::from_events(
            now,
            next_sunrise,
            next_sunset,
            following_sunset,
            self.mode,
            self.timezone,
        ))
    }

    fn next(&self, after: DateTime<Utc>, event: SunEvent) -> Result<DateTime<Utc>, CaptureError> {
        next_event_after(&self.location, after, event).map_err(|date| {
            CaptureError::ScheduleUnavailable {
                reason: format!(
                    "no {} at {:.4}°, {:.4}° on {} (sun never crosses {}°)",
                    event.as_str(),
                    self.location.latitude,
                    self.location.longitude,
                    date,
                    self.location.horizon
                ),
            }
        })
    }
}
