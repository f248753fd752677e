//! Astronomical sunrise/sunset events for a fixed observer.
//!
//! Events are computed with the `sunrise` crate as the moment the sun's center
//! crosses a configurable elevation, rather than the standard −0.833° sunrise.
//! The configured horizon is an *apparent* elevation; when a non-zero pressure
//! is configured the horizon refraction (34′ at 1010 mbar, scaled linearly with
//! pressure) is subtracted to get the geometric elevation passed to the solver.
//! A pressure of zero reproduces a refraction-free observer.

use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use sunrise::{Coordinates, SolarDay, SolarEvent};
use tzf_rs::DefaultFinder;

use crate::common::constants::*;

static TZ_FINDER: Lazy<DefaultFinder> = Lazy::new(DefaultFinder::new);

/// Fixed observer used for every schedule computation.
#[derive(Debug, Clone, PartialEq)]
pub struct ObserverLocation {
    /// Latitude in degrees, positive north
    pub latitude: f64,
    /// Longitude in degrees, positive east
    pub longitude: f64,
    /// Elevation above sea level in meters
    pub elevation: f64,
    /// Atmospheric pressure in mbar, 0 disables refraction
    pub pressure: f64,
    /// Apparent sun elevation treated as sunrise/sunset, in degrees
    pub horizon: f64,
}

impl ObserverLocation {
    /// Create an observer at sea level with no refraction and the default horizon.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) {
            anyhow::bail!("Latitude must be between -90 and 90 degrees (got {latitude})");
        }
        if !(-180.0..=180.0).contains(&longitude) {
            anyhow::bail!("Longitude must be between -180 and 180 degrees (got {longitude})");
        }

        Ok(Self {
            latitude,
            longitude,
            elevation: 0.0,
            pressure: 0.0,
            horizon: DEFAULT_HORIZON_DEG,
        })
    }

    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = elevation;
        self
    }

    pub fn with_pressure(mut self, pressure: f64) -> Self {
        self.pressure = pressure;
        self
    }

    pub fn with_horizon(mut self, horizon: f64) -> Self {
        self.horizon = horizon;
        self
    }

    /// Geometric sun elevation, in degrees, at which events are reported.
    pub fn effective_horizon(&self) -> f64 {
        self.horizon - refraction_at_horizon(self.pressure)
    }
}

/// Atmospheric refraction at the horizon for the given pressure, in degrees.
pub fn refraction_at_horizon(pressure_mbar: f64) -> f64 {
    if pressure_mbar <= 0.0 {
        0.0
    } else {
        HORIZON_REFRACTION_DEG * pressure_mbar / STANDARD_PRESSURE_MBAR
    }
}

/// The two events a schedule is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SunEvent {
    Rise,
    Set,
}

impl SunEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            SunEvent::Rise => "sunrise",
            SunEvent::Set => "sunset",
        }
    }
}

/// Compute one event for the solar day on `date` (UTC).
///
/// Returns `None` when the sun never reaches the horizon elevation on that
/// day (polar day or night), which the solver signals with a result that lies
/// outside the day or on the wrong side of solar noon.
pub fn event_on_date(
    location: &ObserverLocation,
    date: NaiveDate,
    event: SunEvent,
) -> Option<DateTime<Utc>> {
    let coord = Coordinates::new(location.latitude, location.longitude)?;
    let day = SolarDay::new(coord, date).with_altitude(location.elevation.max(0.0));

    // The solver takes the depression below the horizon, positive downwards
    let time = day.event_time(SolarEvent::Elevation {
        elevation: (-location.effective_horizon()).to_radians(),
        morning: event == SunEvent::Rise,
    });

    let transit = approximate_transit(location.longitude, date)?;
    let offset = time.signed_duration_since(transit);
    let within_half_day = offset.abs() <= Duration::hours(12) + Duration::minutes(30);
    let correct_side = match event {
        SunEvent::Rise => offset <= Duration::zero(),
        SunEvent::Set => offset >= Duration::zero(),
    };

    (within_half_day && correct_side).then_some(time)
}

/// Mean solar noon for `date` at `longitude`, in UTC.
fn approximate_transit(longitude: f64, date: NaiveDate) -> Option<DateTime<Utc>> {
    let noon = date.and_hms_opt(12, 0, 0)?.and_utc();
    let offset_secs = (longitude / 15.0 * 3600.0).round() as i64;
    Some(noon - Duration::seconds(offset_secs))
}

/// Find the earliest `event` strictly after `after`.
///
/// Searches the solar days around `after`. An unavailable event encountered
/// before a usable one means the schedule cannot be trusted, so the search
/// stops and reports the failing date.
pub fn next_event_after(
    location: &ObserverLocation,
    after: DateTime<Utc>,
    event: SunEvent,
) -> std::result::Result<DateTime<Utc>, NaiveDate> {
    let start = after.date_naive() - Duration::days(1);

    for offset in 0..4 {
        let date = start + Duration::days(offset);
        match event_on_date(location, date, event) {
            Some(time) if time > after => return Ok(time),
            Some(_) => continue,
            None => {
                // A missing event that would have been in the past anyway is irrelevant
                let day_over = approximate_transit(location.longitude, date)
                    .is_some_and(|transit| transit + Duration::hours(13) <= after);
                if !day_over {
                    return Err(date);
                }
            }
        }
    }

    Err(start + Duration::days(3))
}

/// Determine the IANA timezone that contains the given coordinates.
///
/// Falls back to UTC for coordinates the lookup cannot place (open ocean).
pub fn determine_timezone_from_coordinates(latitude: f64, longitude: f64) -> Tz {
    let name = TZ_FINDER.get_tz_name(longitude, latitude);
    name.parse::<Tz>().unwrap_or(chrono_tz::UTC)
}
