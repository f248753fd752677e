use chrono::{Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use std::time::Duration;

use super::schedule::{AwakeIntervalMode, DaySchedule, SunClock};
use super::solar::{ObserverLocation, SunEvent, event_on_date, refraction_at_horizon};
use crate::common::constants::*;
use crate::core::{CaptureError, calculate_frame_count};

fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

fn seattle() -> ObserverLocation {
    ObserverLocation::new(DEFAULT_LATITUDE, DEFAULT_LONGITUDE)
        .unwrap()
        .with_elevation(DEFAULT_ELEVATION_M)
        .with_pressure(DEFAULT_PRESSURE_MBAR)
        .with_horizon(DEFAULT_HORIZON_DEG)
}

#[test]
fn test_legacy_interval_evening_scenario() {
    // Sunrise 06:00, sunset 21:00, asked at 20:00: the next sunrise is
    // tomorrow while the next sunset is still today.
    let now = utc(2024, 6, 1, 20, 0);
    let next_sunset = utc(2024, 6, 1, 21, 0);
    let next_sunrise = utc(2024, 6, 2, 6, 0);

    let schedule = DaySchedule::from_events(
        now,
        next_sunrise,
        next_sunset,
        None,
        AwakeIntervalMode::Legacy,
        chrono_tz::UTC,
    );

    assert_eq!(schedule.awake_interval, ChronoDuration::hours(9));
    assert_eq!(schedule.sleep_interval, Duration::from_secs(10 * 3600));
    assert_eq!(schedule.date_label, "2024-06-02");
    assert_eq!(
        calculate_frame_count(schedule.awake_interval, Duration::from_secs(300)),
        108
    );
}

#[test]
fn test_legacy_interval_is_negative_before_sunrise() {
    let now = utc(2024, 6, 1, 3, 0);
    let schedule = DaySchedule::from_events(
        now,
        utc(2024, 6, 1, 6, 0),
        utc(2024, 6, 1, 21, 0),
        None,
        AwakeIntervalMode::Legacy,
        chrono_tz::UTC,
    );

    assert_eq!(schedule.awake_interval, ChronoDuration::hours(-15));
    assert_eq!(schedule.awake_magnitude(), Duration::from_secs(15 * 3600));
    assert_eq!(
        calculate_frame_count(schedule.awake_interval, Duration::from_secs(60)),
        900
    );
}

#[test]
fn test_daylight_interval_uses_following_sunset() {
    let now = utc(2024, 6, 1, 20, 0);
    let schedule = DaySchedule::from_events(
        now,
        utc(2024, 6, 2, 6, 0),
        utc(2024, 6, 1, 21, 0),
        Some(utc(2024, 6, 2, 21, 0)),
        AwakeIntervalMode::Daylight,
        chrono_tz::UTC,
    );

    assert_eq!(schedule.awake_interval, ChronoDuration::hours(15));
    assert_eq!(schedule.capture_window_end(), utc(2024, 6, 2, 21, 0));
}

#[test]
fn test_date_label_follows_observer_timezone() {
    // 05:00 UTC is still the previous evening in Los Angeles
    let tz = chrono_tz::America::Los_Angeles;
    let schedule = DaySchedule::from_events(
        utc(2024, 6, 1, 0, 0),
        utc(2024, 6, 2, 5, 0),
        utc(2024, 6, 1, 4, 0),
        Some(utc(2024, 6, 2, 20, 0)),
        AwakeIntervalMode::Daylight,
        tz,
    );

    assert_eq!(schedule.date_label, "2024-06-01");
    assert_eq!(schedule.next_sunrise.timezone(), tz);
}

#[test]
fn test_sleep_interval_never_negative() {
    let now = utc(2024, 6, 2, 7, 0);
    let schedule = DaySchedule::from_events(
        now,
        utc(2024, 6, 2, 6, 0),
        utc(2024, 6, 2, 21, 0),
        None,
        AwakeIntervalMode::Legacy,
        chrono_tz::UTC,
    );
    assert_eq!(schedule.sleep_interval, Duration::ZERO);
}

#[test]
fn test_refraction_scales_with_pressure() {
    assert_eq!(refraction_at_horizon(0.0), 0.0);
    let standard = refraction_at_horizon(STANDARD_PRESSURE_MBAR);
    assert!((standard - 34.0 / 60.0).abs() < 1e-9);
    assert!(refraction_at_horizon(505.0) < standard);
}

#[test]
fn test_observer_rejects_out_of_range_coordinates() {
    assert!(ObserverLocation::new(91.0, 0.0).is_err());
    assert!(ObserverLocation::new(0.0, -181.0).is_err());
    assert!(ObserverLocation::new(-90.0, 180.0).is_ok());
}

#[test]
fn test_seattle_events_bracket_solar_noon() {
    let location = seattle();
    let date = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();

    let rise = event_on_date(&location, date, SunEvent::Rise).unwrap();
    let set = event_on_date(&location, date, SunEvent::Set).unwrap();

    assert!(rise < set);
    let daylight = set - rise;
    assert!(daylight > ChronoDuration::hours(14));
    assert!(daylight < ChronoDuration::hours(19));
}

#[test]
fn test_civil_horizon_widens_daylight() {
    let civil = ObserverLocation::new(DEFAULT_LATITUDE, DEFAULT_LONGITUDE).unwrap();
    let geometric = civil.clone().with_horizon(0.0);
    let date = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();

    let civil_rise = event_on_date(&civil, date, SunEvent::Rise).unwrap();
    let civil_set = event_on_date(&civil, date, SunEvent::Set).unwrap();
    let rise = event_on_date(&geometric, date, SunEvent::Rise).unwrap();
    let set = event_on_date(&geometric, date, SunEvent::Set).unwrap();

    assert!(civil_rise < rise, "civil {civil_rise} not before {rise}");
    assert!(civil_set > set, "civil {civil_set} not after {set}");
    // Around 35-45 minutes of civil twilight at this latitude in June
    assert!(rise - civil_rise > ChronoDuration::minutes(30));
    assert!(rise - civil_rise < ChronoDuration::minutes(60));
}

#[test]
fn test_refraction_moves_events_outward() {
    let date = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
    let vacuum = ObserverLocation::new(DEFAULT_LATITUDE, DEFAULT_LONGITUDE).unwrap();
    let standard = vacuum.clone().with_pressure(STANDARD_PRESSURE_MBAR);

    assert!(
        event_on_date(&standard, date, SunEvent::Rise).unwrap()
            < event_on_date(&vacuum, date, SunEvent::Rise).unwrap()
    );
    assert!(
        event_on_date(&standard, date, SunEvent::Set).unwrap()
            > event_on_date(&vacuum, date, SunEvent::Set).unwrap()
    );
}

#[test]
fn test_seattle_civil_dawn_at_summer_solstice() {
    // Civil dawn is 04:31 PDT on 2024-06-21
    let location = ObserverLocation::new(DEFAULT_LATITUDE, DEFAULT_LONGITUDE).unwrap();
    let date = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();

    let dawn = event_on_date(&location, date, SunEvent::Rise).unwrap();
    let expected = utc(2024, 6, 21, 11, 31);
    assert!(
        (dawn - expected).abs() <= ChronoDuration::minutes(5),
        "civil dawn computed at {dawn}"
    );
}

#[test]
fn test_polar_day_is_unavailable() {
    let clock = SunClock::new(
        ObserverLocation::new(78.0, 15.0).unwrap(),
        chrono_tz::Arctic::Longyearbyen,
        AwakeIntervalMode::Daylight,
    );
    let err = clock.compute_schedule(utc(2024, 6, 21, 12, 0)).unwrap_err();
    assert!(matches!(err, CaptureError::ScheduleUnavailable { .. }), "{err}");

    let pole = SunClock::new(
        ObserverLocation::new(90.0, 0.0).unwrap(),
        chrono_tz::UTC,
        AwakeIntervalMode::Daylight,
    );
    assert!(matches!(
        pole.compute_schedule(utc(2024, 6, 21, 12, 0)),
        Err(CaptureError::ScheduleUnavailable { .. })
    ));
}

#[test]
fn test_polar_night_is_unavailable() {
    let clock = SunClock::new(
        ObserverLocation::new(78.0, 15.0).unwrap(),
        chrono_tz::Arctic::Longyearbyen,
        AwakeIntervalMode::Legacy,
    );
    let err = clock.compute_schedule(utc(2024, 12, 21, 12, 0)).unwrap_err();
    assert!(matches!(err, CaptureError::ScheduleUnavailable { .. }), "{err}");
    assert!(err.to_string().contains("78.0000"));

    let south_pole = SunClock::new(
        ObserverLocation::new(-90.0, 0.0).unwrap(),
        chrono_tz::UTC,
        AwakeIntervalMode::Daylight,
    );
    assert!(matches!(
        south_pole.compute_schedule(utc(2024, 6, 21, 12, 0)),
        Err(CaptureError::ScheduleUnavailable { .. })
    ));
}

#[test]
fn test_compute_schedule_events_are_after_now() {
    let clock = SunClock::new(
        seattle(),
        chrono_tz::America::Los_Angeles,
        AwakeIntervalMode::Daylight,
    );
    let now = utc(2024, 3, 20, 18, 0);

    let schedule = clock.compute_schedule(now).unwrap();

    assert!(schedule.next_sunrise.with_timezone(&Utc) > now);
    assert!(schedule.next_sunset.with_timezone(&Utc) > now);
    assert!(schedule.awake_interval > ChronoDuration::hours(10));
    assert!(schedule.awake_interval < ChronoDuration::hours(15));
    assert!(schedule.sleep_interval < Duration::from_secs(24 * 3600));
    assert_eq!(schedule.date_label, "2024-03-21");
}

#[test]
fn test_awake_interval_mode_parses_lowercase() {
    #[derive(serde::Deserialize)]
    struct Wrapper {
        mode: AwakeIntervalMode,
    }

    let parsed: Wrapper = toml::from_str("mode = \"legacy\"").unwrap();
    assert_eq!(parsed.mode, AwakeIntervalMode::Legacy);
    assert_eq!(AwakeIntervalMode::default().to_string(), DEFAULT_AWAKE_INTERVAL_MODE);
}
