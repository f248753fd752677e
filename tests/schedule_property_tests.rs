use chrono::{Duration as ChronoDuration, TimeZone, Timelike, Utc};
use proptest::prelude::*;
use std::time::Duration;

use longlapse::core::calculate_frame_count;
use longlapse::geo::solar::determine_timezone_from_coordinates;
use longlapse::geo::{AwakeIntervalMode, ObserverLocation, SunClock};
use longlapse::time::delay_to_next_boundary;

/// Cadences that divide a day evenly, the ones people actually configure
fn cadence_strategy() -> impl Strategy<Value = u64> {
    prop::sample::select(vec![1u64, 5, 10, 15, 30, 60, 120, 300, 600, 900, 1800, 3600])
}

/// Latitudes where the sun rises and sets every day of the year
fn temperate_latitude_strategy() -> impl Strategy<Value = f64> {
    -55.0..=55.0
}

#[cfg(test)]
mod frame_count_tests {
    use super::*;

    proptest! {
        #[test]
        fn frame_count_is_floor_of_magnitude_over_cadence(
            awake_secs in -86_400i64..=86_400,
            cadence in 1u64..=3600,
        ) {
            let count = calculate_frame_count(
                ChronoDuration::seconds(awake_secs),
                Duration::from_secs(cadence),
            );
            prop_assert_eq!(u64::from(count), awake_secs.unsigned_abs() / cadence);
        }

        #[test]
        fn frame_count_ignores_sign(awake_secs in 0i64..=86_400, cadence in 1u64..=3600) {
            let cadence = Duration::from_secs(cadence);
            prop_assert_eq!(
                calculate_frame_count(ChronoDuration::seconds(awake_secs), cadence),
                calculate_frame_count(ChronoDuration::seconds(-awake_secs), cadence)
            );
        }
    }
}

#[cfg(test)]
mod boundary_tests {
    use super::*;

    proptest! {
        #[test]
        fn delay_is_positive_and_at_most_one_cadence(
            second_of_day in 0u32..86_400,
            millis in 0u32..1000,
            cadence in cadence_strategy(),
        ) {
            let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
                + ChronoDuration::seconds(i64::from(second_of_day))
                + ChronoDuration::milliseconds(i64::from(millis));
            let delay = delay_to_next_boundary(&now, Duration::from_secs(cadence));

            prop_assert!(delay > Duration::ZERO);
            prop_assert!(delay <= Duration::from_secs(cadence));
        }

        #[test]
        fn delay_lands_on_a_grid_line(
            second_of_day in 0u32..86_400,
            cadence in cadence_strategy(),
        ) {
            let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
                + ChronoDuration::seconds(i64::from(second_of_day));
            let delay = delay_to_next_boundary(&now, Duration::from_secs(cadence));
            let next = now + ChronoDuration::from_std(delay).unwrap();

            prop_assert_eq!(u64::from(next.num_seconds_from_midnight()) % cadence, 0);
            prop_assert_eq!(next.nanosecond(), 0);
        }

        #[test]
        fn exact_boundary_waits_a_full_period(
            slot in 0u32..24,
            cadence in cadence_strategy(),
        ) {
            let now = Utc.with_ymd_and_hms(2024, 6, 1, slot, 0, 0).unwrap();
            prop_assert_eq!(
                delay_to_next_boundary(&now, Duration::from_secs(cadence)),
                Duration::from_secs(cadence)
            );
        }
    }
}

#[cfg(test)]
mod schedule_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn daylight_schedule_is_ordered_and_positive(
            latitude in temperate_latitude_strategy(),
            longitude in -180.0f64..=180.0,
            day_of_year in 0i64..365,
            hour in 0i64..24,
        ) {
            let location = ObserverLocation::new(latitude, longitude).unwrap();
            let timezone = determine_timezone_from_coordinates(latitude, longitude);
            let sun = SunClock::new(location, timezone, AwakeIntervalMode::Daylight);
            let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + ChronoDuration::days(day_of_year)
                + ChronoDuration::hours(hour);

            let schedule = sun.compute_schedule(now).unwrap();

            prop_assert!(schedule.next_sunrise.with_timezone(&Utc) > now);
            prop_assert!(schedule.next_sunset.with_timezone(&Utc) > now);
            prop_assert!(schedule.awake_interval > ChronoDuration::zero());
            prop_assert!(schedule.awake_interval < ChronoDuration::hours(24));
            prop_assert!(schedule.sleep_interval <= Duration::from_secs(26 * 3600));
        }

        #[test]
        fn legacy_interval_never_exceeds_a_day(
            latitude in temperate_latitude_strategy(),
            day_of_year in 0i64..365,
        ) {
            let location = ObserverLocation::new(latitude, 0.0).unwrap();
            let sun = SunClock::new(location, chrono_tz::UTC, AwakeIntervalMode::Legacy);
            let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
                + ChronoDuration::days(day_of_year);

            let schedule = sun.compute_schedule(now).unwrap();

            prop_assert!(schedule.awake_interval.num_hours().abs() < 24);
        }
    }
}
