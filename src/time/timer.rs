//! Cancellable waits and wall-clock cadence alignment.

use chrono::{DateTime, TimeZone, Timelike, Utc};
use std::sync::Arc;
use std::time::Duration;

use super::source::Clock;
use crate::common::constants::WAIT_CHUNK_MS;
use crate::io::signals::ShutdownSignal;

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Elapsed,
    Cancelled,
}

/// Clock plus shutdown channel; every wait in the pipeline goes through here.
pub struct Timer {
    clock: Arc<dyn Clock>,
    shutdown: ShutdownSignal,
}

impl Timer {
    pub fn new(clock: Arc<dyn Clock>, shutdown: ShutdownSignal) -> Self {
        Self { clock, shutdown }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn shutdown(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown.is_shutdown_requested()
    }

    /// Wait until `deadline`, in bounded chunks.
    ///
    /// The clock is re-read after every chunk, so suspends and clock
    /// adjustments shorten or extend the wait instead of being slept through.
    pub fn sleep_until(&self, deadline: DateTime<Utc>) -> WaitOutcome {
        let max_chunk = Duration::from_millis(WAIT_CHUNK_MS);

        loop {
            if self.shutdown.is_shutdown_requested() {
                return WaitOutcome::Cancelled;
            }

            let remaining = match deadline.signed_duration_since(self.clock.now()).to_std() {
                Ok(remaining) if !remaining.is_zero() => remaining,
                _ => return WaitOutcome::Elapsed,
            };

            if self.shutdown.wait(remaining.min(max_chunk), self.clock.as_ref()) {
                return WaitOutcome::Cancelled;
            }
        }
    }

    pub fn sleep_for(&self, duration: Duration) -> WaitOutcome {
        let step = chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX);
        let deadline = self
            .clock
            .now()
            .checked_add_signed(step)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.sleep_until(deadline)
    }
}

/// Delay from `now` to the next multiple of `cadence` since local midnight.
///
/// Always in `(0, cadence]`: a time exactly on a boundary waits one full
/// cadence. A zero cadence yields zero.
pub fn delay_to_next_boundary<Tz: TimeZone>(now: &DateTime<Tz>, cadence: Duration) -> Duration {
    let cadence_ms = cadence.as_millis() as u64;
    if cadence_ms == 0 {
        return Duration::ZERO;
    }

    let time = now.time();
    // Leap seconds report nanos >= 1e9
    let sub_ms = u64::from(time.nanosecond().min(999_999_999)) / 1_000_000;
    let day_ms = u64::from(time.num_seconds_from_midnight()) * 1000 + sub_ms;

    let next_boundary = (day_ms / cadence_ms + 1) * cadence_ms;
    Duration::from_millis(next_boundary - day_ms)
}
