//! Bounded retry with exponential backoff.

use std::fmt::Display;
use std::time::Duration;

use crate::common::constants::*;
use crate::common::utils::format_duration;
use crate::time::{Timer, WaitOutcome};

/// How often, and how patiently, a failed operation is repeated.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Extra attempts after the first; 0 disables retrying
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Growth factor applied to the delay after every retry
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: Duration::from_secs(DEFAULT_RETRY_BACKOFF_SECS),
            multiplier: DEFAULT_RETRY_MULTIPLIER,
        }
    }
}

/// Final result of a retried operation.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome<T, E> {
    Succeeded { value: T, attempts: u32 },
    Exhausted { error: E, attempts: u32 },
    /// Shutdown was requested during a backoff wait
    Cancelled { error: E, attempts: u32 },
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based).
    pub fn backoff_for(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(retry - 1).unwrap_or(i32::MAX);
        let secs = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Run `op` until it succeeds or the retries are used up.
    ///
    /// `op` receives the 1-based attempt number. Backoff waits go through
    /// `timer`, so a shutdown request ends the sequence early.
    pub fn run<T, E, F>(&self, timer: &Timer, label: &str, mut op: F) -> RetryOutcome<T, E>
    where
        E: Display,
        F: FnMut(u32) -> Result<T, E>,
    {
        let mut attempt = 1;
        loop {
            let error = match op(attempt) {
                Ok(value) => {
                    return RetryOutcome::Succeeded {
                        value,
                        attempts: attempt,
                    };
                }
                Err(error) => error,
            };

            if attempt > self.max_retries {
                return RetryOutcome::Exhausted {
                    error,
                    attempts: attempt,
                };
            }

            let delay = self.backoff_for(attempt);
            log_warning!("{label} failed: {error}");
            log_indented!(
                "Retrying in {} (attempt {}/{})",
                format_duration(delay),
                attempt + 1,
                self.max_retries + 1
            );

            if timer.sleep_for(delay) == WaitOutcome::Cancelled {
                return RetryOutcome::Cancelled {
                    error,
                    attempts: attempt,
                };
            }

            attempt += 1;
        }
    }
}
