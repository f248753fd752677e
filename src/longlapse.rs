//! Application coordinator for one day's run.
//!
//! Owns everything that lives for the whole process: the file log, the
//! configuration, the signal handler and the instance lock. Once those are in
//! place it computes the schedule, hands the day to a [`CaptureSession`] and
//! writes the run report, whatever the outcome.
//!
//! ```no_run
//! use longlapse::Longlapse;
//!
//! # fn main() -> anyhow::Result<()> {
//! Longlapse::new(false)
//!     .with_log_file(Some("/var/log/longlapse.log".to_string()))
//!     .run()?;
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;

use crate::camera::{CameraBackend, RpicamBackend};
use crate::common::constants::*;
use crate::common::logger::{Log, LoggerGuard};
use crate::common::utils::private_path;
use crate::config::Config;
use crate::core::{CaptureError, CaptureSession, RunReport, SessionOptions};
use crate::geo::{SunClock, log_schedule};
use crate::io::lock::{acquire_lock, default_lock_path};
use crate::io::signals::setup_signal_handler;
use crate::remote::{RemoteExecutor, SshRemote};
use crate::time::{Clock, SystemClock, Timer};

/// Builder for configuring and running a capture day.
pub struct Longlapse {
    debug_enabled: bool,
    log_file: Option<String>,
}

impl Longlapse {
    pub fn new(debug_enabled: bool) -> Self {
        Self {
            debug_enabled,
            log_file: None,
        }
    }

    /// Mirror the log into `path`; overrides `logging.file` from the config.
    pub fn with_log_file(mut self, path: Option<String>) -> Self {
        self.log_file = path;
        self
    }

    /// Run one day: wait for sunrise, capture, archive, clean up, report.
    pub fn run(self) -> Result<()> {
        let config = Config::load().context("Configuration failed")?;

        let _log_guard = self.start_file_logging(&config)?;
        let debug_enabled = self.debug_enabled || config.logging.debug.unwrap_or(false);

        log_version!();
        config.log_config();

        let shutdown = setup_signal_handler(debug_enabled)?;

        let lock = acquire_lock(&default_lock_path())?;
        if debug_enabled {
            log_debug!("Holding lock {}", private_path(lock.path()));
        }

        let location = config.location.observer()?;
        let timezone = config.location.resolve_timezone(&location)?;
        let sun = SunClock::new(location, timezone, config.capture.awake_interval_mode());

        let base_dir = config.capture.base_dir()?;
        let options = SessionOptions {
            base_dir: base_dir.clone(),
            cadence: config.capture.cadence(),
            camera: config.camera.settings(),
            archive_partial_batches: config.capture.archive_partial_batches(),
            retry: config.archive.retry_policy(),
            remote: config.archive.target(),
            debug_enabled,
        };

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let timer = Timer::new(clock, shutdown);
        let started_at = timer.now();
        let mut session = CaptureSession::new(options, timer);

        let camera = RpicamBackend::new(config.camera.command(), base_dir.join(STAGING_DIR_NAME));
        let remote = config.archive.target().map(|_| {
            SshRemote::new(
                config.archive.timeout(),
                config.archive.port,
                config.archive.identity_file(),
            )
            .with_debug(debug_enabled)
        });

        let result = capture_day(
            &mut session,
            &sun,
            &camera,
            remote.as_ref().map(|r| r as &dyn RemoteExecutor),
        );
        write_report(&session, started_at, &base_dir);

        result?;
        log_end!();
        Ok(())
    }

    fn start_file_logging(&self, config: &Config) -> Result<Option<LoggerGuard>> {
        let path = match &self.log_file {
            Some(path) => Some(path.clone()),
            None => config
                .logging
                .file()
                .map(|p| p.to_string_lossy().into_owned()),
        };

        path.map(|p| {
            Log::start_file_logging(p.clone())
                .with_context(|| format!("Failed to open log file {p}"))
        })
        .transpose()
    }
}

/// Compute the schedule from the session's clock and run the day.
///
/// Without a schedule the session fails before the camera is touched.
fn capture_day(
    session: &mut CaptureSession,
    sun: &SunClock,
    camera: &dyn CameraBackend,
    remote: Option<&dyn RemoteExecutor>,
) -> Result<(), CaptureError> {
    match sun.compute_schedule(session.timer().now()) {
        Ok(schedule) => {
            log_schedule(&schedule, sun.location());
            session.run_day(schedule, camera, remote)
        }
        Err(e) => Err(session.fail(e)),
    }
}

fn write_report(session: &CaptureSession, started_at: DateTime<Utc>, base_dir: &Path) {
    let report = RunReport::from_session(session, started_at);
    match report.write(base_dir) {
        Ok(path) => {
            log_block_start!("Run report written to {}", private_path(&path));
        }
        Err(e) => {
            log_pipe!();
            log_warning!("Could not write run report: {e:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::cell::Cell;

    use crate::camera::CameraDevice;
    use crate::camera::CameraSettings;
    use crate::core::SessionState;
    use crate::geo::{AwakeIntervalMode, ObserverLocation};
    use crate::io::signals::ShutdownSignal;
    use crate::remote::MockRemoteExecutor;
    use crate::time::SimulatedClock;

    #[derive(Default)]
    struct CountingCamera {
        opened: Cell<u32>,
    }

    impl CameraBackend for CountingCamera {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn open(&self, _settings: &CameraSettings) -> Result<Box<dyn CameraDevice>> {
            self.opened.set(self.opened.get() + 1);
            anyhow::bail!("camera must not be opened")
        }
    }

    #[test]
    fn test_polar_night_fails_before_capture() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc.with_ymd_and_hms(2024, 12, 21, 12, 0, 0).unwrap();
        let clock: Arc<dyn Clock> = Arc::new(SimulatedClock::new(now));
        let mut session = CaptureSession::new(
            SessionOptions::new(dir.path().to_path_buf()),
            Timer::new(clock, ShutdownSignal::new()),
        );
        let sun = SunClock::new(
            ObserverLocation::new(78.0, 15.0).unwrap(),
            chrono_tz::Arctic::Longyearbyen,
            AwakeIntervalMode::Daylight,
        );
        let camera = CountingCamera::default();
        // No expectations: any remote call panics
        let remote = MockRemoteExecutor::new();

        let err = capture_day(&mut session, &sun, &camera, Some(&remote)).unwrap_err();
        write_report(&session, now, dir.path());

        assert!(matches!(err, CaptureError::ScheduleUnavailable { .. }));
        assert_eq!(session.state(), SessionState::Failed);
        assert_eq!(camera.opened.get(), 0);
        assert!(session.batch().is_none());

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, vec![REPORTS_DIR_NAME.to_string()]);

        let report: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join(REPORTS_DIR_NAME).join("2024-12-21.json"))
                .unwrap(),
        )
        .unwrap();
        assert_eq!(report["state"], "failed");
        assert_eq!(report["error"]["kind"], "schedule_unavailable");
        assert_eq!(report["frames_captured"], 0);
    }
}
