//! Core capture pipeline.
//!
//! [`CaptureSession`] owns one day's run and moves through
//!
//! ```text
//! Idle → WaitingForSunrise → Capturing → Archiving → CleaningUp → Done
//! ```
//!
//! with `Failed` reachable from every non-terminal state. Schedule, batch and
//! transfer results are plain values owned by the session; the camera, the
//! remote host and the clock are collaborators passed in by the driver.
//!
//! The local batch directory is only ever deleted after every file in it was
//! confirmed on the remote side.

pub mod batch;
pub mod error;
pub mod report;

use chrono::Duration as ChronoDuration;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::camera::{CameraBackend, CameraGuard, CameraSettings, frame_file_name};
use crate::common::constants::*;
use crate::common::utils::{format_duration, private_path, shell_quote_path};
use crate::geo::DaySchedule;
use crate::io::fs::{ensure_dir, list_visible_files, remove_dir};
use crate::remote::{RemoteExecutor, RemoteStatus, RemoteTarget, RetryOutcome, RetryPolicy};
use crate::time::{Timer, WaitOutcome, delay_to_next_boundary};

pub use batch::{CaptureBatch, TransferOutcome, TransferStatus};
pub use error::CaptureError;
pub use report::RunReport;

/// Pipeline position of a [`CaptureSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    WaitingForSunrise,
    Capturing,
    Archiving,
    CleaningUp,
    Done,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SessionState::Idle => "idle",
            SessionState::WaitingForSunrise => "waiting for sunrise",
            SessionState::Capturing => "capturing",
            SessionState::Archiving => "archiving",
            SessionState::CleaningUp => "cleaning up",
            SessionState::Done => "done",
            SessionState::Failed => "failed",
        };
        write!(f, "{text}")
    }
}

/// What happened to the local batch directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    Deleted,
    Retained { failed: Vec<String> },
}

/// Settings a session runs with, resolved from configuration.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Directory holding one subdirectory per batch
    pub base_dir: PathBuf,
    pub cadence: Duration,
    pub camera: CameraSettings,
    pub archive_partial_batches: bool,
    pub retry: RetryPolicy,
    /// Archive destination; `None` keeps batches local
    pub remote: Option<RemoteTarget>,
    pub debug_enabled: bool,
}

impl SessionOptions {
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            cadence: Duration::from_secs(DEFAULT_CADENCE_SECS),
            camera: CameraSettings::default(),
            archive_partial_batches: DEFAULT_ARCHIVE_PARTIAL_BATCHES,
            retry: RetryPolicy::default(),
            remote: None,
            debug_enabled: false,
        }
    }
}

/// Number of frames that fit in the awake interval: `floor(|awake| / cadence)`.
pub fn calculate_frame_count(awake_interval: ChronoDuration, cadence: Duration) -> u32 {
    let cadence_ms = cadence.as_millis();
    if cadence_ms == 0 {
        return 0;
    }
    let awake_ms = u128::from(awake_interval.num_milliseconds().unsigned_abs());
    u32::try_from(awake_ms / cadence_ms).unwrap_or(u32::MAX)
}

/// One day's capture run.
pub struct CaptureSession {
    options: SessionOptions,
    timer: Timer,
    state: SessionState,
    schedule: Option<DaySchedule>,
    batch: Option<CaptureBatch>,
    transfer: Option<TransferOutcome>,
    /// Error that moved the session to `Failed`
    failure: Option<CaptureError>,
    /// Camera fault tolerated because partial batches are archived
    interruption: Option<CaptureError>,
}

impl CaptureSession {
    pub fn new(options: SessionOptions, timer: Timer) -> Self {
        Self {
            options,
            timer,
            state: SessionState::Idle,
            schedule: None,
            batch: None,
            transfer: None,
            failure: None,
            interruption: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    pub fn schedule(&self) -> Option<&DaySchedule> {
        self.schedule.as_ref()
    }

    pub fn batch(&self) -> Option<&CaptureBatch> {
        self.batch.as_ref()
    }

    pub fn transfer(&self) -> Option<&TransferOutcome> {
        self.transfer.as_ref()
    }

    /// The error this run ends with, if any.
    pub fn error(&self) -> Option<&CaptureError> {
        self.failure.as_ref().or(self.interruption.as_ref())
    }

    /// Prepare the batch for `schedule`: `Idle → WaitingForSunrise`.
    ///
    /// Repeating the call before sunrise is harmless; the directory is
    /// created only if missing and files already in it are left alone.
    pub fn begin(&mut self, schedule: DaySchedule) -> Result<(), CaptureError> {
        self.expect_state("begin", &[SessionState::Idle, SessionState::WaitingForSunrise])?;

        let directory = self.options.base_dir.join(&schedule.date_label);
        if let Err(e) = ensure_dir(&directory) {
            return Err(self.fail(CaptureError::Filesystem(format!("{e:#}"))));
        }

        let frame_count = calculate_frame_count(schedule.awake_interval, self.options.cadence);

        log_block_start!("Batch {}", schedule.date_label);
        log_indented!("Directory: {}", private_path(&directory));
        log_indented!(
            "{} frames every {} over {}",
            frame_count,
            format_duration(self.options.cadence),
            format_duration(schedule.awake_magnitude())
        );
        if frame_count > FRAME_COUNTER_MAX {
            log_warning!(
                "{} frames exceed the {}-digit counter; names past frame{} use more digits",
                frame_count,
                FRAME_COUNTER_WIDTH,
                FRAME_COUNTER_MAX
            );
        }

        let reuse = self
            .batch
            .as_ref()
            .is_some_and(|b| b.date_label == schedule.date_label);
        if reuse {
            if let Some(batch) = self.batch.as_mut() {
                batch.frame_count = frame_count;
                batch.frame_interval = self.options.cadence;
            }
        } else {
            self.batch = Some(CaptureBatch::new(
                schedule.date_label.clone(),
                directory,
                self.options.cadence,
                frame_count,
            ));
        }

        self.schedule = Some(schedule);
        self.state = SessionState::WaitingForSunrise;
        Ok(())
    }

    /// Sleep until the scheduled sunrise: `WaitingForSunrise → Capturing`.
    pub fn wait_until_sunrise(&mut self) -> Result<(), CaptureError> {
        self.expect_state("wait for sunrise", &[SessionState::WaitingForSunrise])?;
        let Some(schedule) = self.schedule.as_ref() else {
            return Err(self.invalid("wait for sunrise"));
        };

        let sunrise = schedule.computed_at.with_timezone(&chrono::Utc)
            + ChronoDuration::from_std(schedule.sleep_interval).unwrap_or(ChronoDuration::zero());

        log_block_start!(
            "Sleeping {} until sunrise at {}",
            format_duration(schedule.sleep_interval),
            schedule.next_sunrise.format("%H:%M:%S")
        );

        if self.timer.sleep_until(sunrise) == WaitOutcome::Cancelled {
            return Err(self.fail(CaptureError::Cancelled {
                phase: "waiting for sunrise",
            }));
        }

        self.state = SessionState::Capturing;
        Ok(())
    }

    /// Capture the whole batch: `Capturing → Archiving`.
    ///
    /// The camera is opened once and held until the last frame; it is
    /// released on every exit path.
    pub fn run_capture_loop(&mut self, camera: &dyn CameraBackend) -> Result<(), CaptureError> {
        self.expect_state("capture", &[SessionState::Capturing])?;
        let (Some(mut batch), Some(timezone)) =
            (self.batch.take(), self.schedule.as_ref().map(|s| s.timezone))
        else {
            return Err(self.invalid("capture"));
        };

        log_block_start!(
            "Capturing {} frames with {}",
            batch.frame_count,
            camera.name()
        );

        let result = self.capture_frames(&mut batch, camera, timezone);
        let captured = batch.files.len();
        self.batch = Some(batch);

        match result {
            Ok(()) => {
                log_block_start!("Capture complete: {captured} frames");
                self.state = SessionState::Archiving;
                Ok(())
            }
            Err(err @ CaptureError::DeviceFault(_))
                if self.options.archive_partial_batches && captured > 0 =>
            {
                log_pipe!();
                log_error!("{err}");
                log_indented!("Archiving the {captured} frames captured before the fault");
                self.interruption = Some(err);
                self.state = SessionState::Archiving;
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn capture_frames(
        &self,
        batch: &mut CaptureBatch,
        camera: &dyn CameraBackend,
        timezone: chrono_tz::Tz,
    ) -> Result<(), CaptureError> {
        let cadence = self.options.cadence;
        let extension = self.options.camera.extension.as_str();

        let mut guard = CameraGuard::acquire(camera, &self.options.camera)
            .map_err(|e| CaptureError::DeviceFault(format!("failed to open camera: {e:#}")))?;

        for index in 1..=batch.frame_count {
            if self.timer.is_shutdown_requested() {
                return Err(CaptureError::Cancelled { phase: "capturing" });
            }

            let taken_at = self.timer.now().with_timezone(&timezone);
            let path = batch
                .directory
                .join(frame_file_name(&taken_at, index, extension));

            guard
                .capture(&path)
                .map_err(|e| CaptureError::DeviceFault(format!("frame {index}: {e:#}")))?;
            batch.record(path);

            if self.options.debug_enabled || index == batch.frame_count || index % 60 == 1 {
                log_decorated!(
                    "Frame {}/{} at {}",
                    index,
                    batch.frame_count,
                    taken_at.format("%H:%M:%S")
                );
            }

            if index < batch.frame_count {
                let now = self.timer.now().with_timezone(&timezone);
                let delay = delay_to_next_boundary(&now, cadence);
                if self.timer.sleep_for(delay) == WaitOutcome::Cancelled {
                    return Err(CaptureError::Cancelled { phase: "capturing" });
                }
            }
        }

        if let Err(e) = guard.release() {
            log_warning!("Failed to release camera cleanly: {e:#}");
        }
        Ok(())
    }

    /// Copy the batch to the remote host: `Archiving → CleaningUp`.
    ///
    /// The remote directory is checked with `test -d` and created only when
    /// missing. Files are copied one by one under the retry policy; a failed
    /// file does not stop the others.
    pub fn archive_today(&mut self, remote: &dyn RemoteExecutor) -> Result<(), CaptureError> {
        self.expect_state("archive", &[SessionState::Archiving])?;
        let (Some(target), Some(batch)) = (self.options.remote.clone(), self.batch.clone()) else {
            return Err(self.fail(CaptureError::RemoteUnavailable(
                "no archive host configured".to_string(),
            )));
        };

        let remote_dir = target.batch_dir(&batch.date_label);
        log_block_start!("Archiving to {}:{}", target.host, remote_dir);

        if let Err(err) = self.ensure_remote_dir(remote, &target.host, &remote_dir) {
            log_indented!("Local batch kept at {}", private_path(&batch.directory));
            return Err(self.fail(err));
        }

        let local_files = match list_visible_files(&batch.directory) {
            Ok(files) => files,
            Err(e) => return Err(self.fail(CaptureError::Filesystem(format!("{e:#}")))),
        };

        let mut outcome = TransferOutcome::new();
        for missing in batch.files.iter().filter(|f| !local_files.contains(f)) {
            outcome.record(
                file_name(missing),
                TransferStatus::Failed {
                    attempts: 0,
                    reason: "missing from local batch".to_string(),
                },
            );
        }

        let mut cancelled = false;
        for path in &local_files {
            let name = file_name(path);

            if cancelled || self.timer.is_shutdown_requested() {
                cancelled = true;
                outcome.record(
                    name,
                    TransferStatus::Failed {
                        attempts: 0,
                        reason: "shutdown requested".to_string(),
                    },
                );
                continue;
            }

            let status = match self.copy_with_retry(remote, path, &target.host, &remote_dir) {
                RetryOutcome::Succeeded { attempts, .. } => TransferStatus::Transferred { attempts },
                RetryOutcome::Exhausted { error, attempts } => {
                    TransferStatus::Failed { attempts, reason: error }
                }
                RetryOutcome::Cancelled { error, attempts } => {
                    cancelled = true;
                    TransferStatus::Failed { attempts, reason: error }
                }
            };

            if self.options.debug_enabled {
                log_debug!("{name}: {status:?}");
            }
            outcome.record(name, status);
        }

        log_indented!(
            "Transferred {}/{} files",
            outcome.transferred_count(),
            outcome.len()
        );

        let failed = outcome.failed_files();
        self.transfer = Some(outcome);

        if cancelled {
            return Err(self.fail(CaptureError::Cancelled { phase: "archiving" }));
        }

        if !failed.is_empty() {
            log_pipe!();
            log_warning!("{} file(s) failed to transfer:", failed.len());
            for name in &failed {
                log_indented!("{name}");
            }
        }

        self.state = SessionState::CleaningUp;
        Ok(())
    }

    fn ensure_remote_dir(
        &self,
        remote: &dyn RemoteExecutor,
        host: &str,
        remote_dir: &str,
    ) -> Result<(), CaptureError> {
        let quoted = shell_quote_path(remote_dir);
        let probe = remote
            .run_remote_command(host, &format!("test -d {quoted}"))
            .map_err(|e| CaptureError::RemoteUnavailable(format!("{e:#}")))?;

        match probe {
            RemoteStatus::Success => {
                if self.options.debug_enabled {
                    log_debug!("Remote directory already exists");
                }
                Ok(())
            }
            // test(1) exits 1 for "not a directory"; ssh itself uses 255
            RemoteStatus::Failed { code: Some(1), .. } => {
                log_indented!("Creating remote directory");
                let created = remote
                    .run_remote_command(host, &format!("mkdir -p {quoted}"))
                    .map_err(|e| CaptureError::RemoteUnavailable(format!("{e:#}")))?;
                if created.success() {
                    Ok(())
                } else {
                    Err(CaptureError::RemoteUnavailable(format!(
                        "mkdir -p {remote_dir}: {}",
                        created.describe()
                    )))
                }
            }
            other => Err(CaptureError::RemoteUnavailable(format!(
                "test -d {remote_dir}: {}",
                other.describe()
            ))),
        }
    }

    fn copy_with_retry(
        &self,
        remote: &dyn RemoteExecutor,
        path: &Path,
        host: &str,
        remote_dir: &str,
    ) -> RetryOutcome<(), String> {
        let label = format!("Copy of {}", file_name(path));
        self.options.retry.run(&self.timer, &label, |_| {
            match remote.copy_file(path, host, remote_dir) {
                Ok(RemoteStatus::Success) => Ok(()),
                Ok(status) => Err(status.describe()),
                Err(e) => Err(format!("{e:#}")),
            }
        })
    }

    /// Finish without a remote: `Archiving → Done`, batch kept locally.
    pub fn skip_archival(&mut self) -> Result<(), CaptureError> {
        self.expect_state("skip archival", &[SessionState::Archiving])?;
        if let Some(batch) = self.batch.as_ref() {
            log_block_start!("Archive disabled");
            log_indented!("Batch kept at {}", private_path(&batch.directory));
        }
        self.state = SessionState::Done;
        Ok(())
    }

    /// Delete the local batch if everything arrived: `CleaningUp → Done`.
    pub fn cleanup(&mut self) -> Result<CleanupOutcome, CaptureError> {
        self.expect_state("clean up", &[SessionState::CleaningUp])?;
        let (Some(batch), Some(transfer)) = (self.batch.as_ref(), self.transfer.as_ref()) else {
            return Err(self.invalid("clean up"));
        };
        let directory = batch.directory.clone();

        let outcome = if transfer.all_succeeded() {
            if let Err(e) = remove_dir(&directory) {
                return Err(self.fail(CaptureError::Filesystem(format!("{e:#}"))));
            }
            log_block_start!("Removed local batch {}", private_path(&directory));
            CleanupOutcome::Deleted
        } else {
            let failed = transfer.failed_files();
            log_pipe!();
            log_warning!(
                "Keeping {} because {} file(s) were not transferred: {}",
                private_path(&directory),
                failed.len(),
                failed.join(", ")
            );
            CleanupOutcome::Retained { failed }
        };

        self.state = SessionState::Done;
        Ok(outcome)
    }

    /// Run the whole day: wait for sunrise, capture, archive, clean up.
    pub fn run_day(
        &mut self,
        schedule: DaySchedule,
        camera: &dyn CameraBackend,
        remote: Option<&dyn RemoteExecutor>,
    ) -> Result<(), CaptureError> {
        self.begin(schedule)?;
        self.wait_until_sunrise()?;
        self.run_capture_loop(camera)?;

        let cleanup = match (remote, self.options.remote.is_some()) {
            (Some(remote), true) => {
                self.archive_today(remote)?;
                Some(self.cleanup()?)
            }
            _ => {
                self.skip_archival()?;
                None
            }
        };

        if let Some(CleanupOutcome::Retained { failed }) = cleanup {
            let err = CaptureError::TransferFailure { failed };
            // Capture already finished, so this is recorded without failing the session
            if self.interruption.is_none() {
                self.interruption = Some(err.clone());
            }
            return Err(err);
        }

        match self.interruption.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Record `err` and move to `Failed`.
    pub fn fail(&mut self, err: CaptureError) -> CaptureError {
        log_pipe!();
        log_error!("{err}");
        self.failure = Some(err.clone());
        self.state = SessionState::Failed;
        err
    }

    fn expect_state(
        &self,
        operation: &'static str,
        allowed: &[SessionState],
    ) -> Result<(), CaptureError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(CaptureError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn invalid(&self, operation: &'static str) -> CaptureError {
        CaptureError::InvalidState {
            operation,
            state: self.state,
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
