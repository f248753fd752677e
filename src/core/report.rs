//! JSON summary of one run, written next to the batches.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::{CaptureSession, SessionState, TransferOutcome};
use crate::common::constants::*;
use crate::common::utils::private_path;
use crate::geo::{AwakeIntervalMode, DaySchedule};

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleSummary {
    pub timezone: String,
    pub next_sunrise: String,
    pub next_sunset: String,
    pub sleep_interval_secs: u64,
    pub awake_interval_secs: i64,
    pub mode: AwakeIntervalMode,
}

impl From<&DaySchedule> for ScheduleSummary {
    fn from(schedule: &DaySchedule) -> Self {
        Self {
            timezone: schedule.timezone.to_string(),
            next_sunrise: schedule.next_sunrise.to_rfc3339(),
            next_sunset: schedule.next_sunset.to_rfc3339(),
            sleep_interval_secs: schedule.sleep_interval.as_secs(),
            awake_interval_secs: schedule.awake_interval.num_seconds(),
            mode: schedule.mode,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorSummary {
    pub kind: String,
    pub message: String,
}

/// Outcome of one run as recorded on disk.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub version: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub date_label: Option<String>,
    pub state: SessionState,
    pub schedule: Option<ScheduleSummary>,
    pub frames_planned: u32,
    pub frames_captured: usize,
    pub files: Vec<String>,
    pub transfer: Option<TransferOutcome>,
    pub error: Option<ErrorSummary>,
}

impl RunReport {
    pub fn from_session(session: &CaptureSession, started_at: DateTime<Utc>) -> Self {
        let batch = session.batch();
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at,
            finished_at: session.timer().now(),
            date_label: session.schedule().map(|s| s.date_label.clone()),
            state: session.state(),
            schedule: session.schedule().map(ScheduleSummary::from),
            frames_planned: batch.map_or(0, |b| b.frame_count),
            frames_captured: batch.map_or(0, |b| b.files.len()),
            files: batch
                .map(|b| {
                    b.files
                        .iter()
                        .filter_map(|f| f.file_name())
                        .map(|n| n.to_string_lossy().into_owned())
                        .collect()
                })
                .unwrap_or_default(),
            transfer: session.transfer().cloned(),
            error: session.error().map(|e| ErrorSummary {
                kind: e.kind().to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// `{base_dir}/reports/{date_label}.json`, falling back to the start date.
    pub fn path_in(&self, base_dir: &Path) -> PathBuf {
        let stem = self
            .date_label
            .clone()
            .unwrap_or_else(|| self.started_at.format(BATCH_DATE_FORMAT).to_string());
        base_dir.join(REPORTS_DIR_NAME).join(format!("{stem}.json"))
    }

    /// Write the report, replacing an earlier one for the same date.
    pub fn write(&self, base_dir: &Path) -> Result<PathBuf> {
        let path = self.path_in(base_dir);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create report directory {}", private_path(parent))
            })?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize run report")?;
        std::fs::write(&path, json + "\n")
            .with_context(|| format!("Failed to write run report {}", private_path(&path)))?;
        Ok(path)
    }
}
