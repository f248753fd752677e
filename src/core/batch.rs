//! One day's frames and their transfer results.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Frames captured for one sunrise date.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureBatch {
    pub date_label: String,
    pub directory: PathBuf,
    pub frame_interval: Duration,
    pub frame_count: u32,
    /// Captured files in capture order; only ever appended to
    pub files: Vec<PathBuf>,
}

impl CaptureBatch {
    pub fn new(
        date_label: impl Into<String>,
        directory: PathBuf,
        frame_interval: Duration,
        frame_count: u32,
    ) -> Self {
        Self {
            date_label: date_label.into(),
            directory,
            frame_interval,
            frame_count,
            files: Vec::new(),
        }
    }

    pub fn record(&mut self, file: PathBuf) {
        self.files.push(file);
    }

    pub fn is_complete(&self) -> bool {
        self.files.len() as u64 >= u64::from(self.frame_count)
    }
}

/// Per-file transfer result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransferStatus {
    Transferred { attempts: u32 },
    Failed { attempts: u32, reason: String },
}

impl TransferStatus {
    pub fn is_transferred(&self) -> bool {
        matches!(self, TransferStatus::Transferred { .. })
    }
}

/// Transfer results keyed by file name, in name order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TransferOutcome {
    entries: BTreeMap<String, TransferStatus>,
}

impl TransferOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, file_name: impl Into<String>, status: TransferStatus) {
        self.entries.insert(file_name.into(), status);
    }

    pub fn get(&self, file_name: &str) -> Option<&TransferStatus> {
        self.entries.get(file_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when every recorded file was transferred.
    pub fn all_succeeded(&self) -> bool {
        self.entries.values().all(TransferStatus::is_transferred)
    }

    pub fn transferred_count(&self) -> usize {
        self.entries.values().filter(|s| s.is_transferred()).count()
    }

    /// Names of the files that did not make it, in name order.
    pub fn failed_files(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, status)| !status.is_transferred())
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TransferStatus)> {
        self.entries.iter()
    }
}
