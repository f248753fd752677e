//! Failure taxonomy for a capture day.
//!
//! Every error the pipeline can surface is one of these kinds; the driver
//! logs it, writes it into the run report and exits cleanly.

use std::fmt;

use super::SessionState;

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureError {
    /// Sunrise or sunset could not be computed; nothing was captured.
    ScheduleUnavailable { reason: String },
    /// Camera configuration or capture failed; the batch is incomplete.
    DeviceFault(String),
    /// The remote directory could not be checked or created; local files kept.
    RemoteUnavailable(String),
    /// One or more files failed to copy; local batch kept.
    TransferFailure { failed: Vec<String> },
    /// A shutdown signal interrupted the named phase.
    Cancelled { phase: &'static str },
    /// Local directory creation, listing or removal failed.
    Filesystem(String),
    /// An operation was invoked out of order.
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },
}

impl CaptureError {
    /// Short machine-readable name used in run reports.
    pub fn kind(&self) -> &'static str {
        match self {
            CaptureError::ScheduleUnavailable { .. } => "schedule_unavailable",
            CaptureError::DeviceFault(_) => "device_fault",
            CaptureError::RemoteUnavailable(_) => "remote_unavailable",
            CaptureError::TransferFailure { .. } => "transfer_failure",
            CaptureError::Cancelled { .. } => "cancelled",
            CaptureError::Filesystem(_) => "filesystem",
            CaptureError::InvalidState { .. } => "invalid_state",
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::ScheduleUnavailable { reason } => {
                write!(f, "Sunrise/sunset schedule unavailable: {reason}")
            }
            CaptureError::DeviceFault(detail) => write!(f, "Camera fault: {detail}"),
            CaptureError::RemoteUnavailable(detail) => {
                write!(f, "Remote archive unavailable: {detail}")
            }
            CaptureError::TransferFailure { failed } => {
                write!(f, "{} file(s) failed to transfer: {}", failed.len(), failed.join(", "))
            }
            CaptureError::Cancelled { phase } => write!(f, "Shutdown requested while {phase}"),
            CaptureError::Filesystem(detail) => write!(f, "Filesystem error: {detail}"),
            CaptureError::InvalidState { operation, state } => {
                write!(f, "Cannot {operation} while session is {state}")
            }
        }
    }
}

impl std::error::Error for CaptureError {}
