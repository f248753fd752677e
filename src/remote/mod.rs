//! Remote archival over SSH.
//!
//! The session talks to the archive host through [`RemoteExecutor`]; the
//! production implementation is [`ssh::SshRemote`].
//!
//! ## Module Structure
//!
//! - [`ssh`]: `ssh`/`scp` child processes with per-command timeouts
//! - [`retry`]: bounded retry with exponential backoff

pub mod retry;
pub mod ssh;

use anyhow::Result;
use std::path::Path;

pub use retry::{RetryOutcome, RetryPolicy};
pub use ssh::SshRemote;

/// Result of one remote command or copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    Success,
    /// Non-zero exit; `code` is `None` when killed by a signal
    Failed { code: Option<i32>, stderr: String },
    TimedOut,
}

impl RemoteStatus {
    pub fn success(&self) -> bool {
        matches!(self, RemoteStatus::Success)
    }

    pub fn describe(&self) -> String {
        match self {
            RemoteStatus::Success => "success".to_string(),
            RemoteStatus::Failed { code, stderr } => {
                let code = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
                let detail = stderr.trim();
                if detail.is_empty() {
                    format!("exit status {code}")
                } else {
                    format!("exit status {code}: {detail}")
                }
            }
            RemoteStatus::TimedOut => "timed out".to_string(),
        }
    }
}

/// Runs commands on, and copies files to, a remote host.
///
/// `Err` is reserved for failures to even start the operation (missing
/// binary, unreadable file); everything the remote side reports comes back
/// as a [`RemoteStatus`].
#[cfg_attr(test, mockall::automock)]
pub trait RemoteExecutor {
    fn run_remote_command(&self, host: &str, command: &str) -> Result<RemoteStatus>;

    fn copy_file(&self, local: &Path, host: &str, remote_dir: &str) -> Result<RemoteStatus>;
}

/// Archive destination: `host:base_dir/{date_label}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub host: String,
    pub base_dir: String,
}

impl RemoteTarget {
    pub fn new(host: impl Into<String>, base_dir: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            base_dir: base_dir.into(),
        }
    }

    /// Remote directory for one batch.
    pub fn batch_dir(&self, date_label: &str) -> String {
        let base = self.base_dir.trim_end_matches('/');
        if base.is_empty() {
            format!("/{date_label}")
        } else {
            format!("{base}/{date_label}")
        }
    }
}
