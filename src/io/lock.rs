//! Lock file management for single-instance enforcement.
//!
//! Only one capture run may hold the camera at a time. The lock file lives in
//! the runtime directory and contains the owner's PID; a lock left behind by a
//! dead process is removed and re-acquired.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::common::constants::LOCK_FILE_NAME;
use crate::common::utils::{is_process_running, private_path};

/// Exclusive lock held for the lifetime of a run. Released on drop.
#[derive(Debug)]
pub struct InstanceLock {
    file: File,
    path: PathBuf,
}

impl InstanceLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Default lock file location: `$XDG_RUNTIME_DIR/longlapse.lock`, or `/tmp`.
pub fn default_lock_path() -> PathBuf {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(runtime_dir).join(LOCK_FILE_NAME)
}

/// Acquire the single-instance lock at `lock_path`.
///
/// Fails when another live process holds it.
pub fn acquire_lock(lock_path: &Path) -> Result<InstanceLock> {
    if let Some(lock) = try_acquire(lock_path)? {
        return Ok(lock);
    }

    handle_lock_conflict(lock_path)?;

    try_acquire(lock_path)?.with_context(|| {
        format!(
            "Failed to acquire lock {} after stale lock cleanup",
            private_path(lock_path)
        )
    })
}

fn try_acquire(lock_path: &Path) -> Result<Option<InstanceLock>> {
    // Open without truncating so a concurrent holder's PID survives
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)
        .with_context(|| format!("Failed to open lock file {}", private_path(lock_path)))?;

    if file.try_lock_exclusive().is_err() {
        return Ok(None);
    }

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    writeln!(&file, "{}", std::process::id())?;
    file.flush()?;

    Ok(Some(InstanceLock {
        file,
        path: lock_path.to_path_buf(),
    }))
}

/// Remove a stale lock, or fail if its owner is still running.
fn handle_lock_conflict(lock_path: &Path) -> Result<()> {
    let content = match std::fs::read_to_string(lock_path) {
        Ok(content) => content,
        // Already cleaned up by its owner
        Err(_) => return Ok(()),
    };

    let Ok(pid) = content.trim().parse::<u32>() else {
        log_warning!("Lock file contains invalid PID, removing stale lock");
        let _ = std::fs::remove_file(lock_path);
        return Ok(());
    };

    if !is_process_running(pid) {
        log_warning!("Removing stale lock file (process {pid} no longer running)");
        let _ = std::fs::remove_file(lock_path);
        return Ok(());
    }

    anyhow::bail!("longlapse is already running (PID: {pid})")
}
