//! Local batch directory operations.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::common::utils::private_path;

/// Create `dir` and its parents. Succeeds if it already exists.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {}", private_path(dir)))
}

/// Regular files directly inside `dir`, dotfiles excluded, sorted by name.
pub fn list_visible_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to list directory {}", private_path(dir)))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }

    files.sort();
    Ok(files)
}

/// Delete `dir` and everything under it.
pub fn remove_dir(dir: &Path) -> Result<()> {
    fs::remove_dir_all(dir)
        .with_context(|| format!("Failed to remove directory {}", private_path(dir)))
}
