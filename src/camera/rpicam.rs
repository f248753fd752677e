//! `rpicam-still` camera backend.
//!
//! The capture program is started once per batch in signal mode
//! (`--signal --timeout 0`) so the sensor stays configured and exposure stays
//! settled between frames. Each SIGUSR1 writes the next numbered frame into a
//! hidden staging directory, from where it is moved to its final name.
//! SIGUSR2 stops the program.

use anyhow::{Context, Result};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use super::{CameraBackend, CameraDevice, CameraSettings};
use crate::common::constants::*;
use crate::common::utils::private_path;
use crate::io::fs::{ensure_dir, list_visible_files};

/// Opens `rpicam-still` (or a compatible program such as `libcamera-still`).
pub struct RpicamBackend {
    command: String,
    staging_dir: PathBuf,
}

impl RpicamBackend {
    pub fn new(command: impl Into<String>, staging_dir: PathBuf) -> Self {
        Self {
            command: command.into(),
            staging_dir,
        }
    }
}

impl CameraBackend for RpicamBackend {
    fn name(&self) -> &'static str {
        "rpicam-still"
    }

    fn open(&self, settings: &CameraSettings) -> Result<Box<dyn CameraDevice>> {
        ensure_dir(&self.staging_dir)?;
        // Frames left over from an interrupted run would shift the numbering
        for stale in list_visible_files(&self.staging_dir)? {
            let _ = fs::remove_file(stale);
        }

        let args = build_args(settings, &self.staging_dir);
        let mut child = Command::new(&self.command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start {}", self.command))?;

        std::thread::sleep(settings.warmup);

        if let Some(status) = child.try_wait()? {
            anyhow::bail!("{} exited during warm-up ({status})", self.command);
        }

        Ok(Box::new(RpicamStill {
            child: Some(child),
            staging_dir: self.staging_dir.clone(),
            extension: settings.extension.clone(),
            next_index: 0,
        }))
    }
}

/// Command-line arguments for a signal-triggered session.
pub fn build_args(settings: &CameraSettings, staging_dir: &Path) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "--nopreview".into(),
        "--timeout".into(),
        "0".into(),
        "--signal".into(),
        "--framestart".into(),
        "0".into(),
        "--width".into(),
        settings.width.to_string(),
        "--height".into(),
        settings.height.to_string(),
        "--framerate".into(),
        settings.framerate.to_string(),
    ];

    if settings.hflip {
        args.push("--hflip".into());
    }
    if settings.vflip {
        args.push("--vflip".into());
    }

    args.push("--metering".into());
    args.push(settings.metering.as_str().into());

    // ISO 100 corresponds to unity analogue gain
    args.push("--gain".into());
    args.push(format!("{}", f64::from(settings.iso) / 100.0));

    match settings.awb_gains {
        Some((red, blue)) => {
            args.push("--awbgains".into());
            args.push(format!("{red},{blue}"));
        }
        None => {
            args.push("--awb".into());
            args.push(settings.awb.as_str().into());
        }
    }

    args.push("--encoding".into());
    args.push(settings.extension.clone());
    args.push("--output".into());
    args.push(
        staging_dir
            .join(format!("frame%05d.{}", settings.extension))
            .display()
            .to_string(),
    );

    args
}

/// A running `rpicam-still --signal` process.
pub struct RpicamStill {
    child: Option<Child>,
    staging_dir: PathBuf,
    extension: String,
    next_index: u32,
}

impl RpicamStill {
    fn pid(&self) -> Result<Pid> {
        let child = self.child.as_ref().context("Camera process already stopped")?;
        let raw = i32::try_from(child.id()).context("Camera PID out of range")?;
        Ok(Pid::from_raw(raw))
    }

    fn staged_path(&self, index: u32) -> PathBuf {
        self.staging_dir
            .join(format!("frame{index:05}.{}", self.extension))
    }

    /// Wait for `path` to appear with a size that stopped changing.
    fn wait_for_frame(&mut self, path: &Path) -> Result<()> {
        let deadline = Instant::now() + Duration::from_millis(FRAME_ARRIVAL_TIMEOUT_MS);
        let mut last_size = None;

        while Instant::now() < deadline {
            if let Some(child) = self.child.as_mut()
                && let Some(status) = child.try_wait()?
            {
                anyhow::bail!("camera process exited unexpectedly ({status})");
            }

            if let Ok(meta) = fs::metadata(path) {
                let size = meta.len();
                if size > 0 && last_size == Some(size) {
                    return Ok(());
                }
                last_size = Some(size);
            }

            std::thread::sleep(Duration::from_millis(FRAME_ARRIVAL_POLL_MS));
        }

        anyhow::bail!(
            "no frame written to {} within {}s",
            private_path(path),
            FRAME_ARRIVAL_TIMEOUT_MS / 1000
        )
    }
}

impl CameraDevice for RpicamStill {
    fn capture(&mut self, destination: &Path) -> Result<()> {
        let staged = self.staged_path(self.next_index);

        signal::kill(self.pid()?, Signal::SIGUSR1).context("Failed to trigger capture")?;
        self.wait_for_frame(&staged)?;
        self.next_index += 1;

        move_file(&staged, destination)
    }

    fn release(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        if child.try_wait()?.is_some() {
            return Ok(());
        }

        if let Ok(raw) = i32::try_from(child.id()) {
            let _ = signal::kill(Pid::from_raw(raw), Signal::SIGUSR2);
        }

        let deadline = Instant::now() + Duration::from_millis(CAMERA_SHUTDOWN_TIMEOUT_MS);
        while Instant::now() < deadline {
            if child.try_wait()?.is_some() {
                return Ok(());
            }
            std::thread::sleep(Duration::from_millis(CHILD_POLL_INTERVAL_MS));
        }

        log_warning!("Camera process did not exit after SIGUSR2, killing it");
        child.kill().context("Failed to kill camera process")?;
        child.wait().context("Failed to reap camera process")?;
        Ok(())
    }
}

/// Rename, falling back to copy and delete across filesystems.
fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }

    fs::copy(from, to).with_context(|| {
        format!(
            "Failed to move frame {} to {}",
            private_path(from),
            private_path(to)
        )
    })?;
    fs::remove_file(from)
        .with_context(|| format!("Failed to remove staged frame {}", private_path(from)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{MeteringMode, WhiteBalanceMode};

    fn arg_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_default_args() {
        let args = build_args(&CameraSettings::default(), Path::new("/srv/lapse/.staging"));

        assert_eq!(arg_after(&args, "--width"), Some("2592"));
        assert_eq!(arg_after(&args, "--height"), Some("1944"));
        assert_eq!(arg_after(&args, "--timeout"), Some("0"));
        assert_eq!(arg_after(&args, "--gain"), Some("1"));
        assert_eq!(arg_after(&args, "--metering"), Some("centre"));
        assert_eq!(arg_after(&args, "--awb"), Some("auto"));
        assert_eq!(
            arg_after(&args, "--output"),
            Some("/srv/lapse/.staging/frame%05d.jpg")
        );
        assert!(args.contains(&"--signal".to_string()));
        assert!(args.contains(&"--hflip".to_string()));
        assert!(args.contains(&"--vflip".to_string()));
    }

    #[test]
    fn test_custom_settings_args() {
        let settings = CameraSettings {
            hflip: false,
            vflip: false,
            metering: MeteringMode::Spot,
            iso: 400,
            awb: WhiteBalanceMode::Daylight,
            awb_gains: Some((1.5, 1.25)),
            extension: "png".into(),
            ..CameraSettings::default()
        };
        let args = build_args(&settings, Path::new("/tmp/stage"));

        assert!(!args.contains(&"--hflip".to_string()));
        assert_eq!(arg_after(&args, "--gain"), Some("4"));
        assert_eq!(arg_after(&args, "--metering"), Some("spot"));
        assert_eq!(arg_after(&args, "--awbgains"), Some("1.5,1.25"));
        assert_eq!(arg_after(&args, "--awb"), None);
        assert_eq!(arg_after(&args, "--encoding"), Some("png"));
    }

    #[test]
    fn test_move_file_replaces_staged_frame() {
        let dir = tempfile::tempdir().unwrap();
        let staged = dir.path().join("frame00000.jpg");
        let dest = dir.path().join("2024-06-01_05-00_frame001.jpg");
        fs::write(&staged, b"jpeg").unwrap();

        move_file(&staged, &dest).unwrap();

        assert!(!staged.exists());
        assert_eq!(fs::read(&dest).unwrap(), b"jpeg");
    }

    #[test]
    fn test_open_fails_for_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let backend = RpicamBackend::new(
            "/nonexistent/longlapse-camera",
            dir.path().join(STAGING_DIR_NAME),
        );
        let settings = CameraSettings {
            warmup: Duration::ZERO,
            ..CameraSettings::default()
        };

        assert!(backend.open(&settings).is_err());
    }
}
