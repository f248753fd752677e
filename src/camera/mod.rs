//! Camera abstraction for still capture.
//!
//! A [`CameraBackend`] opens a [`CameraDevice`] already configured with the
//! batch's [`CameraSettings`]. The capture loop holds the device through a
//! [`CameraGuard`] so the sensor is released on every exit path, including
//! early returns and panics.
//!
//! ## Module Structure
//!
//! - [`rpicam`]: backend driving `rpicam-still` in signal-triggered mode

pub mod rpicam;

use anyhow::Result;
use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::Path;
use std::time::Duration;

use crate::common::constants::*;

pub use rpicam::RpicamBackend;

/// Exposure metering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeteringMode {
    #[default]
    Centre,
    Spot,
    Average,
    Custom,
}

impl MeteringMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeteringMode::Centre => "centre",
            MeteringMode::Spot => "spot",
            MeteringMode::Average => "average",
            MeteringMode::Custom => "custom",
        }
    }
}

/// White balance preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhiteBalanceMode {
    #[default]
    Auto,
    Incandescent,
    Tungsten,
    Fluorescent,
    Indoor,
    Daylight,
    Cloudy,
    Custom,
}

impl WhiteBalanceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WhiteBalanceMode::Auto => "auto",
            WhiteBalanceMode::Incandescent => "incandescent",
            WhiteBalanceMode::Tungsten => "tungsten",
            WhiteBalanceMode::Fluorescent => "fluorescent",
            WhiteBalanceMode::Indoor => "indoor",
            WhiteBalanceMode::Daylight => "daylight",
            WhiteBalanceMode::Cloudy => "cloudy",
            WhiteBalanceMode::Custom => "custom",
        }
    }
}

/// Sensor configuration applied once when the camera is opened.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraSettings {
    pub width: u32,
    pub height: u32,
    pub framerate: f64,
    pub hflip: bool,
    pub vflip: bool,
    pub metering: MeteringMode,
    pub iso: u32,
    pub awb: WhiteBalanceMode,
    /// Fixed (red, blue) gains, overriding `awb`
    pub awb_gains: Option<(f32, f32)>,
    /// Settling time after opening, before the first frame
    pub warmup: Duration,
    /// File extension, also selects the encoding
    pub extension: String,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_CAMERA_WIDTH,
            height: DEFAULT_CAMERA_HEIGHT,
            framerate: DEFAULT_CAMERA_FRAMERATE,
            hflip: DEFAULT_CAMERA_HFLIP,
            vflip: DEFAULT_CAMERA_VFLIP,
            metering: MeteringMode::default(),
            iso: DEFAULT_CAMERA_ISO,
            awb: WhiteBalanceMode::default(),
            awb_gains: None,
            warmup: Duration::from_secs(DEFAULT_CAMERA_WARMUP_SECS),
            extension: DEFAULT_CAMERA_EXTENSION.to_string(),
        }
    }
}

/// An open, configured camera.
pub trait CameraDevice {
    /// Capture one still to `destination`.
    fn capture(&mut self, destination: &Path) -> Result<()>;

    /// Release the sensor. Called exactly once.
    fn release(&mut self) -> Result<()>;
}

/// Factory for camera devices.
pub trait CameraBackend {
    fn name(&self) -> &'static str;

    /// Open the camera and apply `settings`.
    fn open(&self, settings: &CameraSettings) -> Result<Box<dyn CameraDevice>>;
}

/// Scoped ownership of an open camera.
pub struct CameraGuard {
    device: Option<Box<dyn CameraDevice>>,
}

impl CameraGuard {
    pub fn acquire(backend: &dyn CameraBackend, settings: &CameraSettings) -> Result<Self> {
        let device = backend.open(settings)?;
        Ok(Self {
            device: Some(device),
        })
    }

    pub fn capture(&mut self, destination: &Path) -> Result<()> {
        match self.device.as_mut() {
            Some(device) => device.capture(destination),
            None => anyhow::bail!("Camera already released"),
        }
    }

    /// Release now and report the result; dropping releases silently.
    pub fn release(mut self) -> Result<()> {
        match self.device.take() {
            Some(mut device) => device.release(),
            None => Ok(()),
        }
    }
}

impl Drop for CameraGuard {
    fn drop(&mut self) {
        if let Some(mut device) = self.device.take()
            && let Err(e) = device.release()
        {
            log_warning!("Failed to release camera: {e}");
        }
    }
}

/// File name for frame `index` captured at `timestamp`.
///
/// `{YYYY-MM-DD_HH-MM}_frame{NNN}.{ext}`; indices past 999 keep all digits.
pub fn frame_file_name<Tz: TimeZone>(timestamp: &DateTime<Tz>, index: u32, extension: &str) -> String
where
    Tz::Offset: Display,
{
    format!(
        "{}_frame{:0width$}.{}",
        timestamp.format(FRAME_TIMESTAMP_FORMAT),
        index,
        extension,
        width = FRAME_COUNTER_WIDTH
    )
}
