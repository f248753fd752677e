//! Configuration system for longlapse.
//!
//! Settings live in `longlapse.toml`, searched in:
//! 1. the directory passed with `--config <dir>`
//! 2. **XDG_CONFIG_HOME**/longlapse/longlapse.toml
//!
//! A commented default file is written on first run.
//!
//! ```toml
//! #[Location]
//! latitude = 47.734417
//! longitude = -122.355417
//! elevation = 145.0          # Observer elevation in meters
//! pressure = 0.0             # Atmospheric pressure in mbar (0 disables refraction)
//! horizon = -6.0             # Sun elevation treated as sunrise/sunset, in degrees
//! timezone = "America/Los_Angeles"
//!
//! #[Capture]
//! base_dir = "/home/pi/longlapse"
//! cadence = 60               # Seconds between frames, aligned to the wall clock
//! awake_interval = "daylight"
//! archive_partial_batches = false
//!
//! #[Camera]
//! width = 2592
//! height = 1944
//! iso = 100
//!
//! #[Archive]
//! host = "kestrel@kestrel.local"
//! remote_dir = "/Users/kestrel/Desktop/picamera/first_run"
//! max_retries = 0
//! ```
//!
//! Every field is optional; unset fields resolve to the defaults in
//! `common::constants`. Validation runs on load and rejects out-of-range values.

pub mod builder;
pub mod loading;
pub mod validation;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::camera::{CameraSettings, MeteringMode, WhiteBalanceMode};
use crate::common::constants::*;
use crate::common::utils::private_path;
use crate::geo::{AwakeIntervalMode, ObserverLocation};
use crate::remote::{RemoteTarget, RetryPolicy};

pub use builder::create_default_config;
pub use loading::{get_config_path, get_custom_config_dir, load, load_from_path, set_config_dir};

/// Observer location and horizon settings.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct LocationConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation: Option<f64>, // meters above sea level
    pub pressure: Option<f64>,  // mbar; 0 disables refraction
    pub horizon: Option<f64>,   // degrees, negative is below the geometric horizon
    pub timezone: Option<String>,
}

impl LocationConfig {
    /// Build the observer location from the configured values.
    pub fn observer(&self) -> Result<ObserverLocation> {
        let location = ObserverLocation::new(
            self.latitude.unwrap_or(DEFAULT_LATITUDE),
            self.longitude.unwrap_or(DEFAULT_LONGITUDE),
        )?
        .with_elevation(self.elevation.unwrap_or(DEFAULT_ELEVATION_M))
        .with_pressure(self.pressure.unwrap_or(DEFAULT_PRESSURE_MBAR))
        .with_horizon(self.horizon.unwrap_or(DEFAULT_HORIZON_DEG));
        Ok(location)
    }

    /// Resolve the timezone used for batch dates and frame timestamps.
    ///
    /// An explicit `timezone` wins; otherwise the zone is looked up from the
    /// coordinates.
    pub fn resolve_timezone(&self, location: &ObserverLocation) -> Result<Tz> {
        match self.timezone.as_deref() {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|e| anyhow::anyhow!("Unknown timezone '{name}': {e}")),
            None => Ok(crate::geo::solar::determine_timezone_from_coordinates(
                location.latitude,
                location.longitude,
            )),
        }
    }
}

/// Capture cadence and local storage settings.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct CaptureConfig {
    pub base_dir: Option<String>,
    pub cadence: Option<u64>, // seconds between frames
    pub awake_interval: Option<AwakeIntervalMode>,
    pub archive_partial_batches: Option<bool>,
}

impl CaptureConfig {
    /// Directory that holds one subdirectory per batch.
    pub fn base_dir(&self) -> Result<PathBuf> {
        match self.base_dir.as_deref() {
            Some(dir) => Ok(expand_home(dir)),
            None => dirs::home_dir()
                .map(|home| home.join(DEFAULT_BASE_DIR_NAME))
                .context("Could not determine home directory for capture.base_dir"),
        }
    }

    pub fn cadence(&self) -> Duration {
        Duration::from_secs(self.cadence.unwrap_or(DEFAULT_CADENCE_SECS))
    }

    pub fn awake_interval_mode(&self) -> AwakeIntervalMode {
        self.awake_interval.unwrap_or_default()
    }

    pub fn archive_partial_batches(&self) -> bool {
        self.archive_partial_batches
            .unwrap_or(DEFAULT_ARCHIVE_PARTIAL_BATCHES)
    }
}

/// Camera sensor settings, applied once per batch.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct CameraConfig {
    pub command: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub framerate: Option<f64>,
    pub hflip: Option<bool>,
    pub vflip: Option<bool>,
    pub metering: Option<MeteringMode>,
    pub iso: Option<u32>,
    pub awb: Option<WhiteBalanceMode>,
    pub awb_gains: Option<Vec<f32>>, // [red, blue]
    pub warmup: Option<u64>,         // seconds
    pub extension: Option<String>,
}

impl CameraConfig {
    pub fn command(&self) -> String {
        self.command
            .clone()
            .unwrap_or_else(|| DEFAULT_CAMERA_COMMAND.to_string())
    }

    pub fn settings(&self) -> CameraSettings {
        let defaults = CameraSettings::default();
        CameraSettings {
            width: self.width.unwrap_or(defaults.width),
            height: self.height.unwrap_or(defaults.height),
            framerate: self.framerate.unwrap_or(defaults.framerate),
            hflip: self.hflip.unwrap_or(defaults.hflip),
            vflip: self.vflip.unwrap_or(defaults.vflip),
            metering: self.metering.unwrap_or(defaults.metering),
            iso: self.iso.unwrap_or(defaults.iso),
            awb: self.awb.unwrap_or(defaults.awb),
            awb_gains: match self.awb_gains.as_deref() {
                Some([red, blue]) => Some((*red, *blue)),
                _ => defaults.awb_gains,
            },
            warmup: self
                .warmup
                .map(Duration::from_secs)
                .unwrap_or(defaults.warmup),
            extension: self.extension.clone().unwrap_or(defaults.extension),
        }
    }
}

/// Remote archival settings. Archival is disabled when `host` is unset.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct ArchiveConfig {
    pub host: Option<String>,
    pub remote_dir: Option<String>,
    pub port: Option<u16>,
    pub identity_file: Option<String>,
    pub timeout: Option<u64>, // seconds per remote command
    pub max_retries: Option<u32>,
    pub retry_backoff: Option<u64>, // seconds before the first retry
    pub retry_multiplier: Option<f64>,
}

impl ArchiveConfig {
    /// Remote destination, or `None` when archival is not configured.
    pub fn target(&self) -> Option<RemoteTarget> {
        let host = self.host.as_deref()?;
        Some(RemoteTarget::new(
            host,
            self.remote_dir.as_deref().unwrap_or("."),
        ))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.unwrap_or(DEFAULT_REMOTE_TIMEOUT_SECS))
    }

    pub fn identity_file(&self) -> Option<PathBuf> {
        self.identity_file.as_deref().map(expand_home)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            initial_backoff: Duration::from_secs(
                self.retry_backoff.unwrap_or(DEFAULT_RETRY_BACKOFF_SECS),
            ),
            multiplier: self.retry_multiplier.unwrap_or(DEFAULT_RETRY_MULTIPLIER),
        }
    }
}

/// Persistent log settings.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct LoggingConfig {
    pub file: Option<String>,
    pub debug: Option<bool>,
}

impl LoggingConfig {
    pub fn file(&self) -> Option<PathBuf> {
        self.file.as_deref().map(expand_home)
    }
}

/// Configuration structure for longlapse.
///
/// Sections map one-to-one onto the TOML tables. All sections may be omitted.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration using the module's load function
    pub fn load() -> Result<Self> {
        load()
    }

    /// Load from path using the module's load_from_path function
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        load_from_path(path)
    }

    /// Get configuration path using the module's get_config_path function
    pub fn get_config_path() -> Result<PathBuf> {
        get_config_path()
    }

    pub fn log_config(&self) {
        let source = Self::get_config_path()
            .map(|p| private_path(&p))
            .unwrap_or_else(|_| "defaults".to_string());
        log_block_start!("Loaded configuration from {}", source);

        let lat = self.location.latitude.unwrap_or(DEFAULT_LATITUDE);
        let lon = self.location.longitude.unwrap_or(DEFAULT_LONGITUDE);
        let lat_dir = if lat >= 0.0 { "N" } else { "S" };
        let lon_dir = if lon >= 0.0 { "E" } else { "W" };
        log_indented!(
            "Location: {:.4}°{}, {:.4}°{} @ {} m",
            lat.abs(),
            lat_dir,
            lon.abs(),
            lon_dir,
            self.location.elevation.unwrap_or(DEFAULT_ELEVATION_M)
        );
        log_indented!(
            "Horizon: {}° (pressure {} mbar)",
            self.location.horizon.unwrap_or(DEFAULT_HORIZON_DEG),
            self.location.pressure.unwrap_or(DEFAULT_PRESSURE_MBAR)
        );
        log_indented!(
            "Cadence: {} seconds ({} awake interval)",
            self.capture.cadence().as_secs(),
            self.capture.awake_interval_mode()
        );
        if let Ok(base_dir) = self.capture.base_dir() {
            log_indented!("Batches: {}", private_path(&base_dir));
        }

        let camera = self.camera.settings();
        log_indented!(
            "Camera: {}x{} @ ISO {}, metering {}, awb {}",
            camera.width,
            camera.height,
            camera.iso,
            camera.metering.as_str(),
            camera.awb.as_str()
        );

        match self.archive.target() {
            Some(target) => {
                let retry = self.archive.retry_policy();
                log_indented!("Archive: {}:{}", target.host, target.base_dir);
                if retry.max_retries > 0 {
                    log_indented!(
                        "Retries: {} (backoff {}s x{})",
                        retry.max_retries,
                        retry.initial_backoff.as_secs(),
                        retry.multiplier
                    );
                }
            }
            None => log_indented!("Archive: disabled"),
        }
    }
}

/// Expand a leading `~/` to the home directory.
pub(crate) fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests;
