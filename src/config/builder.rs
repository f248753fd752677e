//! Default configuration file generation.
//!
//! Writes a commented `longlapse.toml` with every setting spelled out, aligned
//! so the comments form a column.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::common::constants::*;
use crate::common::utils::private_path;

/// Create a default config file at `path`, creating parent directories.
pub fn create_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    fs::write(path, default_config_content())
        .with_context(|| format!("Failed to write default config to {}", private_path(path)))?;

    log_block_start!("Created default configuration");
    log_indented!("{}", private_path(path));
    log_indented!("Set [archive] host and remote_dir to enable remote archival");

    Ok(())
}

/// Render the default configuration text.
pub fn default_config_content() -> String {
    let content = ConfigBuilder::new()
        .add_section("location")
        .add_setting(
            "latitude",
            &format!("{DEFAULT_LATITUDE:.6}"),
            "Geographic latitude (-90 to 90)",
        )
        .add_setting(
            "longitude",
            &format!("{DEFAULT_LONGITUDE:.6}"),
            "Geographic longitude (-180 to 180)",
        )
        .add_setting(
            "elevation",
            &format!("{DEFAULT_ELEVATION_M:.1}"),
            "Observer elevation in meters",
        )
        .add_setting(
            "pressure",
            &format!("{DEFAULT_PRESSURE_MBAR:.1}"),
            &format!("Atmospheric pressure in mbar (0-{MAXIMUM_PRESSURE_MBAR} | 0 = no refraction)"),
        )
        .add_setting(
            "horizon",
            &format!("{DEFAULT_HORIZON_DEG:.1}"),
            &format!(
                "Sun elevation counted as sunrise/sunset ({MINIMUM_HORIZON_DEG} to {MAXIMUM_HORIZON_DEG} degrees)"
            ),
        )
        .add_comment("timezone = \"America/Los_Angeles\"", "IANA zone, detected from coordinates when unset")
        .add_section("capture")
        .add_comment("base_dir = \"~/longlapse\"", "Local directory holding one folder per day")
        .add_setting(
            "cadence",
            &DEFAULT_CADENCE_SECS.to_string(),
            &format!(
                "Seconds between frames, aligned to the clock ({MINIMUM_CADENCE_SECS}-{MAXIMUM_CADENCE_SECS})"
            ),
        )
        .add_setting(
            "awake_interval",
            &format!("\"{DEFAULT_AWAKE_INTERVAL_MODE}\""),
            "\"daylight\" (sunrise to sunset) or \"legacy\" (next sunrise - next sunset)",
        )
        .add_setting(
            "archive_partial_batches",
            &DEFAULT_ARCHIVE_PARTIAL_BATCHES.to_string(),
            "Archive frames captured before a camera fault",
        )
        .add_section("camera")
        .add_setting(
            "command",
            &format!("\"{DEFAULT_CAMERA_COMMAND}\""),
            "Still capture program (rpicam-still or libcamera-still)",
        )
        .add_setting("width", &DEFAULT_CAMERA_WIDTH.to_string(), "Frame width in pixels")
        .add_setting("height", &DEFAULT_CAMERA_HEIGHT.to_string(), "Frame height in pixels")
        .add_setting(
            "framerate",
            &format!("{DEFAULT_CAMERA_FRAMERATE:.1}"),
            "Sensor frame rate, bounds the longest exposure",
        )
        .add_setting("hflip", &DEFAULT_CAMERA_HFLIP.to_string(), "Mirror horizontally")
        .add_setting("vflip", &DEFAULT_CAMERA_VFLIP.to_string(), "Mirror vertically")
        .add_setting(
            "metering",
            &format!("\"{DEFAULT_CAMERA_METERING}\""),
            "\"centre\", \"spot\", \"average\" or \"custom\"",
        )
        .add_setting(
            "iso",
            &DEFAULT_CAMERA_ISO.to_string(),
            &format!("Sensor sensitivity ({MINIMUM_CAMERA_ISO}-{MAXIMUM_CAMERA_ISO})"),
        )
        .add_setting(
            "awb",
            &format!("\"{DEFAULT_CAMERA_AWB}\""),
            "White balance: auto, daylight, cloudy, tungsten, ...",
        )
        .add_comment("awb_gains = [1.5, 1.2]", "Fixed red/blue gains, disables auto white balance")
        .add_setting(
            "warmup",
            &DEFAULT_CAMERA_WARMUP_SECS.to_string(),
            "Seconds to let exposure settle after opening the camera",
        )
        .add_setting(
            "extension",
            &format!("\"{DEFAULT_CAMERA_EXTENSION}\""),
            "Output encoding: jpg, png or bmp",
        )
        .add_section("archive")
        .add_comment("host = \"user@archive.local\"", "SSH destination; archival is off when unset")
        .add_comment("remote_dir = \"/srv/longlapse\"", "Remote directory receiving one folder per day")
        .add_comment("port = 22", "SSH port")
        .add_comment("identity_file = \"~/.ssh/id_ed25519\"", "SSH private key")
        .add_setting(
            "timeout",
            &DEFAULT_REMOTE_TIMEOUT_SECS.to_string(),
            "Seconds allowed per remote command or file copy",
        )
        .add_setting(
            "max_retries",
            &DEFAULT_MAX_RETRIES.to_string(),
            &format!("Retries per failed file copy (0-{MAXIMUM_RETRIES})"),
        )
        .add_setting(
            "retry_backoff",
            &DEFAULT_RETRY_BACKOFF_SECS.to_string(),
            "Seconds before the first retry",
        )
        .add_setting(
            "retry_multiplier",
            &format!("{DEFAULT_RETRY_MULTIPLIER:.1}"),
            "Backoff growth factor per retry",
        )
        .add_section("logging")
        .add_comment("file = \"~/longlapse/longlapse.log\"", "Append the run log to this file")
        .add_setting("debug", "false", "Show detailed operations")
        .build();

    format!("{content}\n")
}

/// Builder for formatted configuration output with aligned comments.
struct ConfigBuilder {
    entries: Vec<ConfigEntry>,
}

struct ConfigEntry {
    content: String,
    entry_type: EntryType,
}

enum EntryType {
    Section,
    Setting { line: String, comment: String },
}

impl ConfigBuilder {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn add_section(mut self, title: &str) -> Self {
        self.entries.push(ConfigEntry {
            content: format!("[{title}]"),
            entry_type: EntryType::Section,
        });
        self
    }

    fn add_setting(mut self, key: &str, value: &str, comment: &str) -> Self {
        let line = format!("{key} = {value}");
        self.entries.push(ConfigEntry {
            content: line.clone(),
            entry_type: EntryType::Setting {
                line,
                comment: format!("# {comment}"),
            },
        });
        self
    }

    /// Add a commented-out example setting.
    fn add_comment(mut self, example: &str, comment: &str) -> Self {
        let line = format!("# {example}");
        self.entries.push(ConfigEntry {
            content: line.clone(),
            entry_type: EntryType::Setting {
                line,
                comment: format!("# {comment}"),
            },
        });
        self
    }

    fn build(self) -> String {
        let max_width = self
            .entries
            .iter()
            .filter_map(|entry| match &entry.entry_type {
                EntryType::Setting { line, .. } => Some(line.chars().count()),
                EntryType::Section => None,
            })
            .max()
            .unwrap_or(0)
            + 1;

        let mut result = Vec::new();
        let mut first_section = true;

        for entry in self.entries {
            match entry.entry_type {
                EntryType::Section => {
                    if !first_section {
                        result.push(String::new());
                    }
                    result.push(entry.content);
                    first_section = false;
                }
                EntryType::Setting { line, comment } => {
                    let padding = " ".repeat(max_width - line.chars().count());
                    result.push(format!("{line}{padding}{comment}"));
                }
            }
        }

        result.join("\n")
    }
}
