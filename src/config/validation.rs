//! Configuration validation functionality.
//!
//! Rejects values that would make the day's run impossible or unsafe, such as
//! coordinates off the globe, a zero cadence, or remote paths the copy step
//! cannot address.

use anyhow::Result;

use super::Config;
use crate::common::constants::*;

/// Validate every section of a parsed configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_location(config)?;
    validate_capture(config)?;
    validate_camera(config)?;
    validate_archive(config)?;
    Ok(())
}

fn validate_location(config: &Config) -> Result<()> {
    let location = &config.location;

    if let Some(lat) = location.latitude
        && !(-90.0..=90.0).contains(&lat)
    {
        anyhow::bail!("latitude must be between -90 and 90 degrees (got {})", lat);
    }

    if let Some(lon) = location.longitude
        && !(-180.0..=180.0).contains(&lon)
    {
        anyhow::bail!(
            "longitude must be between -180 and 180 degrees (got {})",
            lon
        );
    }

    if let Some(elevation) = location.elevation
        && !elevation.is_finite()
    {
        anyhow::bail!("elevation must be a finite number of meters");
    }

    if let Some(pressure) = location.pressure
        && !(0.0..=MAXIMUM_PRESSURE_MBAR).contains(&pressure)
    {
        anyhow::bail!(
            "pressure ({} mbar) must be between 0 and {} mbar",
            pressure,
            MAXIMUM_PRESSURE_MBAR
        );
    }

    if let Some(horizon) = location.horizon
        && !(MINIMUM_HORIZON_DEG..=MAXIMUM_HORIZON_DEG).contains(&horizon)
    {
        anyhow::bail!(
            "horizon ({}°) must be between {}° and {}°",
            horizon,
            MINIMUM_HORIZON_DEG,
            MAXIMUM_HORIZON_DEG
        );
    }

    if let Some(ref tz) = location.timezone
        && tz.parse::<chrono_tz::Tz>().is_err()
    {
        anyhow::bail!("timezone '{}' is not a known IANA timezone", tz);
    }

    Ok(())
}

fn validate_capture(config: &Config) -> Result<()> {
    if let Some(cadence) = config.capture.cadence
        && !(MINIMUM_CADENCE_SECS..=MAXIMUM_CADENCE_SECS).contains(&cadence)
    {
        anyhow::bail!(
            "cadence ({} seconds) must be between {} and {} seconds",
            cadence,
            MINIMUM_CADENCE_SECS,
            MAXIMUM_CADENCE_SECS
        );
    }

    if let Some(ref base_dir) = config.capture.base_dir
        && base_dir.trim().is_empty()
    {
        anyhow::bail!("base_dir must not be empty");
    }

    Ok(())
}

fn validate_camera(config: &Config) -> Result<()> {
    let camera = &config.camera;

    if camera.width == Some(0) || camera.height == Some(0) {
        anyhow::bail!("camera width and height must be greater than zero");
    }

    if let Some(framerate) = camera.framerate
        && !(framerate > 0.0 && framerate.is_finite())
    {
        anyhow::bail!("camera framerate must be greater than zero (got {})", framerate);
    }

    if let Some(iso) = camera.iso
        && !(MINIMUM_CAMERA_ISO..=MAXIMUM_CAMERA_ISO).contains(&iso)
    {
        anyhow::bail!(
            "camera iso ({}) must be between {} and {}",
            iso,
            MINIMUM_CAMERA_ISO,
            MAXIMUM_CAMERA_ISO
        );
    }

    if let Some(ref gains) = camera.awb_gains {
        if gains.len() != 2 {
            anyhow::bail!(
                "awb_gains must contain exactly two values [red, blue] (got {})",
                gains.len()
            );
        }
        if gains.iter().any(|g| !(*g > 0.0 && g.is_finite())) {
            anyhow::bail!("awb_gains values must be greater than zero");
        }
    }

    if let Some(warmup) = camera.warmup
        && warmup > MAXIMUM_CAMERA_WARMUP_SECS
    {
        anyhow::bail!(
            "camera warmup ({} seconds) must not exceed {} seconds",
            warmup,
            MAXIMUM_CAMERA_WARMUP_SECS
        );
    }

    if let Some(ref extension) = camera.extension
        && !matches!(extension.as_str(), "jpg" | "png" | "bmp")
    {
        anyhow::bail!(
            "camera extension must be \"jpg\", \"png\" or \"bmp\" (got \"{}\")",
            extension
        );
    }

    if let Some(ref command) = camera.command
        && command.trim().is_empty()
    {
        anyhow::bail!("camera command must not be empty");
    }

    Ok(())
}

fn validate_archive(config: &Config) -> Result<()> {
    let archive = &config.archive;

    if let Some(ref host) = archive.host
        && (host.trim().is_empty() || host.contains(char::is_whitespace) || host.starts_with('-'))
    {
        anyhow::bail!("archive host '{}' is not a valid SSH destination", host);
    }

    if archive.remote_dir.is_some() && archive.host.is_none() {
        anyhow::bail!("archive remote_dir is set but archive host is missing");
    }

    // scp hands the remote path to the remote side unquoted
    if let Some(ref dir) = archive.remote_dir
        && (dir.is_empty() || dir.chars().any(|c| c.is_whitespace() || "'\"`$;&|\\".contains(c)))
    {
        anyhow::bail!(
            "archive remote_dir '{}' must be non-empty and free of whitespace and shell metacharacters",
            dir
        );
    }

    if let Some(timeout) = archive.timeout
        && !(1..=MAXIMUM_REMOTE_TIMEOUT_SECS).contains(&timeout)
    {
        anyhow::bail!(
            "archive timeout ({} seconds) must be between 1 and {} seconds",
            timeout,
            MAXIMUM_REMOTE_TIMEOUT_SECS
        );
    }

    if let Some(retries) = archive.max_retries
        && retries > MAXIMUM_RETRIES
    {
        anyhow::bail!(
            "archive max_retries ({}) must not exceed {}",
            retries,
            MAXIMUM_RETRIES
        );
    }

    if let Some(multiplier) = archive.retry_multiplier
        && !(1.0..=10.0).contains(&multiplier)
    {
        anyhow::bail!(
            "archive retry_multiplier ({}) must be between 1.0 and 10.0",
            multiplier
        );
    }

    Ok(())
}
