use super::loading::parse_config;
use super::validation::validate_config;
use super::*;
use serial_test::serial;
use std::fs;
use tempfile::tempdir;

fn with_config_home<T>(dir: &std::path::Path, f: impl FnOnce() -> T) -> T {
    let original = std::env::var("XDG_CONFIG_HOME").ok();
    unsafe {
        std::env::set_var("XDG_CONFIG_HOME", dir);
    }

    let result = f();

    unsafe {
        match original {
            Some(val) => std::env::set_var("XDG_CONFIG_HOME", val),
            None => std::env::remove_var("XDG_CONFIG_HOME"),
        }
    }
    result
}

#[test]
#[serial]
fn test_config_load_default_creation() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("longlapse").join("longlapse.toml");

    let result = with_config_home(temp_dir.path(), Config::load);

    if let Err(e) = &result {
        eprintln!("Config::load() failed: {:?}", e);
    }
    let config = result.unwrap();
    assert!(config_path.exists());
    assert_eq!(config.capture.cadence(), Duration::from_secs(DEFAULT_CADENCE_SECS));
    assert!(config.archive.target().is_none());
}

#[test]
#[serial]
fn test_config_load_existing_file() {
    let temp_dir = tempdir().unwrap();
    let config_dir = temp_dir.path().join("longlapse");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("longlapse.toml"),
        "[capture]\ncadence = 300\n\n[archive]\nhost = \"pi@archive\"\nremote_dir = \"/srv/frames\"\n",
    )
    .unwrap();

    let config = with_config_home(temp_dir.path(), Config::load).unwrap();

    assert_eq!(config.capture.cadence(), Duration::from_secs(300));
    let target = config.archive.target().unwrap();
    assert_eq!(target.host, "pi@archive");
    assert_eq!(target.base_dir, "/srv/frames");
}

#[test]
fn test_default_config_content_parses() {
    let content = builder::default_config_content();
    let config = parse_config(&content).unwrap();

    assert_eq!(config.location.latitude, Some(DEFAULT_LATITUDE));
    assert_eq!(config.location.longitude, Some(DEFAULT_LONGITUDE));
    assert_eq!(config.location.horizon, Some(DEFAULT_HORIZON_DEG));
    assert_eq!(config.capture.awake_interval_mode(), AwakeIntervalMode::Daylight);
    assert_eq!(config.camera.settings(), CameraSettings::default());
    assert_eq!(config.archive.retry_policy(), RetryPolicy::default());
    assert!(config.archive.host.is_none());
    assert_eq!(config.logging.debug, Some(false));
}

#[test]
fn test_empty_config_uses_defaults() {
    let config = parse_config("").unwrap();
    assert_eq!(config, Config::default());

    let location = config.location.observer().unwrap();
    assert_eq!(location.latitude, DEFAULT_LATITUDE);
    assert_eq!(location.horizon, DEFAULT_HORIZON_DEG);
    assert_eq!(config.camera.command(), DEFAULT_CAMERA_COMMAND);
    assert!(!config.capture.archive_partial_batches());
}

#[test]
fn test_load_from_missing_path() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("missing.toml");
    let err = Config::load_from_path(&path).unwrap_err();
    assert!(err.to_string().contains("Configuration file not found"));
}

#[test]
fn test_load_from_path_reports_parse_errors() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("longlapse.toml");
    fs::write(&path, "[capture]\ncadence = \"often\"\n").unwrap();

    let err = Config::load_from_path(&path).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to parse config"));
}

#[test]
fn test_camera_settings_from_config() {
    let config = parse_config(
        r#"
[camera]
width = 1920
height = 1080
hflip = false
metering = "spot"
iso = 400
awb = "daylight"
awb_gains = [1.5, 1.2]
warmup = 2
extension = "png"
"#,
    )
    .unwrap();

    let settings = config.camera.settings();
    assert_eq!(settings.width, 1920);
    assert_eq!(settings.height, 1080);
    assert!(!settings.hflip);
    assert!(settings.vflip);
    assert_eq!(settings.metering, MeteringMode::Spot);
    assert_eq!(settings.iso, 400);
    assert_eq!(settings.awb, WhiteBalanceMode::Daylight);
    assert_eq!(settings.awb_gains, Some((1.5, 1.2)));
    assert_eq!(settings.warmup, Duration::from_secs(2));
    assert_eq!(settings.extension, "png");
}

#[test]
fn test_retry_policy_from_config() {
    let config = parse_config(
        "[archive]\nhost = \"pi@archive\"\nmax_retries = 3\nretry_backoff = 10\nretry_multiplier = 1.5\n",
    )
    .unwrap();

    let policy = config.archive.retry_policy();
    assert_eq!(policy.max_retries, 3);
    assert_eq!(policy.initial_backoff, Duration::from_secs(10));
    assert_eq!(policy.multiplier, 1.5);
}

#[test]
fn test_archive_target_defaults_remote_dir() {
    let config = parse_config("[archive]\nhost = \"pi@archive\"\n").unwrap();
    let target = config.archive.target().unwrap();
    assert_eq!(target.base_dir, ".");
    assert_eq!(config.archive.timeout(), Duration::from_secs(DEFAULT_REMOTE_TIMEOUT_SECS));
}

#[test]
fn test_explicit_timezone_wins() {
    let config = parse_config(
        "[location]\nlatitude = 47.7\nlongitude = -122.4\ntimezone = \"Europe/Berlin\"\n",
    )
    .unwrap();
    let location = config.location.observer().unwrap();
    assert_eq!(
        config.location.resolve_timezone(&location).unwrap(),
        chrono_tz::Europe::Berlin
    );
}

#[test]
fn test_timezone_detected_from_coordinates() {
    let config = parse_config("[location]\nlatitude = 47.7\nlongitude = -122.4\n").unwrap();
    let location = config.location.observer().unwrap();
    assert_eq!(
        config.location.resolve_timezone(&location).unwrap(),
        chrono_tz::America::Los_Angeles
    );
}

#[test]
fn test_expand_home() {
    if let Some(home) = dirs::home_dir() {
        assert_eq!(expand_home("~/frames"), home.join("frames"));
    }
    assert_eq!(expand_home("/srv/frames"), PathBuf::from("/srv/frames"));
    assert_eq!(expand_home("frames/~"), PathBuf::from("frames/~"));
}

#[test]
fn test_validation_rejects_bad_location() {
    for content in [
        "[location]\nlatitude = 91.0\n",
        "[location]\nlongitude = -181.0\n",
        "[location]\npressure = 2000.0\n",
        "[location]\nhorizon = -30.0\n",
        "[location]\ntimezone = \"Mars/Olympus_Mons\"\n",
    ] {
        assert!(parse_config(content).is_err(), "accepted: {content}");
    }
}

#[test]
fn test_validation_rejects_bad_capture_and_camera() {
    for content in [
        "[capture]\ncadence = 0\n",
        "[capture]\ncadence = 7200\n",
        "[capture]\nbase_dir = \"  \"\n",
        "[camera]\nwidth = 0\n",
        "[camera]\nframerate = 0.0\n",
        "[camera]\niso = 50\n",
        "[camera]\nawb_gains = [1.5]\n",
        "[camera]\nawb_gains = [1.5, -1.0]\n",
        "[camera]\nwarmup = 120\n",
        "[camera]\nextension = \"gif\"\n",
        "[camera]\ncommand = \"\"\n",
    ] {
        assert!(parse_config(content).is_err(), "accepted: {content}");
    }
}

#[test]
fn test_validation_rejects_bad_archive() {
    for content in [
        "[archive]\nhost = \"\"\n",
        "[archive]\nhost = \"-oProxyCommand=x\"\n",
        "[archive]\nremote_dir = \"/srv/frames\"\n",
        "[archive]\nhost = \"pi@archive\"\nremote_dir = \"/srv/my frames\"\n",
        "[archive]\nhost = \"pi@archive\"\nremote_dir = \"/srv/$(reboot)\"\n",
        "[archive]\nhost = \"pi@archive\"\ntimeout = 0\n",
        "[archive]\nhost = \"pi@archive\"\nmax_retries = 11\n",
        "[archive]\nhost = \"pi@archive\"\nretry_multiplier = 0.5\n",
    ] {
        assert!(parse_config(content).is_err(), "accepted: {content}");
    }
}

#[test]
fn test_validation_error_messages() {
    let err = parse_config("[capture]\ncadence = 0\n").unwrap_err();
    assert!(err.to_string().contains("cadence (0 seconds)"));

    let err = parse_config("[archive]\nremote_dir = \"/srv\"\n").unwrap_err();
    assert!(err.to_string().contains("archive host is missing"));
}

#[test]
fn test_validate_config_accepts_defaults() {
    assert!(validate_config(&Config::default()).is_ok());
}
