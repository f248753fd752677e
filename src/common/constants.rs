//! Application-wide constants and defaults.
//!
//! Defaults describe the first deployment: a north-Seattle rooftop camera
//! shooting once a minute at full sensor resolution, with the civil-twilight
//! horizon so the first and last frames still carry usable light.

// # Observer location defaults
pub const DEFAULT_LATITUDE: f64 = 47.734_417; // 47:44:03.9
pub const DEFAULT_LONGITUDE: f64 = -122.355_417; // -122:21:19.5
pub const DEFAULT_ELEVATION_M: f64 = 145.0;
pub const DEFAULT_PRESSURE_MBAR: f64 = 0.0; // 0 disables refraction
pub const DEFAULT_HORIZON_DEG: f64 = -6.0;

/// Standard atmosphere used to scale the horizon refraction correction.
pub const STANDARD_PRESSURE_MBAR: f64 = 1010.0;
/// Refraction at the horizon under standard pressure, in degrees (34').
pub const HORIZON_REFRACTION_DEG: f64 = 34.0 / 60.0;

pub const MINIMUM_HORIZON_DEG: f64 = -18.0;
pub const MAXIMUM_HORIZON_DEG: f64 = 10.0;
pub const MAXIMUM_PRESSURE_MBAR: f64 = 1100.0;

// # Capture defaults
pub const DEFAULT_CADENCE_SECS: u64 = 60;
pub const MINIMUM_CADENCE_SECS: u64 = 1;
pub const MAXIMUM_CADENCE_SECS: u64 = 3600;
pub const DEFAULT_AWAKE_INTERVAL_MODE: &str = "daylight";
pub const DEFAULT_ARCHIVE_PARTIAL_BATCHES: bool = false;

/// Frame counters are zero-padded to this many digits.
pub const FRAME_COUNTER_WIDTH: usize = 3;
/// Largest frame index that still fits the padded counter.
pub const FRAME_COUNTER_MAX: u32 = 999;

pub const BATCH_DATE_FORMAT: &str = "%Y-%m-%d";
pub const FRAME_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M";

// # Camera defaults
pub const DEFAULT_CAMERA_WIDTH: u32 = 2592;
pub const DEFAULT_CAMERA_HEIGHT: u32 = 1944;
pub const DEFAULT_CAMERA_FRAMERATE: f64 = 1.0;
pub const DEFAULT_CAMERA_HFLIP: bool = true;
pub const DEFAULT_CAMERA_VFLIP: bool = true;
pub const DEFAULT_CAMERA_METERING: &str = "centre";
pub const DEFAULT_CAMERA_ISO: u32 = 100;
pub const DEFAULT_CAMERA_AWB: &str = "auto";
pub const DEFAULT_CAMERA_WARMUP_SECS: u64 = 5;
pub const DEFAULT_CAMERA_EXTENSION: &str = "jpg";
pub const DEFAULT_CAMERA_COMMAND: &str = "rpicam-still";

pub const MINIMUM_CAMERA_ISO: u32 = 100;
pub const MAXIMUM_CAMERA_ISO: u32 = 1600;
pub const MAXIMUM_CAMERA_WARMUP_SECS: u64 = 60;

/// How long to wait for a triggered frame to land in the staging directory.
pub const FRAME_ARRIVAL_TIMEOUT_MS: u64 = 30_000;
pub const FRAME_ARRIVAL_POLL_MS: u64 = 50;
/// Grace period for the capture process to exit after SIGUSR2.
pub const CAMERA_SHUTDOWN_TIMEOUT_MS: u64 = 3_000;
pub const STAGING_DIR_NAME: &str = ".staging";

// # Archive defaults
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 120;
pub const MAXIMUM_REMOTE_TIMEOUT_SECS: u64 = 3600;
pub const DEFAULT_MAX_RETRIES: u32 = 0;
pub const MAXIMUM_RETRIES: u32 = 10;
pub const DEFAULT_RETRY_BACKOFF_SECS: u64 = 5;
pub const DEFAULT_RETRY_MULTIPLIER: f64 = 2.0;
pub const SSH_CONNECT_TIMEOUT_SECS: u64 = 15;
/// Interval for polling a child process for exit.
pub const CHILD_POLL_INTERVAL_MS: u64 = 100;

// # Timer behavior
/// Upper bound for a single blocking wait before the clock is re-read.
pub const WAIT_CHUNK_MS: u64 = 1_000;

// # Paths
pub const CONFIG_DIR_NAME: &str = "longlapse";
pub const CONFIG_FILE_NAME: &str = "longlapse.toml";
pub const REPORTS_DIR_NAME: &str = "reports";
pub const LOCK_FILE_NAME: &str = "longlapse.lock";
pub const DEFAULT_BASE_DIR_NAME: &str = "longlapse";

// # Exit codes
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
