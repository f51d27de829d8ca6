//! Crate-wide defaults and validation bounds.

// === Engine defaults ===

/// Default timeout range when none is configured: 10 seconds, no jitter.
pub const DEFAULT_TIMEOUT_NOMINAL_MS: i64 = 10_000;
pub const DEFAULT_TIMEOUT_TOLERANCE_MS: i64 = 0;

/// Default tripped-duration range: 250 ms, no jitter.
pub const DEFAULT_DURATION_NOMINAL_MS: i64 = 250;
pub const DEFAULT_DURATION_TOLERANCE_MS: i64 = 0;

/// Trip limit of zero means unlimited trips.
pub const TRIP_LIMIT_UNLIMITED: u32 = 0;

// === Drift self-check ===

/// How often an armed calendar trigger re-validates its remaining time.
pub const DEFAULT_DRIFT_CHECK_PERIOD_MS: u64 = 60_000;

/// Largest remaining-time discrepancy tolerated before correcting. Catches
/// clock jumps (DST shifts, suspend/resume) without reacting to timer slop.
pub const DRIFT_TOLERANCE_MS: u64 = 500;

// === Day-of-week numbering (Sunday = 0 .. Saturday = 6) ===

pub const MIN_DAY_NUMBER: u8 = 0;
pub const MAX_DAY_NUMBER: u8 = 6;
pub const DAYS_PER_WEEK: u8 = 7;

// === Clock-time validation bounds ===
// One wider than the semantic range on each side so the sentinel -1 defaults
// of an astronomical time block pass construction.

pub const MINIMUM_HOUR: i32 = -1;
pub const MAXIMUM_HOUR: i32 = 24;
pub const MINIMUM_MINUTE: i32 = -1;
pub const MAXIMUM_MINUTE: i32 = 60;

/// Sentinel hour/minute for "no nominal time derived yet".
pub const SENTINEL_CLOCK_FIELD: i32 = -1;

// === Location bounds ===

pub const MINIMUM_LATITUDE: f64 = -90.0;
pub const MAXIMUM_LATITUDE: f64 = 90.0;
pub const MINIMUM_LONGITUDE: f64 = -180.0;
pub const MAXIMUM_LONGITUDE: f64 = 180.0;

// === Identity ===

/// Characters of the signature hash used for a defaulted display name.
pub const NAME_PREFIX_LENGTH: usize = 8;

/// Identifier sent with astronomical one-day requests (8 characters max).
pub const ASTRO_REQUEST_ID: &str = "tt_trigr";

// === Daemon configuration ===

/// Directory under the user config root holding `config.toml`.
pub const CONFIG_DIR_NAME: &str = "timetriggers";
pub const CONFIG_FILE_NAME: &str = "config.toml";

pub const EXIT_FAILURE: i32 = 1;
