// BattScan - util/constants.rs
//
// Single source of truth for the log naming convention, the body markers
// the parser recognises, output formatting, and persisted file names.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "BattScan";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "BattScan";

/// Current application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Log file naming convention
// =============================================================================

/// Canonical vendor prefix of dumpstate diagnostic log names
/// (matched case-insensitively).
pub const DUMPSTATE_PREFIX: &str = "dumpState_";

/// Log file extension. Also the permissive last-resort discovery match when
/// no canonically named file exists anywhere in the folder.
pub const LOG_EXTENSION: &str = ".log";

// =============================================================================
// Log body markers
// =============================================================================

/// Primary (calibrated) battery health metric, in percent.
pub const ASOC_MARKER: &str = "mSavedBatteryAsoc:";

/// Secondary battery health estimate, in percent.
pub const BSOH_MARKER: &str = "mSavedBatteryBsoh:";

/// Accumulated battery usage in milli-cycles.
pub const USAGE_MARKER: &str = "mSavedBatteryUsage:";

/// Divisor converting the usage marker's milli-units into whole cycles.
pub const USAGE_MILLI_DIVISOR: i32 = 1000;

/// Header line of the battery backup record block.
pub const BACKUP_HEADER: &str = "BatteryInfoBackUp";

/// Header line of the battery service dump block.
pub const BATTERY_DUMP_HEADER: &str = "DUMP OF SERVICE battery:";

/// Generic service dump marker. A line containing this but not
/// `BATTERY_DUMP_HEADER` means a different service's dump begins.
pub const SERVICE_DUMP_MARKER: &str = "DUMP OF SERVICE";

// =============================================================================
// Section output format
// =============================================================================

/// Divider run printed on either side of a section label.
pub const SECTION_DIVIDER: &str = "━━━";

/// Placeholder emitted when a log contains no recognisable battery sections.
pub const NO_SECTIONS_PLACEHOLDER: &str = "(no battery sections found)";

// =============================================================================
// Document Index mime types
// =============================================================================

/// Mime type reported by the Document Index for directory entries.
pub const MIME_TYPE_DIR: &str = "inode/directory";

/// Mime type reported by the Document Index for regular files.
pub const MIME_TYPE_FILE: &str = "text/plain";

// =============================================================================
// Persistence
// =============================================================================

/// Cached telemetry file name (stored in the platform data directory).
pub const CACHE_FILE_NAME: &str = "telemetry_cache.json";

/// Configuration file name (stored in the platform config directory).
pub const CONFIG_FILE_NAME: &str = "config.toml";

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";
