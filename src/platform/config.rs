// BattScan - platform/config.rs
//
// Platform directory resolution and config.toml handling.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance. The config remembers the granted source
// folder between runs; everything else has sensible defaults.

use crate::util::constants;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for BattScan data and configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/battscan/).
    pub config_dir: PathBuf,

    /// Data directory for the result cache.
    pub data_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to the current directory if platform dirs cannot be
    /// determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            let data_dir = proj_dirs.data_dir().to_path_buf();
            tracing::debug!(
                config = %config_dir.display(),
                data = %data_dir.display(),
                "Platform paths resolved"
            );
            Self {
                config_dir,
                data_dir,
            }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            let fallback = PathBuf::from(".");
            Self {
                config_dir: fallback.clone(),
                data_dir: fallback,
            }
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }
}

// =============================================================================
// config.toml
// =============================================================================

/// Raw shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility -- a newer
/// config file can be used with an older binary without crashing.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[scan]` section.
    pub scan: ScanSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[scan]` config section.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ScanSection {
    /// Remembered source folder, set via `--remember`.
    pub folder: Option<PathBuf>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Remembered source folder from the last `--remember` run.
    pub folder: Option<PathBuf>,

    /// Logging level string (consumed before tracing is initialised).
    pub log_level: Option<String>,
}

const VALID_LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Load and validate `config.toml` from `config_path`.
///
/// Returns the validated config plus a list of non-fatal warnings. A missing
/// file is a normal first run and yields defaults with no warnings; an
/// unparseable file yields defaults with a warning -- the tool still runs,
/// but the user is informed.
pub fn load_config(config_path: &Path) -> (AppConfig, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), warnings);
    }

    let content = match std::fs::read_to_string(config_path) {
        Ok(c) => c,
        Err(e) => {
            let msg = format!(
                "Could not read config file '{}': {e}. Using defaults.",
                config_path.display()
            );
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    let raw: RawConfig = match toml::from_str(&content) {
        Ok(r) => r,
        Err(e) => {
            let msg = format!(
                "Failed to parse config file '{}': {e}. Using defaults.",
                config_path.display()
            );
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    let mut config = AppConfig {
        folder: raw.scan.folder,
        log_level: None,
    };

    if let Some(level) = raw.logging.level {
        if VALID_LOG_LEVELS.contains(&level.as_str()) {
            config.log_level = Some(level);
        } else {
            warnings.push(format!(
                "[logging] level = '{level}' is not one of {VALID_LOG_LEVELS:?}. \
                 Using default ('{}').",
                constants::DEFAULT_LOG_LEVEL
            ));
        }
    }

    (config, warnings)
}

/// Persist `raw` to `config_path` atomically (write temp -> rename).
pub fn save_config(raw: &RawConfig, config_path: &Path) -> Result<(), String> {
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            format!(
                "cannot create config directory '{}': {e}",
                parent.display()
            )
        })?;
    }

    let content =
        toml::to_string_pretty(raw).map_err(|e| format!("failed to serialise config: {e}"))?;

    let tmp = config_path.with_extension("toml.tmp");
    std::fs::write(&tmp, content.as_bytes())
        .map_err(|e| format!("failed to write config temp file '{}': {e}", tmp.display()))?;

    std::fs::rename(&tmp, config_path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        format!(
            "failed to finalise config file '{}': {e}",
            config_path.display()
        )
    })?;

    tracing::debug!(path = %config_path.display(), "Config saved");
    Ok(())
}

// =============================================================================
// Unit tests
// =============================================================================
