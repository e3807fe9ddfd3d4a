// BattScan - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no platform
// dependencies; these are the shared vocabulary across all layers.

use crate::util::constants;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Log entry (one discovered candidate file)
// =============================================================================

/// An opaque reference to one candidate log file under the granted folder.
///
/// Created fresh on every directory listing and never persisted. The `id` is
/// an opaque locator owned by the `DocumentIndex` that produced it; only that
/// index can turn it back into a byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Opaque locator, valid only with the originating Document Index.
    pub id: String,

    /// Display name, also the parsing-relevant filename.
    pub name: String,

    /// Mime type as reported by the Document Index.
    pub mime_type: String,

    /// Filesystem modification time in epoch millis; 0 when unknown.
    pub last_modified: i64,
}

impl LogEntry {
    /// True when this entry is a directory rather than a file.
    pub fn is_directory(&self) -> bool {
        self.mime_type == constants::MIME_TYPE_DIR
    }
}

// =============================================================================
// Health source
// =============================================================================

/// Which marker field the resolved health percentage came from.
///
/// ASOC is the vendor's primary/calibrated metric and always wins over BSOH,
/// a secondary estimate. The priority order is behavioural, not cosmetic:
/// re-ordering it changes output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HealthSource {
    Asoc,
    Bsoh,
    #[default]
    #[serde(rename = "")]
    None,
}

impl HealthSource {
    /// Human-readable label for display.
    pub fn label(&self) -> &'static str {
        match self {
            HealthSource::Asoc => "ASOC",
            HealthSource::Bsoh => "BSOH",
            HealthSource::None => "",
        }
    }
}

// =============================================================================
// LLB marker type
// =============================================================================

/// Firmware marker kind on the battery assembly-date line:
/// calibration (CAL) or manufacture (MAN) date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum LlbType {
    Cal,
    Man,
    #[default]
    #[serde(rename = "")]
    None,
}

impl LlbType {
    pub fn label(&self) -> &'static str {
        match self {
            LlbType::Cal => "CAL",
            LlbType::Man => "MAN",
            LlbType::None => "",
        }
    }
}

// =============================================================================
// Battery telemetry (parse result)
// =============================================================================

/// Structured telemetry extracted from one dumpstate log.
///
/// Invariant: `success` is true iff at least one of {resolved health, cycle
/// count, install date, presence of an ASOC marker even when unsupported}
/// was observed. An empty or unreadable file never yields `success == true`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatteryTelemetry {
    /// Resolved health percentage (ASOC preferred, BSOH fallback).
    pub health_percent: Option<u32>,

    /// Which marker the resolved health came from.
    pub health_source: HealthSource,

    /// True iff neither ASOC nor BSOH yielded a usable numeric value.
    pub health_unsupported: bool,

    /// Charge cycle count (usage marker divided down from milli-units).
    pub cycle_count: Option<u32>,

    /// Raw text after the ASOC marker, verbatim, for diagnostic display.
    pub asoc_raw: String,

    /// Raw text after the BSOH marker.
    pub bsoh_raw: String,

    /// Raw text after the usage marker.
    pub usage_raw: String,

    /// Kind of the LLB assembly-date marker that supplied the install date.
    pub llb_type: LlbType,

    /// Battery install (calibration or manufacture) date.
    pub install_date: Option<DateTime<Utc>>,

    /// Name of the log file this telemetry was parsed from.
    pub source_file_name: String,

    /// Timestamp of the log itself (body date line, else derived from the
    /// filename's embedded timestamp).
    pub log_timestamp: Option<DateTime<Utc>>,

    /// True when at least one battery field was observed.
    pub success: bool,

    /// I/O failure message when streaming the file failed; empty otherwise.
    pub error_message: String,
}

impl BatteryTelemetry {
    /// Minimal failed result carrying only the source name and a message.
    pub fn failed(source_file_name: &str, error_message: String) -> Self {
        Self {
            source_file_name: source_file_name.to_string(),
            error_message,
            ..Default::default()
        }
    }

    /// Coarse human-readable age of the log relative to `now`
    /// ("just now", "5 mins ago", "3 days ago", ...). Empty when the log
    /// has no timestamp.
    pub fn relative_age(&self, now: DateTime<Utc>) -> String {
        let Some(ts) = self.log_timestamp else {
            return String::new();
        };
        let diff_ms = now.signed_duration_since(ts).num_milliseconds();
        let mins = diff_ms / 60_000;
        let hours = diff_ms / 3_600_000;
        let days = diff_ms / 86_400_000;
        let months = days / 30;
        let years = days / 365;
        let plural = |n: i64| if n == 1 { "" } else { "s" };
        if mins < 1 {
            "just now".to_string()
        } else if mins < 60 {
            format!("{mins} min{} ago", plural(mins))
        } else if hours < 24 {
            format!("{hours} hour{} ago", plural(hours))
        } else if days < 30 {
            format!("{days} day{} ago", plural(days))
        } else if years < 1 {
            format!("{months} month{} ago", plural(months))
        } else {
            format!("{years} year{} ago", plural(years))
        }
    }
}

// =============================================================================
// Cache record (persisted projection)
// =============================================================================

/// Flattened, persisted subset of `BatteryTelemetry`.
///
/// Written only after a successful parse. `file_name` doubles as the cache
/// fingerprint: when it equals the newest candidate's filename, re-parsing
/// is skipped entirely. `source_folder` records which folder the record was
/// parsed from; a record from one folder is never served for another, even
/// when the filenames collide. The raw marker echoes and the LLB kind are
/// display conveniences and are not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub file_name: String,
    #[serde(default)]
    pub source_folder: String,
    #[serde(default)]
    pub log_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub health_percent: Option<u32>,
    #[serde(default)]
    pub health_source: HealthSource,
    #[serde(default)]
    pub health_unsupported: bool,
    #[serde(default)]
    pub cycle_count: Option<u32>,
    #[serde(default)]
    pub install_date: Option<DateTime<Utc>>,
}

impl CacheRecord {
    /// Project `t` into its persisted form, stamped with the folder it was
    /// parsed from.
    pub fn new(t: &BatteryTelemetry, source_folder: &str) -> Self {
        Self {
            file_name: t.source_file_name.clone(),
            source_folder: source_folder.to_string(),
            log_timestamp: t.log_timestamp,
            health_percent: t.health_percent,
            health_source: t.health_source,
            health_unsupported: t.health_unsupported,
            cycle_count: t.cycle_count,
            install_date: t.install_date,
        }
    }

    /// Rehydrate the record into telemetry. A loaded record always reports
    /// `success == true` because only successful parses are ever stored.
    pub fn into_telemetry(self) -> BatteryTelemetry {
        BatteryTelemetry {
            health_percent: self.health_percent,
            health_source: self.health_source,
            health_unsupported: self.health_unsupported,
            cycle_count: self.cycle_count,
            install_date: self.install_date,
            source_file_name: self.file_name,
            log_timestamp: self.log_timestamp,
            success: true,
            ..Default::default()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
