// BattScan - core/latest.rs
//
// Selection of the authoritative "current" log among candidates.
//
// Vendor tooling embeds a YYYYMMDDHHmm timestamp in the filename
// (dumpState_202403151030.log). That value is authoritative over the
// filesystem modification time, because copy operations commonly reset
// mtimes but never rewrite the embedded timestamp.

use crate::core::model::LogEntry;
use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::OnceLock;

/// First contiguous 12-digit run in a filename, if any.
fn digit_run_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{12}").expect("digit-run regex is valid"))
}

/// Derive an epoch-millis timestamp from a log filename.
///
/// The first contiguous 12-digit run is interpreted as `YYYYMMDDHHmm`
/// (seconds are zero). Filenames with no such run, or with a run that is
/// not a valid calendar value, yield 0.
pub fn timestamp_from_name(name: &str) -> i64 {
    let Some(m) = digit_run_regex().find(name) else {
        return 0;
    };
    NaiveDateTime::parse_from_str(m.as_str(), "%Y%m%d%H%M")
        .map(|ndt| ndt.and_utc().timestamp_millis())
        .unwrap_or(0)
}

/// Ordering key for "which log is newest": the filename-embedded timestamp
/// when present, else the filesystem modification time.
pub fn ordering_key(entry: &LogEntry) -> i64 {
    let ts = timestamp_from_name(&entry.name);
    if ts != 0 {
        ts
    } else {
        entry.last_modified
    }
}

/// Pick the candidate with the maximum ordering key.
///
/// Ties resolve deterministically from the stable input order (the last of
/// the tied candidates wins). Returns `None` for an empty candidate set.
pub fn select_latest(candidates: &[LogEntry]) -> Option<&LogEntry> {
    candidates.iter().max_by_key(|e| ordering_key(e))
}

// =============================================================================
// Tests
// =============================================================================
