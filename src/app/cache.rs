// BattScan - app/cache.rs
//
// Result cache: the last successfully parsed telemetry, persisted between
// runs so the tool can answer instantly when nothing changed and can fall
// back to stale-but-real data when the source folder becomes unreachable.
//
// Design principles:
// - The cache is written atomically (write→temp, rename→final) so a crash
//   during save never corrupts the previous good record.
// - Load errors are silently discarded (a corrupt cache just means the next
//   scan re-parses from scratch).
// - Only successful parses are stored; `store` on a failed result is a no-op.
// - Single-writer discipline: the scan orchestrator is the only caller of
//   `store`, and it writes all fields together, never a partial update.

use crate::core::model::{BatteryTelemetry, CacheRecord};
use crate::util::constants::CACHE_FILE_NAME;
use std::path::{Path, PathBuf};

/// Resolve the cache file path from the platform data directory.
pub fn cache_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CACHE_FILE_NAME)
}

/// Persist `telemetry` to `path` atomically, stamped with the folder it
/// was parsed from.
///
/// A failed parse is never cached: `success == false` is a silent no-op.
/// Creates all parent directories as needed. Returns a descriptive error
/// string the caller typically logs and ignores — a write failure only
/// costs a re-parse on the next run.
pub fn store(
    telemetry: &BatteryTelemetry,
    source_folder: &str,
    path: &Path,
) -> Result<(), String> {
    if !telemetry.success {
        tracing::debug!("Refusing to cache a failed parse");
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            format!("cannot create cache directory '{}': {e}", parent.display())
        })?;
    }

    let record = CacheRecord::new(telemetry, source_folder);
    let json = serde_json::to_string_pretty(&record)
        .map_err(|e| format!("failed to serialise cache record: {e}"))?;

    // Atomic write: temp sibling then rename, so the previous good record
    // survives a crash between the two steps.
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json.as_bytes())
        .map_err(|e| format!("failed to write cache temp file '{}': {e}", tmp.display()))?;

    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        format!("failed to finalise cache file '{}': {e}", path.display())
    })?;

    tracing::debug!(path = %path.display(), file = %record.file_name, "Cache stored");
    Ok(())
}

/// Load the cached record from `path`, provided it belongs to
/// `source_folder`.
///
/// Returns `None` on any error (file not found, malformed JSON), when the
/// stored filename key is blank — an empty fingerprint can never match a
/// real candidate, so such a record is useless — and when the record was
/// parsed from a different folder. A same-named log in another folder is a
/// different log; serving the old record for it would report one device's
/// battery as another's.
pub fn load(path: &Path, source_folder: &str) -> Option<CacheRecord> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(path = %path.display(), error = %e, "Cannot read cache file");
            }
        })
        .ok()?;

    let record: CacheRecord = serde_json::from_str(&content)
        .map_err(|e| {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Cache file is malformed — will re-parse"
            );
        })
        .ok()?;

    if record.file_name.is_empty() {
        return None;
    }

    if record.source_folder != source_folder {
        tracing::debug!(
            cached = %record.source_folder,
            requested = source_folder,
            "Cache belongs to a different folder; ignoring"
        );
        return None;
    }

    tracing::debug!(path = %path.display(), file = %record.file_name, "Cache loaded");
    Some(record)
}

/// Remove the cached record.
///
/// Called whenever the source folder changes: the old record describes a
/// different folder's log and must not be served as a fallback. A missing
/// file is not an error.
pub fn clear(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "Cache cleared"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Cannot clear cache"),
    }
}

// =============================================================================
// Unit tests
// =============================================================================
