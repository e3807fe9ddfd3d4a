// BattScan - app/scan.rs
//
// Scan orchestration: discovery, latest selection, the cache fingerprint
// shortcut, parsing, and the cache write. The single place where the core
// pipeline and the result cache meet.
//
// The cache write is the only side effect in the whole pipeline and always
// writes a complete record (all fields together, never partial).

use crate::app::cache;
use crate::core::discovery;
use crate::core::index::DocumentIndex;
use crate::core::latest;
use crate::core::model::{BatteryTelemetry, LogEntry};
use crate::core::parser;
use crate::core::sections;
use crate::platform::config;
use crate::util::error::{IndexError, ScanError};
use serde::Serialize;
use std::path::Path;

/// Result of one scan, with provenance.
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    #[serde(flatten)]
    pub telemetry: BatteryTelemetry,

    /// True when the telemetry was served from the result cache rather than
    /// parsed fresh on this run.
    pub from_cache: bool,
}

/// Scan with the cache shortcut.
///
/// Policy, in order:
/// 1. Discovery finds nothing → serve the cached record if one exists, else
///    fail with `NoLogFound`.
/// 2. The cached fingerprint (source filename) equals the newest candidate's
///    name → serve the cache unmodified, skipping the parse entirely.
/// 3. Otherwise parse the newest candidate and overwrite the cache.
pub fn smart_scan(
    index: &dyn DocumentIndex,
    cache_file: &Path,
) -> Result<ScanOutcome, ScanError> {
    let candidates = discovery::discover_logs(index).map_err(classify_index_error)?;

    let Some(newest) = latest::select_latest(&candidates) else {
        if let Some(record) = cache::load(cache_file, index.root_id()) {
            tracing::info!(file = %record.file_name, "No log found; serving cached telemetry");
            return Ok(ScanOutcome {
                telemetry: record.into_telemetry(),
                from_cache: true,
            });
        }
        return Err(ScanError::NoLogFound);
    };

    if let Some(record) = cache::load(cache_file, index.root_id()) {
        if record.file_name == newest.name {
            tracing::info!(file = %record.file_name, "Cache fingerprint matches; skipping parse");
            return Ok(ScanOutcome {
                telemetry: record.into_telemetry(),
                from_cache: true,
            });
        }
    }

    let newest = newest.clone();
    parse_and_store(index, &newest, cache_file)
}

/// Parse the newest candidate unconditionally and overwrite the cache.
/// The `--fresh` path: same pipeline as `smart_scan` minus the fingerprint
/// shortcut.
pub fn fresh_scan(
    index: &dyn DocumentIndex,
    cache_file: &Path,
) -> Result<ScanOutcome, ScanError> {
    let candidates = discovery::discover_logs(index).map_err(classify_index_error)?;
    let newest = latest::select_latest(&candidates)
        .ok_or(ScanError::NoLogFound)?
        .clone();
    parse_and_store(index, &newest, cache_file)
}

/// Parse `entry` and, on success, persist the result.
fn parse_and_store(
    index: &dyn DocumentIndex,
    entry: &LogEntry,
    cache_file: &Path,
) -> Result<ScanOutcome, ScanError> {
    let telemetry = parse_entry(index, entry)?;
    if let Err(e) = cache::store(&telemetry, index.root_id(), cache_file) {
        tracing::warn!(error = %e, "Telemetry parsed but cache write failed");
    }
    Ok(ScanOutcome {
        telemetry,
        from_cache: false,
    })
}

/// Parse a single named entry without touching the cache.
///
/// Used for explicit file selection, where caching would poison the
/// "latest log" fingerprint with an arbitrary older file.
pub fn parse_entry(
    index: &dyn DocumentIndex,
    entry: &LogEntry,
) -> Result<BatteryTelemetry, ScanError> {
    let stream = index.open_for_read(&entry.id).map_err(|e| {
        tracing::debug!(file = %entry.name, error = %e, "Cannot open log for reading");
        ScanError::OpenFailure {
            name: entry.name.clone(),
        }
    })?;

    let telemetry = parser::parse_stream(stream, &entry.name);
    if telemetry.success {
        return Ok(telemetry);
    }
    if telemetry.error_message.is_empty() {
        Err(ScanError::WrongFolder {
            message: format!("'{}' contains no battery telemetry markers", entry.name),
        })
    } else {
        Err(ScanError::ReadError {
            name: entry.name.clone(),
            message: telemetry.error_message,
        })
    }
}

/// Extract the labeled raw sections of a single entry for display.
///
/// Open failures collapse into a fixed placeholder rather than an error;
/// this output is for human eyes only.
pub fn extract_sections(index: &dyn DocumentIndex, entry: &LogEntry) -> String {
    match index.open_for_read(&entry.id) {
        Ok(stream) => sections::extract_labeled_sections(stream),
        Err(e) => {
            tracing::debug!(file = %entry.name, error = %e, "Cannot open log for sections");
            "(could not open file)".to_string()
        }
    }
}

/// Find a candidate entry by exact filename.
pub fn find_entry(
    index: &dyn DocumentIndex,
    file_name: &str,
) -> Result<LogEntry, ScanError> {
    let candidates = discovery::discover_logs(index).map_err(classify_index_error)?;
    candidates
        .into_iter()
        .find(|e| e.name == file_name)
        .ok_or_else(|| ScanError::NoSuchLog {
            name: file_name.to_string(),
        })
}

/// Persist `folder` as the remembered source.
///
/// A change of folder invalidates the cache before the save: the old record
/// describes a different folder's log and must not be served as a fallback.
/// Remembering the already-remembered folder leaves the cache alone.
pub fn remember_folder(
    folder: &Path,
    config: &config::AppConfig,
    config_file: &Path,
    cache_file: &Path,
) -> Result<(), String> {
    let changed = config.folder.as_deref() != Some(folder);
    if changed {
        cache::clear(cache_file);
    }

    let raw = config::RawConfig {
        scan: config::ScanSection {
            folder: Some(folder.to_path_buf()),
        },
        logging: config::LoggingSection {
            level: config.log_level.clone(),
        },
    };
    config::save_config(&raw, config_file)?;
    tracing::info!(folder = %folder.display(), "Folder remembered");
    Ok(())
}

/// Translate a root-listing failure into the caller-facing taxonomy:
/// a permission failure means the grant was lost, anything else means the
/// folder itself is no longer enumerable.
pub fn classify_index_error(e: IndexError) -> ScanError {
    tracing::debug!(error = %e, "Root listing failed");
    match e {
        IndexError::PermissionDenied { .. } => ScanError::AccessLost,
        IndexError::NotFound { .. }
        | IndexError::NotADirectory { .. }
        | IndexError::Io { .. } => ScanError::SourceGone,
    }
}

// =============================================================================
// Unit tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::HealthSource;
    use crate::util::constants;
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::io::Read;
    use tempfile::TempDir;

    /// In-memory index with per-entry content and an open counter.
    struct MemIndex {
        root: String,
        children: Vec<LogEntry>,
        contents: HashMap<String, String>,
        opens: Cell<usize>,
        root_error: Option<fn() -> IndexError>,
    }

    impl MemIndex {
        fn new() -> Self {
            Self::rooted("root")
        }

        fn rooted(root: &str) -> Self {
            Self {
                root: root.to_string(),
                children: Vec::new(),
                contents: HashMap::new(),
                opens: Cell::new(0),
                root_error: None,
            }
        }

        fn add_log(&mut self, name: &str, content: &str) {
            let id = format!("{}/{name}", self.root);
            self.children.push(LogEntry {
                id: id.clone(),
                name: name.to_string(),
                mime_type: constants::MIME_TYPE_FILE.to_string(),
                last_modified: 0,
            });
            self.contents.insert(id, content.to_string());
        }
    }

    impl DocumentIndex for MemIndex {
        fn root_id(&self) -> &str {
            &self.root
        }

        fn list_children(&self, _container_id: &str) -> Result<Vec<LogEntry>, IndexError> {
            if let Some(make) = self.root_error {
                return Err(make());
            }
            Ok(self.children.clone())
        }

        fn open_for_read(&self, entry_id: &str) -> Result<Box<dyn Read>, IndexError> {
            self.opens.set(self.opens.get() + 1);
            match self.contents.get(entry_id) {
                Some(c) => Ok(Box::new(std::io::Cursor::new(c.clone().into_bytes()))),
                None => Err(IndexError::NotFound {
                    path: entry_id.into(),
                }),
            }
        }
    }

    const GOOD_LOG: &str = "mSavedBatteryAsoc: 96\nmSavedBatteryUsage: [157000]\nLLB CAL: 20230207\n";

    #[test]
    fn test_smart_scan_parses_and_caches() {
        let dir = TempDir::new().unwrap();
        let cache_file = cache::cache_path(dir.path());
        let mut index = MemIndex::new();
        index.add_log("dumpState_202403151030.log", GOOD_LOG);

        let outcome = smart_scan(&index, &cache_file).unwrap();
        assert!(!outcome.from_cache);
        assert_eq!(outcome.telemetry.health_percent, Some(96));
        assert_eq!(outcome.telemetry.health_source, HealthSource::Asoc);
        assert!(cache::load(&cache_file, index.root_id()).is_some());
    }

    #[test]
    fn test_smart_scan_second_call_skips_parse() {
        let dir = TempDir::new().unwrap();
        let cache_file = cache::cache_path(dir.path());
        let mut index = MemIndex::new();
        index.add_log("dumpState_202403151030.log", GOOD_LOG);

        let first = smart_scan(&index, &cache_file).unwrap();
        let second = smart_scan(&index, &cache_file).unwrap();

        assert_eq!(index.opens.get(), 1, "the second call must not re-open the file");
        assert!(second.from_cache);
        assert_eq!(
            first.telemetry.health_percent,
            second.telemetry.health_percent
        );
        assert_eq!(
            first.telemetry.source_file_name,
            second.telemetry.source_file_name
        );
    }

    #[test]
    fn test_smart_scan_reparses_when_newer_log_appears() {
        let dir = TempDir::new().unwrap();
        let cache_file = cache::cache_path(dir.path());
        let mut index = MemIndex::new();
        index.add_log("dumpState_202403151030.log", GOOD_LOG);

        smart_scan(&index, &cache_file).unwrap();
        index.add_log(
            "dumpState_202404010900.log",
            "mSavedBatteryAsoc: 95\nmSavedBatteryUsage: [160000]\n",
        );

        let outcome = smart_scan(&index, &cache_file).unwrap();
        assert!(!outcome.from_cache);
        assert_eq!(outcome.telemetry.health_percent, Some(95));
        assert_eq!(
            cache::load(&cache_file, index.root_id()).unwrap().file_name,
            "dumpState_202404010900.log"
        );
    }

    #[test]
    fn test_smart_scan_empty_folder_without_cache_is_no_log_found() {
        let dir = TempDir::new().unwrap();
        let cache_file = cache::cache_path(dir.path());
        let index = MemIndex::new();

        match smart_scan(&index, &cache_file) {
            Err(ScanError::NoLogFound) => {}
            other => panic!("expected NoLogFound, got {other:?}"),
        }
    }

    #[test]
    fn test_smart_scan_empty_folder_serves_cache() {
        let dir = TempDir::new().unwrap();
        let cache_file = cache::cache_path(dir.path());
        let mut index = MemIndex::new();
        index.add_log("dumpState_202403151030.log", GOOD_LOG);
        smart_scan(&index, &cache_file).unwrap();

        // The log disappears; the cached record keeps answering.
        index.children.clear();
        let outcome = smart_scan(&index, &cache_file).unwrap();
        assert!(outcome.from_cache);
        assert_eq!(outcome.telemetry.health_percent, Some(96));
    }

    #[test]
    fn test_wrong_folder_signature() {
        let dir = TempDir::new().unwrap();
        let cache_file = cache::cache_path(dir.path());
        let mut index = MemIndex::new();
        index.add_log("dumpState_202403151030.log", "no battery content at all\n");

        match smart_scan(&index, &cache_file) {
            Err(ScanError::WrongFolder { .. }) => {}
            other => panic!("expected WrongFolder, got {other:?}"),
        }
        assert!(cache::load(&cache_file, index.root_id()).is_none(), "failed parses are never cached");
    }

    #[test]
    fn test_open_failure_maps_to_open_failure() {
        let dir = TempDir::new().unwrap();
        let cache_file = cache::cache_path(dir.path());
        let mut index = MemIndex::new();
        index.add_log("dumpState_202403151030.log", GOOD_LOG);
        // Break the content lookup while keeping the listing entry.
        index.contents.clear();

        match smart_scan(&index, &cache_file) {
            Err(ScanError::OpenFailure { name }) => {
                assert_eq!(name, "dumpState_202403151030.log");
            }
            other => panic!("expected OpenFailure, got {other:?}"),
        }
    }

    #[test]
    fn test_root_permission_failure_is_access_lost() {
        let dir = TempDir::new().unwrap();
        let cache_file = cache::cache_path(dir.path());
        let mut index = MemIndex::new();
        index.root_error = Some(|| IndexError::PermissionDenied {
            path: "root".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "revoked"),
        });

        match smart_scan(&index, &cache_file) {
            Err(ScanError::AccessLost) => {}
            other => panic!("expected AccessLost, got {other:?}"),
        }
    }

    #[test]
    fn test_root_not_found_is_source_gone() {
        let dir = TempDir::new().unwrap();
        let cache_file = cache::cache_path(dir.path());
        let mut index = MemIndex::new();
        index.root_error = Some(|| IndexError::NotFound { path: "root".into() });

        match smart_scan(&index, &cache_file) {
            Err(ScanError::SourceGone) => {}
            other => panic!("expected SourceGone, got {other:?}"),
        }
    }

    #[test]
    fn test_fresh_scan_ignores_fingerprint() {
        let dir = TempDir::new().unwrap();
        let cache_file = cache::cache_path(dir.path());
        let mut index = MemIndex::new();
        index.add_log("dumpState_202403151030.log", GOOD_LOG);

        smart_scan(&index, &cache_file).unwrap();
        let outcome = fresh_scan(&index, &cache_file).unwrap();
        assert!(!outcome.from_cache);
        assert_eq!(index.opens.get(), 2);
    }

    #[test]
    fn test_parse_entry_never_writes_cache() {
        let dir = TempDir::new().unwrap();
        let cache_file = cache::cache_path(dir.path());
        let mut index = MemIndex::new();
        index.add_log("dumpState_202401010000.log", GOOD_LOG);

        let entry = find_entry(&index, "dumpState_202401010000.log").unwrap();
        let telemetry = parse_entry(&index, &entry).unwrap();
        assert_eq!(telemetry.health_percent, Some(96));
        assert!(cache::load(&cache_file, index.root_id()).is_none());
    }

    #[test]
    fn test_find_entry_unknown_name_says_which_log_is_missing() {
        let mut index = MemIndex::new();
        index.add_log("dumpState_202401010000.log", GOOD_LOG);
        match find_entry(&index, "nope.log") {
            Err(ScanError::NoSuchLog { name }) => assert_eq!(name, "nope.log"),
            other => panic!("expected NoSuchLog, got {other:?}"),
        }
    }

    #[test]
    fn test_cache_from_one_folder_is_not_served_for_another() {
        let dir = TempDir::new().unwrap();
        let cache_file = cache::cache_path(dir.path());

        let mut folder_a = MemIndex::rooted("/mnt/a/log");
        folder_a.add_log("dumpState_202403151030.log", GOOD_LOG);
        smart_scan(&folder_a, &cache_file).unwrap();

        // Same filename, different folder, different battery.
        let mut folder_b = MemIndex::rooted("/mnt/b/log");
        folder_b.add_log("dumpState_202403151030.log", "mSavedBatteryAsoc: 40\n");

        let outcome = smart_scan(&folder_b, &cache_file).unwrap();
        assert!(!outcome.from_cache, "folder B's log must be parsed, not fingerprint-matched");
        assert_eq!(outcome.telemetry.health_percent, Some(40));
        assert_eq!(folder_b.opens.get(), 1);

        // The empty-folder fallback is folder-scoped too.
        folder_b.children.clear();
        let outcome = smart_scan(&folder_b, &cache_file).unwrap();
        assert_eq!(outcome.telemetry.health_percent, Some(40));

        let folder_c = MemIndex::rooted("/mnt/c/log");
        assert!(matches!(
            smart_scan(&folder_c, &cache_file),
            Err(ScanError::NoLogFound)
        ));
    }

    #[test]
    fn test_remember_different_folder_clears_cache() {
        let dir = TempDir::new().unwrap();
        let cache_file = cache::cache_path(dir.path());
        let config_file = dir.path().join("config.toml");

        let mut index = MemIndex::rooted("/mnt/a/log");
        index.add_log("dumpState_202403151030.log", GOOD_LOG);
        smart_scan(&index, &cache_file).unwrap();
        assert!(cache::load(&cache_file, index.root_id()).is_some());

        let remembered = config::AppConfig {
            folder: Some("/mnt/a/log".into()),
            log_level: None,
        };
        remember_folder(
            Path::new("/mnt/b/log"),
            &remembered,
            &config_file,
            &cache_file,
        )
        .unwrap();

        assert!(cache::load(&cache_file, index.root_id()).is_none());
        let (saved, _) = config::load_config(&config_file);
        assert_eq!(saved.folder, Some("/mnt/b/log".into()));
    }

    #[test]
    fn test_remember_same_folder_keeps_cache() {
        let dir = TempDir::new().unwrap();
        let cache_file = cache::cache_path(dir.path());
        let config_file = dir.path().join("config.toml");

        let mut index = MemIndex::rooted("/mnt/a/log");
        index.add_log("dumpState_202403151030.log", GOOD_LOG);
        smart_scan(&index, &cache_file).unwrap();

        let remembered = config::AppConfig {
            folder: Some("/mnt/a/log".into()),
            log_level: None,
        };
        remember_folder(
            Path::new("/mnt/a/log"),
            &remembered,
            &config_file,
            &cache_file,
        )
        .unwrap();

        assert!(cache::load(&cache_file, index.root_id()).is_some());
    }

    #[test]
    fn test_remember_with_nothing_remembered_clears_cache() {
        let dir = TempDir::new().unwrap();
        let cache_file = cache::cache_path(dir.path());
        let config_file = dir.path().join("config.toml");

        let mut index = MemIndex::rooted("/mnt/a/log");
        index.add_log("dumpState_202403151030.log", GOOD_LOG);
        smart_scan(&index, &cache_file).unwrap();

        remember_folder(
            Path::new("/mnt/a/log"),
            &config::AppConfig::default(),
            &config_file,
            &cache_file,
        )
        .unwrap();

        assert!(cache::load(&cache_file, index.root_id()).is_none());
    }

    #[test]
    fn test_extract_sections_open_failure_placeholder() {
        let mut index = MemIndex::new();
        index.add_log("dumpState_202401010000.log", GOOD_LOG);
        let entry = index.children[0].clone();
        index.contents.clear();

        assert_eq!(extract_sections(&index, &entry), "(could not open file)");
    }
}
