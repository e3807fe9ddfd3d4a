// BattScan - platform/fs.rs
//
// The concrete Document Index over a local directory tree.
//
// Everything above this module works with opaque entry identifiers; here an
// identifier is simply the absolute path rendered as a string. Listings are
// sorted by name so tie-breaking in the latest selector is deterministic
// across platforms (read_dir order is filesystem-dependent).

use crate::core::index::DocumentIndex;
use crate::core::model::LogEntry;
use crate::util::constants;
use crate::util::error::IndexError;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Document Index backed by `std::fs` over one root directory.
#[derive(Debug, Clone)]
pub struct FsDocumentIndex {
    root: PathBuf,
    root_id: String,
}

impl FsDocumentIndex {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root_id = root.to_string_lossy().into_owned();
        Self { root, root_id }
    }

    /// The root directory this index was granted.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn map_io_error(e: std::io::Error, path: &Path, operation: &'static str) -> IndexError {
        match e.kind() {
            std::io::ErrorKind::NotFound => IndexError::NotFound { path: path.into() },
            std::io::ErrorKind::PermissionDenied => IndexError::PermissionDenied {
                path: path.into(),
                source: e,
            },
            _ => IndexError::Io {
                path: path.into(),
                operation,
                source: e,
            },
        }
    }
}

impl DocumentIndex for FsDocumentIndex {
    fn root_id(&self) -> &str {
        &self.root_id
    }

    fn list_children(&self, container_id: &str) -> Result<Vec<LogEntry>, IndexError> {
        let path = Path::new(container_id);

        // Distinguish "gone" from "not a directory" before read_dir, whose
        // error kinds for these cases vary across platforms.
        if !path.exists() {
            return Err(IndexError::NotFound { path: path.into() });
        }
        if !path.is_dir() {
            return Err(IndexError::NotADirectory { path: path.into() });
        }

        let read_dir =
            std::fs::read_dir(path).map_err(|e| Self::map_io_error(e, path, "list"))?;

        let mut entries = Vec::new();
        for dir_entry in read_dir {
            let dir_entry = dir_entry.map_err(|e| Self::map_io_error(e, path, "list"))?;
            let entry_path = dir_entry.path();
            let name = dir_entry.file_name().to_string_lossy().into_owned();

            let is_dir = dir_entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            let mime_type = if is_dir {
                constants::MIME_TYPE_DIR
            } else {
                constants::MIME_TYPE_FILE
            };

            // mtime is a fallback ordering key only; 0 when unavailable.
            let last_modified = dir_entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as i64)
                .unwrap_or(0);

            entries.push(LogEntry {
                id: entry_path.to_string_lossy().into_owned(),
                name,
                mime_type: mime_type.to_string(),
                last_modified,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        tracing::trace!(dir = container_id, count = entries.len(), "Listed directory");
        Ok(entries)
    }

    fn open_for_read(&self, entry_id: &str) -> Result<Box<dyn Read>, IndexError> {
        let path = Path::new(entry_id);
        let file = std::fs::File::open(path).map_err(|e| Self::map_io_error(e, path, "open"))?;
        Ok(Box::new(file))
    }
}

// =============================================================================
// Unit tests
// =============================================================================
