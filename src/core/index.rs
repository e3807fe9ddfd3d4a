// BattScan - core/index.rs
//
// The Document Index boundary: "list entries under a container" and "open an
// entry for reading" over an opaque, externally granted storage location.
//
// Everything above this trait is pure logic over `LogEntry` values and byte
// streams; only `platform::fs` knows about a concrete filesystem. This is
// the one seam that must be re-supplied per target platform.

use crate::core::model::LogEntry;
use crate::util::error::IndexError;
use std::io::Read;

/// Minimal storage capability pair the scan pipeline depends on.
///
/// Implementations must return explicit `IndexError` values for permission
/// loss, deleted containers, and transient I/O; they never panic.
pub trait DocumentIndex {
    /// Opaque identifier of the granted root container.
    fn root_id(&self) -> &str;

    /// List the immediate children of `container_id`.
    ///
    /// Entries are created fresh on every call; callers must not assume
    /// identifiers remain valid across a re-grant of the folder.
    fn list_children(&self, container_id: &str) -> Result<Vec<LogEntry>, IndexError>;

    /// Open the entry identified by `entry_id` for sequential reading.
    fn open_for_read(&self, entry_id: &str) -> Result<Box<dyn Read>, IndexError>;
}
