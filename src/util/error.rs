// BattScan - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// Failures at the storage boundary (IndexError) and scan-level failures
// surfaced to the presentation layer (ScanError) are separate types: the
// former carries I/O causes, the latter is the stable vocabulary the UI
// routes on.

use std::fmt;
use std::io;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Document Index errors
// ---------------------------------------------------------------------------

/// Errors produced by a `DocumentIndex` implementation.
///
/// These are explicit values, never panics: permission revocation, container
/// deletion, and transient I/O all surface here so the caller can decide
/// whether to fall back to cached telemetry.
#[derive(Debug)]
pub enum IndexError {
    /// The container or entry does not exist.
    NotFound { path: PathBuf },

    /// A listing was requested on something that is not a directory.
    NotADirectory { path: PathBuf },

    /// Access was denied (grant revoked or never held).
    PermissionDenied { path: PathBuf, source: io::Error },

    /// Other I/O failure with operation context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { path } => {
                write!(f, "'{}' does not exist", path.display())
            }
            Self::NotADirectory { path } => {
                write!(f, "'{}' is not a directory", path.display())
            }
            Self::PermissionDenied { path, source } => {
                write!(
                    f,
                    "Permission denied accessing '{}': {source}",
                    path.display()
                )
            }
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for IndexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::PermissionDenied { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Scan errors
// ---------------------------------------------------------------------------

/// Scan-level failure vocabulary surfaced to the presentation layer.
///
/// The scan pipeline itself produces every variant except `AccessLost` and
/// `SourceGone`, which are decided by the caller by probing the Document
/// Index; on either, the caller should prefer showing the last cached
/// record over an empty state.
#[derive(Debug)]
pub enum ScanError {
    /// Discovery found no candidate log at all.
    NoLogFound,

    /// An explicitly named log is not among the discovered candidates.
    NoSuchLog { name: String },

    /// The selected log could not be opened for reading.
    OpenFailure { name: String },

    /// An I/O failure occurred while streaming the log.
    ReadError { name: String, message: String },

    /// The parse completed but yielded no usable battery fields; the folder
    /// likely contains unrelated files.
    WrongFolder { message: String },

    /// A previously held folder grant is no longer valid.
    AccessLost,

    /// The previously known source folder is no longer enumerable.
    SourceGone,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoLogFound => write!(f, "No dumpstate log files found"),
            Self::NoSuchLog { name } => {
                write!(f, "No log named '{name}' in the source folder")
            }
            Self::OpenFailure { name } => write!(f, "Could not open '{name}'"),
            Self::ReadError { name, message } => {
                write!(f, "Error reading '{name}': {message}")
            }
            Self::WrongFolder { message } => write!(f, "{message}"),
            Self::AccessLost => write!(f, "Access to the source folder was lost"),
            Self::SourceGone => write!(f, "The source folder no longer exists"),
        }
    }
}

impl std::error::Error for ScanError {}
