//! Embed error types.

use std::path::PathBuf;

/// Errors that can occur while scanning, building, or reading an embedded
/// filesystem.
///
/// A trailer whose magic does not match is not an error: scanners return
/// `None` for it so callers can use absence for format detection.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// File I/O error
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// A trailer could not be read in full
    #[error("Malformed trailer at 0x{offset:X}: {source}")]
    MalformedTrailer {
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    /// Offsets recorded in the binary are inconsistent
    #[error("Malformed binary: {0}")]
    MalformedBinary(String),

    /// Virtual path is not part of the embedded filesystem
    #[error("Not found in embedded filesystem: {0}")]
    NotFound(String),

    /// Post-splice verification did not see the offsets that were written
    #[error("Integrity check failed for {field}: expected {expected}, got {actual}")]
    IntegrityCheckFailed {
        field: &'static str,
        expected: String,
        actual: String,
    },

    /// Embed metadata is not valid JSON for an `EmbedHeader`
    #[error("Invalid embed header: {0}")]
    InvalidHeader(#[from] serde_json::Error),

    /// A source root is missing or is not a directory
    #[error("Given root isn't a directory: {}", .0.display())]
    InvalidRoot(PathBuf),

    /// Directory walk error
    #[error("{0}")]
    Walk(#[from] walkdir::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = EmbedError> = std::result::Result<T, E>;

/// Render an offset the way layout logs print them.
pub fn as_hex(offset: u64) -> String {
    format!("0x{:X}", offset)
}
