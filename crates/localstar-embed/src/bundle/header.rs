//! Embed metadata header
//!
//! Stored as JSON in the embed metadata region:
//!
//! ```json
//! {
//!   "version": { "hostRuntime": "1.9.0", "payload": "0.2.0" },
//!   "files": { "/index.html": { "offset": 91234567, "size": 512 } }
//! }
//! ```
//!
//! File offsets are absolute positions in the final executable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Version stamped into the header of an unpackaged process.
pub const NO_EMBED_VERSION: &str = "No embed";

/// Versions of the host runtime and of the embedded payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedVersion {
    pub host_runtime: String,
    pub payload: String,
}

impl Default for EmbedVersion {
    fn default() -> Self {
        Self {
            host_runtime: "unknown".to_string(),
            payload: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Location of one embedded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub offset: u64,
    pub size: u64,
}

impl FileEntry {
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedHeader {
    pub version: EmbedVersion,
    pub files: BTreeMap<String, FileEntry>,
}

impl EmbedHeader {
    pub fn new(version: EmbedVersion) -> Self {
        Self {
            version,
            files: BTreeMap::new(),
        }
    }

    /// Header reported when the running executable has no embed payload.
    pub fn unembedded() -> Self {
        Self::new(EmbedVersion {
            host_runtime: NO_EMBED_VERSION.to_string(),
            payload: NO_EMBED_VERSION.to_string(),
        })
    }

    pub fn is_unembedded(&self) -> bool {
        self.version.host_runtime == NO_EMBED_VERSION && self.version.payload == NO_EMBED_VERSION
    }

    /// Copy of this header with every file offset moved by `base`.
    ///
    /// Offsets are recorded relative to the bundle while bundling and
    /// become absolute once the bundle's position in the file is known.
    pub fn rebased(&self, base: u64) -> Self {
        Self {
            version: self.version.clone(),
            files: self
                .files
                .iter()
                .map(|(path, entry)| {
                    let entry = FileEntry {
                        offset: entry.offset + base,
                        size: entry.size,
                    };
                    (path.clone(), entry)
                })
                .collect(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Sum of all file sizes.
    pub fn total_size(&self) -> u64 {
        self.files.values().map(|e| e.size).sum()
    }
}
