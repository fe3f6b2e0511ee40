//! Binary layout scanner
//!
//! A compiled executable looks like
//!
//! ```text
//! Host runtime | Compile bundle | Compile metadata | d3n0l4nd u64 u64
//! ```
//!
//! and once a filesystem is embedded
//!
//! ```text
//! Host runtime | Embed bundle | Embed metadata | 📦🧾 u64 u64 | Compile bundle | Compile metadata | d3n0l4nd u64 u64
//! ```
//!
//! The compile trailer is always the last 24 bytes. The embed trailer, when
//! present, ends exactly where the compile bundle starts.

use std::io::{Read, Seek, SeekFrom};

use tracing::debug;

use super::format::{read_trailer, BundleMetadataLayout, COMPILE_MAGIC, EMBED_MAGIC, TRAILER_SIZE};
use crate::error::{as_hex, EmbedError, Result};

/// Self-description of a binary at one point in time.
///
/// `embed_payload` is only ever searched for relative to a found compile
/// payload, so `compile_payload == None` implies `embed_payload == None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BinaryLayout {
    pub compile_payload: Option<BundleMetadataLayout>,
    pub embed_payload: Option<BundleMetadataLayout>,
}

impl BinaryLayout {
    /// Whether the file carries a host runtime compile payload.
    pub fn is_packaged(&self) -> bool {
        self.compile_payload.is_some()
    }

    pub fn is_embedded(&self) -> bool {
        self.embed_payload.is_some()
    }

    /// Size of everything before the first payload region.
    pub fn host_runtime_size(&self) -> Option<u64> {
        match (self.embed_payload, self.compile_payload) {
            (Some(embed), _) => Some(embed.bundle_offset),
            (None, Some(compile)) => Some(compile.bundle_offset),
            (None, None) => None,
        }
    }
}

/// Locate the compile trailer at EOF and, behind it, the embed trailer.
pub fn scan_layout<R: Read + Seek>(reader: &mut R) -> Result<BinaryLayout> {
    let eof = reader.seek(SeekFrom::End(0))?;
    if eof < TRAILER_SIZE {
        debug!(len = eof, "file too short for a trailer");
        return Ok(BinaryLayout::default());
    }

    let Some(compile) = read_trailer(reader, eof - TRAILER_SIZE, &COMPILE_MAGIC)? else {
        debug!("no compile payload");
        return Ok(BinaryLayout::default());
    };

    // The host runtime ends where the compile bundle begins; an embed
    // trailer would occupy the 24 bytes right before that.
    let embed_search_offset = compile.bundle_offset.checked_sub(TRAILER_SIZE).ok_or_else(|| {
        EmbedError::MalformedBinary(format!(
            "compile bundle starts at {}, leaving no room for a host runtime",
            as_hex(compile.bundle_offset)
        ))
    })?;

    let embed = read_trailer(reader, embed_search_offset, &EMBED_MAGIC)?;
    if embed.is_none() {
        debug!("no embed payload");
    }

    Ok(BinaryLayout {
        compile_payload: Some(compile),
        embed_payload: embed,
    })
}
