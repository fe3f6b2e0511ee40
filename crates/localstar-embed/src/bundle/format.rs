//! Trailer format
//!
//! Both payloads appended to a compiled executable end in the same 24-byte
//! trailer:
//!
//! ```text
//! ┌──────────────┬──────────────────────┬────────────────────────┐
//! │ magic (8 B)  │ bundle offset (u64)  │ metadata offset (u64)  │
//! └──────────────┴──────────────────────┴────────────────────────┘
//! ```
//!
//! Offsets are absolute file positions, big-endian. The trailer's own
//! position marks the end of the metadata region, so the lengths of the
//! bundle and metadata regions are derived rather than stored.

use std::io::{self, Read, Seek, SeekFrom, Write};

use tracing::debug;

use crate::error::{as_hex, EmbedError, Result};

/// Magic of the trailer written by the host runtime compiler.
pub const COMPILE_MAGIC: [u8; 8] = *b"d3n0l4nd";

/// Magic of the embed trailer: UTF-8 of "📦🧾".
pub const EMBED_MAGIC: [u8; 8] = [0xF0, 0x9F, 0x93, 0xA6, 0xF0, 0x9F, 0xA7, 0xBE];

/// Size of a trailer in bytes.
pub const TRAILER_SIZE: u64 = 24;

/// Fixed-size trailer that closes a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    pub magic: [u8; 8],
    pub bundle_offset: u64,
    pub metadata_offset: u64,
}

/// Where one payload's bundle and metadata live, derived from its trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleMetadataLayout {
    pub bundle_offset: u64,
    pub bundle_len: u64,
    pub metadata_offset: u64,
    pub metadata_len: u64,
}

impl BundleMetadataLayout {
    /// Offset one past the last bundle byte.
    pub fn bundle_end(&self) -> u64 {
        self.metadata_offset
    }

    /// Offset of the trailer that describes this payload.
    pub fn trailer_offset(&self) -> u64 {
        self.metadata_offset + self.metadata_len
    }

    /// Bundle + metadata, without the trailer.
    pub fn payload_len(&self) -> u64 {
        self.bundle_len + self.metadata_len
    }
}

impl Trailer {
    pub fn new(magic: [u8; 8], bundle_offset: u64, metadata_offset: u64) -> Self {
        Self {
            magic,
            bundle_offset,
            metadata_offset,
        }
    }

    /// Decode a trailer, regardless of its magic.
    pub fn from_bytes(bytes: &[u8; TRAILER_SIZE as usize]) -> Self {
        let mut magic = [0u8; 8];
        magic.copy_from_slice(&bytes[0..8]);
        let mut word = [0u8; 8];
        word.copy_from_slice(&bytes[8..16]);
        let bundle_offset = u64::from_be_bytes(word);
        word.copy_from_slice(&bytes[16..24]);
        let metadata_offset = u64::from_be_bytes(word);
        Self {
            magic,
            bundle_offset,
            metadata_offset,
        }
    }

    pub fn to_bytes(&self) -> [u8; TRAILER_SIZE as usize] {
        let mut bytes = [0u8; TRAILER_SIZE as usize];
        bytes[0..8].copy_from_slice(&self.magic);
        bytes[8..16].copy_from_slice(&self.bundle_offset.to_be_bytes());
        bytes[16..24].copy_from_slice(&self.metadata_offset.to_be_bytes());
        bytes
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_bytes())
    }

    /// Derive region lengths given the position this trailer was read from.
    pub fn layout_at(&self, trailer_offset: u64) -> Result<BundleMetadataLayout> {
        if self.bundle_offset > self.metadata_offset || self.metadata_offset > trailer_offset {
            return Err(EmbedError::MalformedBinary(format!(
                "trailer at {} points to bundle {} and metadata {}",
                as_hex(trailer_offset),
                as_hex(self.bundle_offset),
                as_hex(self.metadata_offset),
            )));
        }
        Ok(BundleMetadataLayout {
            bundle_offset: self.bundle_offset,
            bundle_len: self.metadata_offset - self.bundle_offset,
            metadata_offset: self.metadata_offset,
            metadata_len: trailer_offset - self.metadata_offset,
        })
    }
}

/// Human-readable name of a known magic, for logs.
pub fn magic_name(magic: &[u8; 8]) -> &'static str {
    match *magic {
        COMPILE_MAGIC => "compile",
        EMBED_MAGIC => "embed",
        _ => "unknown",
    }
}

/// Read the trailer at `offset` and return the layout it describes.
///
/// Returns `Ok(None)` when the magic at `offset` is not `magic`.
pub fn read_trailer<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
    magic: &[u8; 8],
) -> Result<Option<BundleMetadataLayout>> {
    let mut buf = [0u8; TRAILER_SIZE as usize];
    reader
        .seek(SeekFrom::Start(offset))
        .and_then(|_| reader.read_exact(&mut buf))
        .map_err(|source| EmbedError::MalformedTrailer { offset, source })?;

    let trailer = Trailer::from_bytes(&buf);
    if trailer.magic != *magic {
        debug!(
            offset = %as_hex(offset),
            expected = magic_name(magic),
            "wrong trailer magic"
        );
        return Ok(None);
    }

    let layout = trailer.layout_at(offset)?;
    debug!(
        kind = magic_name(magic),
        bundle = %format!("[{},{})", as_hex(layout.bundle_offset), as_hex(layout.metadata_offset)),
        metadata = %format!("[{},{})", as_hex(layout.metadata_offset), as_hex(offset)),
        trailer = %format!("[{},{})", as_hex(offset), as_hex(offset + TRAILER_SIZE)),
        "read trailer"
    );
    Ok(Some(layout))
}

/// Write a trailer at the writer's current position.
pub fn write_trailer<W: Write>(
    writer: &mut W,
    magic: &[u8; 8],
    bundle_offset: u64,
    metadata_offset: u64,
) -> io::Result<()> {
    debug!(
        kind = magic_name(magic),
        bundle_offset = %as_hex(bundle_offset),
        metadata_offset = %as_hex(metadata_offset),
        "write trailer"
    );
    Trailer::new(*magic, bundle_offset, metadata_offset).write_to(writer)
}
