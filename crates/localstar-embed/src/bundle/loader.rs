//! Embed loader
//!
//! Serves the embedded filesystem of a packaged executable from the
//! executable file itself:
//! 1. Open the executable read-only (kept open for the reader's lifetime)
//! 2. Scan its layout for an embed trailer
//! 3. Parse and validate the JSON header
//! 4. Read file ranges on demand, caching every file read
//!
//! The handle is shared, so each seek+read pair runs under one lock.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use super::format::BundleMetadataLayout;
use super::header::EmbedHeader;
use super::layout::{scan_layout, BinaryLayout};
use crate::error::{as_hex, EmbedError, Result};

/// One entry of a flat listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedFile {
    pub path: String,
    pub size: u64,
}

/// Reader for the embedded filesystem of a binary.
///
/// Construct one at process start with [`EmbedReader::open_self`] and keep
/// it for the life of the process. Any `Read + Seek` handle works, which
/// lets tests use in-memory fixtures.
pub struct EmbedReader<R = File> {
    handle: Mutex<R>,
    layout: BinaryLayout,
    header: EmbedHeader,
    cache: RwLock<HashMap<String, Arc<[u8]>>>,
}

impl EmbedReader<File> {
    /// Open the currently running executable.
    pub fn open_self() -> Result<Self> {
        let exe_path = std::env::current_exe()?;
        Self::open(&exe_path)
    }

    /// Open the executable at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "opening binary");
        Self::from_handle(File::open(path)?)
    }
}

impl<R: Read + Seek> EmbedReader<R> {
    /// Scan `handle` and load its embed header.
    ///
    /// A present but unreadable or inconsistent header is an error, not an
    /// empty filesystem.
    pub fn from_handle(mut handle: R) -> Result<Self> {
        let layout = scan_layout(&mut handle)?;

        if layout.compile_payload.is_none() {
            info!("running outside of a compiled executable");
        }
        let header = match layout.embed_payload {
            None => {
                info!("running without an embedded filesystem");
                EmbedHeader::unembedded()
            }
            Some(embed) => {
                let metadata = read_exact_at(&mut handle, embed.metadata_offset, embed.metadata_len)?;
                let header = EmbedHeader::from_bytes(&metadata)?;
                validate(&header, &embed)?;
                info!(
                    files = header.files.len(),
                    bytes = header.total_size(),
                    "found an embedded filesystem"
                );
                header
            }
        };

        Ok(Self {
            handle: Mutex::new(handle),
            layout,
            header,
            cache: RwLock::new(HashMap::new()),
        })
    }

    pub fn layout(&self) -> &BinaryLayout {
        &self.layout
    }

    pub fn header(&self) -> &EmbedHeader {
        &self.header
    }

    pub fn is_embedded(&self) -> bool {
        self.layout.is_embedded()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.header.files.contains_key(path)
    }

    /// Contents of the embedded file at `path`.
    pub fn read_file(&self, path: &str) -> Result<Arc<[u8]>> {
        let entry = self
            .header
            .files
            .get(path)
            .ok_or_else(|| EmbedError::NotFound(path.to_string()))?;

        if let Some(data) = self.cache.read().get(path) {
            return Ok(Arc::clone(data));
        }

        debug!(path, offset = %as_hex(entry.offset), size = entry.size, "reading embedded file");
        let data: Arc<[u8]> = {
            let mut handle = self.handle.lock();
            read_exact_at(&mut *handle, entry.offset, entry.size)?.into()
        };

        // Racing readers insert identical bytes; keep whichever landed first.
        let mut cache = self.cache.write();
        let data = cache.entry(path.to_string()).or_insert(data);
        Ok(Arc::clone(data))
    }

    /// Every embedded file, sorted by path.
    pub fn list_files(&self) -> Vec<EmbeddedFile> {
        self.header
            .files
            .iter()
            .map(|(path, entry)| EmbeddedFile {
                path: path.clone(),
                size: entry.size,
            })
            .collect()
    }

    /// Number of files held in the cache.
    pub fn cached(&self) -> usize {
        self.cache.read().len()
    }
}

/// Every entry must lie inside the embed bundle.
fn validate(header: &EmbedHeader, embed: &BundleMetadataLayout) -> Result<()> {
    for (path, entry) in &header.files {
        let in_bounds = entry.offset >= embed.bundle_offset
            && entry.end().is_some_and(|end| end <= embed.bundle_end());
        if !in_bounds {
            return Err(EmbedError::MalformedBinary(format!(
                "embedded file {} at {}+{} lies outside the embed bundle [{},{})",
                path,
                as_hex(entry.offset),
                entry.size,
                as_hex(embed.bundle_offset),
                as_hex(embed.bundle_end()),
            )));
        }
    }
    Ok(())
}

/// Seek to `offset` and read exactly `len` bytes, looping over short reads.
fn read_exact_at<R: Read + Seek>(reader: &mut R, offset: u64, len: u64) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len as usize];
    reader.seek(SeekFrom::Start(offset))?;
    reader.read_exact(&mut buf)?;
    Ok(buf)
}
