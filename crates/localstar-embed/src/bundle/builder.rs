//! Embed builder
//!
//! Packs one or more directory trees into an embed payload and splices it
//! into compiled executables:
//! 1. Walk every root, later roots overriding earlier ones per virtual path
//! 2. Concatenate file contents into an in-memory bundle, up to a size limit
//! 3. For each target: scan, hold the compile payload in memory, truncate to
//!    the host runtime, append embed bundle + metadata + trailer, re-append
//!    the compile payload with a shifted trailer, then verify
//!
//! A target that fails after truncation is restored to its original bytes
//! before the error is returned. Other targets are never touched by a
//! failure.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use super::format::{write_trailer, BundleMetadataLayout, COMPILE_MAGIC, EMBED_MAGIC, TRAILER_SIZE};
use super::header::{EmbedHeader, EmbedVersion, FileEntry};
use super::layout::scan_layout;
use crate::byte_size::to_human;
use crate::error::{as_hex, EmbedError, Result};

/// Default cap on the embed bundle: 100 MB.
pub const DEFAULT_LIMIT: u64 = 100 * 1024 * 1024;

/// Configuration for an embed run.
#[derive(Debug, Clone)]
pub struct EmbedOptions {
    /// Source directories, in override order.
    pub roots: Vec<PathBuf>,

    /// Maximum bundle size in bytes.
    pub limit: u64,

    /// Scan and report without writing to any target.
    pub dry_run: bool,

    pub version: EmbedVersion,
}

impl EmbedOptions {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            limit: DEFAULT_LIMIT,
            dry_run: false,
            version: EmbedVersion::default(),
        }
    }
}

/// Two roots produced the same virtual path; `replacement` won.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub virtual_path: String,
    pub previous: PathBuf,
    pub replacement: PathBuf,
}

/// Virtual path → local path, in discovery order.
///
/// A path overridden by a later root keeps the position of its first
/// discovery.
#[derive(Debug, Clone, Default)]
pub struct FileSet {
    entries: Vec<(String, PathBuf)>,
    index: HashMap<String, usize>,
    collisions: Vec<Collision>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `virtual_path` to `local`, returning the path it replaced.
    pub fn insert(&mut self, virtual_path: String, local: PathBuf) -> Option<PathBuf> {
        if let Some(&i) = self.index.get(&virtual_path) {
            let previous = std::mem::replace(&mut self.entries[i].1, local.clone());
            self.collisions.push(Collision {
                virtual_path,
                previous: previous.clone(),
                replacement: local,
            });
            return Some(previous);
        }
        self.index.insert(virtual_path.clone(), self.entries.len());
        self.entries.push((virtual_path, local));
        None
    }

    pub fn get(&self, virtual_path: &str) -> Option<&Path> {
        self.index
            .get(virtual_path)
            .map(|&i| self.entries[i].1.as_path())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries.iter().map(|(v, l)| (v.as_str(), l.as_path()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn collisions(&self) -> &[Collision] {
        &self.collisions
    }
}

/// Virtual path of `file` under `root`: forward slashes, leading `/`.
pub fn virtual_path(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    let mut path = String::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            path.push('/');
            path.push_str(&part.to_string_lossy());
        }
    }
    if path.is_empty() {
        path.push('/');
    }
    path
}

/// Walk every root recursively, files only.
pub fn collect_files(roots: &[PathBuf]) -> Result<FileSet> {
    let mut files = FileSet::new();

    for root in roots {
        if !root.is_dir() {
            return Err(EmbedError::InvalidRoot(root.clone()));
        }
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let embed_path = virtual_path(root, entry.path());
            if let Some(previous) = files.insert(embed_path.clone(), entry.path().to_path_buf()) {
                warn!(
                    path = %entry.path().display(),
                    overwrites = %previous.display(),
                    embed_path = %embed_path,
                    "file overwrites earlier root"
                );
            }
        }
    }

    Ok(files)
}

/// An in-memory embed bundle with offsets relative to its first byte.
#[derive(Debug, Clone)]
pub struct Bundle {
    pub bytes: Vec<u8>,
    pub header: EmbedHeader,

    /// Files found across all roots.
    pub discovered: usize,

    /// Bundling stopped early because the next file would pass the limit.
    pub limit_reached: bool,
}

impl Bundle {
    /// Files actually bundled.
    pub fn included(&self) -> usize {
        self.header.files.len()
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Concatenate the files of `files` in order until `limit` would be passed.
pub fn build_bundle(files: &FileSet, limit: u64, version: EmbedVersion) -> Result<Bundle> {
    let mut bytes = Vec::new();
    let mut header = EmbedHeader::new(version);
    let mut limit_reached = false;

    for (embed_path, local_path) in files.iter() {
        let size = fs::metadata(local_path)?.len();
        let offset = bytes.len() as u64;
        if offset + size > limit {
            warn!(
                bytes = offset,
                limit = %to_human(limit),
                next = embed_path,
                "size limit reached"
            );
            limit_reached = true;
            break;
        }

        // Bounded by the size checked against the limit.
        let read = File::open(local_path)?.take(size).read_to_end(&mut bytes)? as u64;
        if read != size {
            warn!(embed_path, expected = size, read, "file shrank while bundling");
        }
        header
            .files
            .insert(embed_path.to_string(), FileEntry { offset, size: read });
    }

    info!(
        files = header.files.len(),
        discovered = files.len(),
        bytes = bytes.len(),
        "embed bundle ready"
    );

    Ok(Bundle {
        bytes,
        header,
        discovered: files.len(),
        limit_reached,
    })
}

/// What a splice wrote, or would write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpliceReport {
    /// Bytes before the first payload; where the embed bundle starts.
    pub host_runtime_size: u64,

    pub embed_bundle_len: u64,
    pub embed_metadata_len: u64,

    /// Embed bundle + metadata + trailer; how far the compile payload moved.
    pub embed_payload_len: u64,

    pub files: usize,
    pub compile_before: BundleMetadataLayout,
    pub compile_after: BundleMetadataLayout,
    pub final_len: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpliceOutcome {
    Embedded(SpliceReport),

    /// Dry run: nothing was written.
    WouldEmbed(SpliceReport),

    /// No compile trailer: not a packaged executable.
    NotPackaged,

    /// An embed trailer is already present; embedding twice is refused.
    AlreadyEmbedded,
}

/// Offsets and metadata bytes for splicing `bundle` before `compile`.
struct SplicePlan<'a> {
    bundle: &'a [u8],
    metadata: Vec<u8>,
    report: SpliceReport,
}

impl<'a> SplicePlan<'a> {
    fn new(bundle: &'a Bundle, compile: BundleMetadataLayout) -> Result<Self> {
        let host_runtime_size = compile.bundle_offset;
        let metadata = bundle.header.rebased(host_runtime_size).to_bytes()?;
        let embed_bundle_len = bundle.len();
        let embed_metadata_len = metadata.len() as u64;
        let embed_payload_len = embed_bundle_len + embed_metadata_len + TRAILER_SIZE;

        let compile_after = BundleMetadataLayout {
            bundle_offset: compile.bundle_offset + embed_payload_len,
            metadata_offset: compile.metadata_offset + embed_payload_len,
            ..compile
        };
        let final_len = compile_after.trailer_offset() + TRAILER_SIZE;

        Ok(Self {
            bundle: &bundle.bytes,
            metadata,
            report: SpliceReport {
                host_runtime_size,
                embed_bundle_len,
                embed_metadata_len,
                embed_payload_len,
                files: bundle.included(),
                compile_before: compile,
                compile_after,
                final_len,
            },
        })
    }

    fn embed_metadata_offset(&self) -> u64 {
        self.report.host_runtime_size + self.report.embed_bundle_len
    }

    /// Append embed payload and relocated compile payload at EOF.
    fn write(&self, file: &mut File, compile_payload: &[u8]) -> Result<()> {
        let host = self.report.host_runtime_size;
        let eof = file.seek(SeekFrom::End(0))?;
        if eof != host {
            return Err(EmbedError::MalformedBinary(format!(
                "expected EOF at {} after truncation, found {}",
                as_hex(host),
                as_hex(eof)
            )));
        }

        file.write_all(self.bundle)?;
        debug!(range = %format!("[{},{})", as_hex(host), as_hex(self.embed_metadata_offset())), "wrote embed bundle");
        file.write_all(&self.metadata)?;
        write_trailer(file, &EMBED_MAGIC, host, self.embed_metadata_offset())?;

        file.write_all(compile_payload)?;
        let after = &self.report.compile_after;
        write_trailer(file, &COMPILE_MAGIC, after.bundle_offset, after.metadata_offset)?;
        file.flush()?;
        file.sync_data()?;
        Ok(())
    }

    /// Re-scan and compare against what was written.
    fn verify(&self, file: &mut File) -> Result<()> {
        let layout = scan_layout(file)?;
        let compile = layout.compile_payload.ok_or(EmbedError::IntegrityCheckFailed {
            field: "compile payload",
            expected: "present".to_string(),
            actual: "absent".to_string(),
        })?;
        let embed = layout.embed_payload.ok_or(EmbedError::IntegrityCheckFailed {
            field: "embed payload",
            expected: "present".to_string(),
            actual: "absent".to_string(),
        })?;

        let after = &self.report.compile_after;
        let checks = [
            ("compile bundle offset", after.bundle_offset, compile.bundle_offset),
            ("compile metadata offset", after.metadata_offset, compile.metadata_offset),
            ("embed bundle offset", self.report.host_runtime_size, embed.bundle_offset),
            ("embed metadata offset", self.embed_metadata_offset(), embed.metadata_offset),
            ("file length", self.report.final_len, file.seek(SeekFrom::End(0))?),
        ];
        for (field, expected, actual) in checks {
            if expected != actual {
                return Err(EmbedError::IntegrityCheckFailed {
                    field,
                    expected: as_hex(expected),
                    actual: as_hex(actual),
                });
            }
        }
        Ok(())
    }
}

/// Read exactly `len` bytes at `offset`.
fn read_region<R: Read + Seek>(reader: &mut R, offset: u64, len: u64) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len as usize];
    reader.seek(SeekFrom::Start(offset))?;
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Put the original host runtime + compile payload + trailer back.
fn restore(file: &mut File, compile: &BundleMetadataLayout, compile_payload: &[u8]) -> Result<()> {
    file.set_len(compile.bundle_offset)?;
    file.seek(SeekFrom::End(0))?;
    file.write_all(compile_payload)?;
    write_trailer(file, &COMPILE_MAGIC, compile.bundle_offset, compile.metadata_offset)?;
    file.flush()?;
    file.sync_data()?;
    Ok(())
}

/// Splice `bundle` into the executable at `path`.
pub fn splice(path: &Path, bundle: &Bundle, dry_run: bool) -> Result<SpliceOutcome> {
    let mut file = if dry_run {
        File::open(path)?
    } else {
        OpenOptions::new().read(true).write(true).open(path)?
    };

    let layout = scan_layout(&mut file)?;
    let Some(compile) = layout.compile_payload else {
        warn!(binary = %path.display(), "skipping uncompiled binary");
        return Ok(SpliceOutcome::NotPackaged);
    };
    if layout.embed_payload.is_some() {
        warn!(binary = %path.display(), "skipping binary that already has an embed filesystem");
        return Ok(SpliceOutcome::AlreadyEmbedded);
    }

    let plan = SplicePlan::new(bundle, compile)?;
    if dry_run {
        return Ok(SpliceOutcome::WouldEmbed(plan.report));
    }

    let compile_payload = read_region(&mut file, compile.bundle_offset, compile.payload_len())?;
    debug!(
        host = %format!("[0x0,{})", as_hex(compile.bundle_offset)),
        compile_bundle = compile.bundle_len,
        compile_metadata = compile.metadata_len,
        "holding compile payload in memory"
    );

    apply(path, &mut file, &plan, &compile, &compile_payload)?;
    info!(
        binary = %path.display(),
        files = plan.report.files,
        embed_bytes = plan.report.embed_payload_len,
        "binary OK"
    );
    Ok(SpliceOutcome::Embedded(plan.report))
}

/// Truncate to the host runtime, write `plan` and verify it. On failure the
/// original image is put back before the error is returned.
fn apply(
    path: &Path,
    file: &mut File,
    plan: &SplicePlan<'_>,
    compile: &BundleMetadataLayout,
    compile_payload: &[u8],
) -> Result<()> {
    file.set_len(plan.report.host_runtime_size)?;
    let result = plan
        .write(file, compile_payload)
        .and_then(|()| plan.verify(file));

    if let Err(e) = &result {
        error!(binary = %path.display(), error = %e, "splice failed, restoring original");
        if let Err(restore_err) = restore(file, compile, compile_payload) {
            error!(binary = %path.display(), error = %restore_err, "restore failed");
        }
    }
    result
}

/// Result of one target binary.
#[derive(Debug)]
pub struct TargetReport {
    pub path: PathBuf,
    pub result: Result<SpliceOutcome>,
}

/// Result of a whole embed run.
#[derive(Debug)]
pub struct BuildReport {
    pub discovered: usize,
    pub included: usize,
    pub bundle_len: u64,
    pub limit_reached: bool,
    pub collisions: Vec<Collision>,
    pub targets: Vec<TargetReport>,
}

impl BuildReport {
    /// Targets whose splice returned an error of any kind.
    pub fn failures(&self) -> usize {
        self.targets.iter().filter(|t| t.result.is_err()).count()
    }

    pub fn integrity_failures(&self) -> usize {
        self.targets
            .iter()
            .filter(|t| matches!(t.result, Err(EmbedError::IntegrityCheckFailed { .. })))
            .count()
    }
}

/// Collect, bundle, and splice into every target.
///
/// Root errors abort the run. Per-target errors are recorded in the report.
pub fn build_embed(options: &EmbedOptions, targets: &[PathBuf]) -> Result<BuildReport> {
    let files = collect_files(&options.roots)?;
    let bundle = build_bundle(&files, options.limit, options.version.clone())?;

    let targets = targets
        .iter()
        .map(|path| {
            info!(binary = %path.display(), dry_run = options.dry_run, "embedding");
            TargetReport {
                path: path.clone(),
                result: splice(path, &bundle, options.dry_run),
            }
        })
        .collect();

    Ok(BuildReport {
        discovered: bundle.discovered,
        included: bundle.included(),
        bundle_len: bundle.len(),
        limit_reached: bundle.limit_reached,
        collisions: files.collisions().to_vec(),
        targets,
    })
}
