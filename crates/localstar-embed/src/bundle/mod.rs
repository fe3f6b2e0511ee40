//! Embedded filesystem bundles
//!
//! Handles the embed payload spliced into a compiled executable:
//! - **format**: 24-byte trailer codec shared by compile and embed payloads
//! - **layout**: locates the compile and embed trailers of a binary
//! - **header**: JSON metadata describing every embedded file
//! - **builder**: packs directory trees and splices them into executables
//! - **loader**: reads embedded files back out of the running executable
//! - **vfs**: directory tree, listings and content types for serving

pub mod builder;
pub mod format;
pub mod header;
pub mod layout;
pub mod loader;
pub mod vfs;

pub use builder::{
    build_bundle, build_embed, collect_files, splice, BuildReport, Bundle, EmbedOptions, FileSet,
    SpliceOutcome, SpliceReport, TargetReport, DEFAULT_LIMIT,
};
pub use format::{
    read_trailer, write_trailer, BundleMetadataLayout, Trailer, COMPILE_MAGIC, EMBED_MAGIC,
    TRAILER_SIZE,
};
pub use header::{EmbedHeader, EmbedVersion, FileEntry};
pub use layout::{scan_layout, BinaryLayout};
pub use loader::{EmbedReader, EmbeddedFile};
pub use vfs::{content_type, resolve, EmbedTree, ListingEntry, Resolved};
