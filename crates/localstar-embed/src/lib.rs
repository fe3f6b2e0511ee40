//! Localstar Embed
//!
//! Embeds a virtual filesystem into compiled localstar executables and reads
//! it back at runtime from the executable's own file.

pub mod bundle;
pub mod byte_size;
pub mod error;

pub use bundle::{
    build_embed, scan_layout, BinaryLayout, EmbedHeader, EmbedOptions, EmbedReader, EmbedTree,
    Resolved, SpliceOutcome,
};
pub use byte_size::{format_byte_size, parse_byte_size, ByteSizeError, FormatOptions};
pub use error::{EmbedError, Result};
