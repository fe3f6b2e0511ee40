//! Test harness for fabricated executables
//!
//! A fabricated executable is a fake host runtime image followed by a
//! compile bundle, compile metadata and a `d3n0l4nd` trailer, which is all
//! the scanner and builder look at.

use localstar_embed::bundle::{write_trailer, COMPILE_MAGIC};
use std::fs;
use std::path::{Path, PathBuf};

pub const HOST_SIZE: usize = 4096;
pub const COMPILE_BUNDLE: &[u8] = b"console.log('hello from the compiled bundle');";
pub const COMPILE_METADATA: &[u8] = br#"{"argv":[],"unstable":false}"#;

/// Bytes of a compiled executable with no embed payload.
pub fn compiled_image() -> Vec<u8> {
    let mut data: Vec<u8> = (0..HOST_SIZE).map(|i| (i % 251) as u8).collect();
    data.extend_from_slice(COMPILE_BUNDLE);
    data.extend_from_slice(COMPILE_METADATA);
    let bundle_offset = HOST_SIZE as u64;
    let metadata_offset = bundle_offset + COMPILE_BUNDLE.len() as u64;
    write_trailer(&mut data, &COMPILE_MAGIC, bundle_offset, metadata_offset).unwrap();
    data
}

/// Write a compiled executable to `dir/name`.
pub fn write_compiled(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, compiled_image()).unwrap();
    path
}

/// Create `root/relative` with `contents`, making parent directories.
pub fn write_file(root: &Path, relative: &str, contents: &[u8]) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// A source root holding a small static site.
pub fn site_root(dir: &Path) -> PathBuf {
    let root = dir.join("site");
    write_file(&root, "index.html", b"<!doctype html><title>localstar</title>");
    write_file(&root, "js/app.js", b"import './vendor/lib.js';");
    write_file(&root, "js/vendor/lib.js", b"export default 42;");
    write_file(&root, "img/logo.svg", b"<svg></svg>");
    write_file(&root, "empty.txt", b"");
    root
}
