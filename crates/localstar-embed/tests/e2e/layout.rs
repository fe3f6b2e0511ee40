//! Layout scanning of real files on disk.

use super::harness::{compiled_image, HOST_SIZE};
use localstar_embed::bundle::{read_trailer, scan_layout, COMPILE_MAGIC};
use std::fs::{self, File};

#[test]
fn test_scan_compiled_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("app");
    fs::write(&path, compiled_image()).unwrap();

    let layout = scan_layout(&mut File::open(&path).unwrap()).unwrap();
    let compile = layout.compile_payload.unwrap();
    assert_eq!(compile.bundle_offset, HOST_SIZE as u64);
    assert!(layout.embed_payload.is_none());
}

#[test]
fn test_scan_arbitrary_files() {
    let temp = tempfile::tempdir().unwrap();
    for (name, contents) in [
        ("empty", Vec::new()),
        ("tiny", b"#!/bin/sh".to_vec()),
        ("zeroes", vec![0u8; 1 << 16]),
        ("text", b"just some text that is longer than a trailer".to_vec()),
    ] {
        let path = temp.path().join(name);
        fs::write(&path, &contents).unwrap();
        let layout = scan_layout(&mut File::open(&path).unwrap()).unwrap();
        assert!(layout.compile_payload.is_none(), "{}", name);
        assert!(layout.embed_payload.is_none(), "{}", name);
    }
}

#[test]
fn test_read_trailer_on_zeroes() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("zeroes");
    fs::write(&path, vec![0u8; 48]).unwrap();
    let found = read_trailer(&mut File::open(&path).unwrap(), 24, &COMPILE_MAGIC).unwrap();
    assert!(found.is_none());
}
