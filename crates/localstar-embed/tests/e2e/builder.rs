//! Splicing embed payloads into fabricated executables.

use super::harness::{
    compiled_image, site_root, write_compiled, write_file, COMPILE_BUNDLE, COMPILE_METADATA,
    HOST_SIZE,
};
use localstar_embed::bundle::{
    build_embed, scan_layout, EmbedOptions, EmbedReader, SpliceOutcome, SpliceReport, TRAILER_SIZE,
};
use localstar_embed::EmbedError;
use std::fs::{self, File};

fn embedded(outcome: &Result<SpliceOutcome, EmbedError>) -> &SpliceReport {
    match outcome {
        Ok(SpliceOutcome::Embedded(report)) => report,
        other => panic!("expected embedded outcome, got {:?}", other),
    }
}

#[test]
fn test_round_trip() {
    let temp = tempfile::tempdir().unwrap();
    let root = site_root(temp.path());
    let binary = write_compiled(temp.path(), "app");

    let report = build_embed(&EmbedOptions::new(vec![root.clone()]), &[binary.clone()]).unwrap();
    assert_eq!(report.discovered, 5);
    assert_eq!(report.included, 5);
    assert!(!report.limit_reached);
    embedded(&report.targets[0].result);

    let layout = scan_layout(&mut File::open(&binary).unwrap()).unwrap();
    assert!(layout.compile_payload.is_some());
    assert!(layout.embed_payload.is_some());

    let reader = EmbedReader::open(&binary).unwrap();
    let files = reader.list_files();
    assert_eq!(files.len(), 5);
    for file in files {
        let local = root.join(file.path.trim_start_matches('/'));
        let expected = fs::read(&local).unwrap();
        assert_eq!(file.size, expected.len() as u64);
        assert_eq!(&*reader.read_file(&file.path).unwrap(), expected.as_slice(), "{}", file.path);
    }
}

#[test]
fn test_host_and_compile_payload_preserved() {
    let temp = tempfile::tempdir().unwrap();
    let root = site_root(temp.path());
    let binary = write_compiled(temp.path(), "app");
    let original = compiled_image();

    let report = build_embed(&EmbedOptions::new(vec![root]), &[binary.clone()]).unwrap();
    let splice = embedded(&report.targets[0].result);

    let data = fs::read(&binary).unwrap();
    assert_eq!(data.len() as u64, splice.final_len);
    assert_eq!(&data[..HOST_SIZE], &original[..HOST_SIZE]);

    let compile_start = splice.compile_after.bundle_offset as usize;
    let compile_len = COMPILE_BUNDLE.len() + COMPILE_METADATA.len();
    assert_eq!(&data[compile_start..compile_start + COMPILE_BUNDLE.len()], COMPILE_BUNDLE);
    assert_eq!(
        &data[compile_start + COMPILE_BUNDLE.len()..compile_start + compile_len],
        COMPILE_METADATA
    );
    assert_eq!(&data[data.len() - 24..data.len() - 16], b"d3n0l4nd");
}

#[test]
fn test_offset_shift_invariant() {
    let temp = tempfile::tempdir().unwrap();
    let root = site_root(temp.path());
    let binary = write_compiled(temp.path(), "app");

    let before = scan_layout(&mut File::open(&binary).unwrap())
        .unwrap()
        .compile_payload
        .unwrap();
    let report = build_embed(&EmbedOptions::new(vec![root]), &[binary.clone()]).unwrap();
    let splice = embedded(&report.targets[0].result);
    let after = scan_layout(&mut File::open(&binary).unwrap())
        .unwrap()
        .compile_payload
        .unwrap();

    assert_eq!(
        splice.embed_payload_len,
        splice.embed_bundle_len + splice.embed_metadata_len + TRAILER_SIZE
    );
    assert_eq!(after.bundle_offset, before.bundle_offset + splice.embed_payload_len);
    assert_eq!(after.metadata_offset, before.metadata_offset + splice.embed_payload_len);
    assert_eq!(after.bundle_len, before.bundle_len);
    assert_eq!(after.metadata_len, before.metadata_len);
}

#[test]
fn test_refuses_to_embed_twice() {
    let temp = tempfile::tempdir().unwrap();
    let root = site_root(temp.path());
    let binary = write_compiled(temp.path(), "app");
    let options = EmbedOptions::new(vec![root]);

    build_embed(&options, &[binary.clone()]).unwrap();
    let once = fs::read(&binary).unwrap();

    let report = build_embed(&options, &[binary.clone()]).unwrap();
    assert!(matches!(report.targets[0].result, Ok(SpliceOutcome::AlreadyEmbedded)));
    assert_eq!(fs::read(&binary).unwrap(), once);
}

#[test]
fn test_targets_are_isolated() {
    let temp = tempfile::tempdir().unwrap();
    let root = site_root(temp.path());
    let plain = temp.path().join("plain");
    fs::write(&plain, b"not a compiled executable at all").unwrap();
    let missing = temp.path().join("missing");
    let binary = write_compiled(temp.path(), "app");

    let report = build_embed(
        &EmbedOptions::new(vec![root]),
        &[plain.clone(), missing, binary.clone()],
    )
    .unwrap();

    assert!(matches!(report.targets[0].result, Ok(SpliceOutcome::NotPackaged)));
    assert!(matches!(report.targets[1].result, Err(EmbedError::Io(_))));
    embedded(&report.targets[2].result);
    assert_eq!(report.integrity_failures(), 0);
    assert_eq!(fs::read(&plain).unwrap(), b"not a compiled executable at all");
}

#[test]
fn test_dry_run_writes_nothing() {
    let temp = tempfile::tempdir().unwrap();
    let root = site_root(temp.path());
    let binary = write_compiled(temp.path(), "app");

    let mut options = EmbedOptions::new(vec![root]);
    options.dry_run = true;
    let report = build_embed(&options, &[binary.clone()]).unwrap();

    match &report.targets[0].result {
        Ok(SpliceOutcome::WouldEmbed(plan)) => {
            assert_eq!(plan.host_runtime_size, HOST_SIZE as u64);
            assert_eq!(plan.files, 5);
        }
        other => panic!("expected dry run outcome, got {:?}", other),
    }
    assert_eq!(fs::read(&binary).unwrap(), compiled_image());
}

#[test]
fn test_later_root_wins() {
    let temp = tempfile::tempdir().unwrap();
    let a = temp.path().join("a");
    let b = temp.path().join("b");
    write_file(&a, "x.txt", b"aaaaa");
    write_file(&a, "sub/y.txt", b"yyy");
    write_file(&b, "x.txt", b"bbbbbbb");
    let binary = write_compiled(temp.path(), "app");

    let report = build_embed(&EmbedOptions::new(vec![a, b]), &[binary.clone()]).unwrap();
    assert_eq!(report.collisions.len(), 1);
    assert_eq!(report.collisions[0].virtual_path, "/x.txt");

    let reader = EmbedReader::open(&binary).unwrap();
    assert_eq!(reader.header().files["/x.txt"].size, 7);
    assert_eq!(reader.header().files["/sub/y.txt"].size, 3);
    assert_eq!(&*reader.read_file("/x.txt").unwrap(), b"bbbbbbb");
}

#[test]
fn test_size_limit_boundary() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("root");
    write_file(&root, "a.bin", &[1u8; 100]);
    write_file(&root, "b.bin", &[2u8; 50]);
    write_file(&root, "c.bin", &[3u8; 1]);
    let binary = write_compiled(temp.path(), "app");

    let mut options = EmbedOptions::new(vec![root]);
    options.limit = 150;
    let report = build_embed(&options, &[binary.clone()]).unwrap();
    assert_eq!(report.discovered, 3);
    assert_eq!(report.included, 2);
    assert_eq!(report.bundle_len, 150);
    assert!(report.limit_reached);

    let reader = EmbedReader::open(&binary).unwrap();
    assert!(reader.contains("/a.bin"));
    assert!(reader.contains("/b.bin"));
    assert!(!reader.contains("/c.bin"));
}

#[test]
fn test_empty_root_still_embeds() {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("empty");
    fs::create_dir_all(&root).unwrap();
    let binary = write_compiled(temp.path(), "app");

    let report = build_embed(&EmbedOptions::new(vec![root]), &[binary.clone()]).unwrap();
    let splice = embedded(&report.targets[0].result);
    assert_eq!(splice.embed_bundle_len, 0);

    let reader = EmbedReader::open(&binary).unwrap();
    assert!(reader.is_embedded());
    assert!(!reader.header().is_unembedded());
    assert!(reader.list_files().is_empty());
}

#[test]
fn test_invalid_root_aborts_run() {
    let temp = tempfile::tempdir().unwrap();
    let binary = write_compiled(temp.path(), "app");
    let err = build_embed(
        &EmbedOptions::new(vec![temp.path().join("nope")]),
        &[binary.clone()],
    )
    .unwrap_err();
    assert!(matches!(err, EmbedError::InvalidRoot(_)));
    assert_eq!(fs::read(&binary).unwrap(), compiled_image());
}
