//! Serving an embedded filesystem from a spliced executable.

use super::harness::{site_root, write_compiled};
use localstar_embed::bundle::{build_embed, resolve, EmbedOptions, EmbedReader, EmbedTree, ListingEntry, Resolved};
use localstar_embed::EmbedError;
use std::fs;

fn embedded_site() -> (tempfile::TempDir, EmbedReader) {
    let temp = tempfile::tempdir().unwrap();
    let root = site_root(temp.path());
    let binary = write_compiled(temp.path(), "app");
    build_embed(&EmbedOptions::new(vec![root]), &[binary.clone()]).unwrap();
    let reader = EmbedReader::open(&binary).unwrap();
    (temp, reader)
}

#[test]
fn test_resolve_file() {
    let (_temp, reader) = embedded_site();
    let tree = EmbedTree::build(reader.header()).unwrap();

    match resolve(&reader, &tree, "/index.html").unwrap() {
        Resolved::File { bytes, content_type } => {
            assert_eq!(&*bytes, b"<!doctype html><title>localstar</title>");
            assert_eq!(content_type, "text/html");
        }
        other => panic!("expected file, got {:?}", other),
    }
}

#[test]
fn test_resolve_listing() {
    let (_temp, reader) = embedded_site();
    let tree = EmbedTree::build(reader.header()).unwrap();

    let Resolved::Listing(root) = resolve(&reader, &tree, "/").unwrap() else {
        panic!("expected root listing");
    };
    assert_eq!(
        root,
        vec![
            ListingEntry { name: "empty.txt".to_string(), size: Some(0) },
            ListingEntry { name: "img/".to_string(), size: None },
            ListingEntry { name: "index.html".to_string(), size: Some(39) },
            ListingEntry { name: "js/".to_string(), size: None },
        ]
    );

    let Resolved::Listing(js) = resolve(&reader, &tree, "/js").unwrap() else {
        panic!("expected js listing");
    };
    let names: Vec<_> = js.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["app.js", "vendor/"]);
}

#[test]
fn test_resolve_not_found() {
    let (_temp, reader) = embedded_site();
    let tree = EmbedTree::build(reader.header()).unwrap();
    assert!(matches!(
        resolve(&reader, &tree, "/nope.html"),
        Err(EmbedError::NotFound(_))
    ));
    assert!(matches!(
        resolve(&reader, &tree, "/index.html/x"),
        Err(EmbedError::NotFound(_))
    ));
}

#[test]
fn test_listing_serializes_like_a_directory_index() {
    let entry = ListingEntry { name: "js/".to_string(), size: None };
    let json = serde_json::to_string(&entry).unwrap();
    assert_eq!(json, r#"{"name":"js/","size":null}"#);
}

#[test]
fn test_reader_on_unpackaged_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("plain");
    fs::write(&path, b"plain file").unwrap();
    let reader = EmbedReader::open(&path).unwrap();
    assert!(!reader.layout().is_packaged());
    assert!(reader.header().is_unembedded());
}
