//! Virtual filesystem view
//!
//! The embed header is a flat map keyed by path. Serving it over HTTP also
//! needs directory listings, so this module builds a tree from the flat
//! keys and resolves request paths to either file contents or a listing.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use super::header::EmbedHeader;
use super::loader::EmbedReader;
use crate::error::{EmbedError, Result};

/// Content type for paths with an unknown extension.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const KNOWN_MEDIA_TYPES: &[(&str, &str)] = &[
    ("md", "text/plain"),
    ("html", "text/html"),
    ("json", "application/json"),
    ("map", "application/json"),
    ("txt", "text/plain"),
    ("js", "application/javascript"),
    ("gz", "application/gzip"),
    ("css", "text/css"),
    ("wasm", "application/wasm"),
    ("mjs", "application/javascript"),
    ("svg", "image/svg+xml"),
    ("ico", "image/x-icon"),
];

/// Content type derived from the extension of `path`.
pub fn content_type(path: &str) -> &'static str {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .and_then(|ext| KNOWN_MEDIA_TYPES.iter().find(|(known, _)| *known == ext))
        .map(|(_, media)| *media)
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

/// A node of the directory tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    /// Full virtual path of the file, for lookup in the header.
    File(String),
    Dir(BTreeMap<String, TreeNode>),
}

/// Hierarchical view over an [`EmbedHeader`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedTree {
    root: BTreeMap<String, TreeNode>,
}

impl EmbedTree {
    /// Build the tree. Fails if a path is both a file and a directory,
    /// e.g. `/cat` and `/cat/food`.
    pub fn build(header: &EmbedHeader) -> Result<Self> {
        let mut root = BTreeMap::new();

        for file_path in header.files.keys() {
            let mut parts: Vec<&str> = file_path.split('/').filter(|p| !p.is_empty()).collect();
            let Some(file) = parts.pop() else {
                continue;
            };

            let mut dir = &mut root;
            for part in parts {
                let node = dir
                    .entry(part.to_string())
                    .or_insert_with(|| TreeNode::Dir(BTreeMap::new()));
                dir = match node {
                    TreeNode::Dir(children) => children,
                    TreeNode::File(existing) => {
                        return Err(EmbedError::MalformedBinary(format!(
                            "{} is both a file and a directory of {}",
                            existing, file_path
                        )));
                    }
                };
            }
            if let Some(TreeNode::Dir(_)) = dir.get(file) {
                return Err(EmbedError::MalformedBinary(format!(
                    "{} is both a file and a directory",
                    file_path
                )));
            }
            dir.insert(file.to_string(), TreeNode::File(file_path.clone()));
        }

        Ok(Self { root })
    }

    /// Node at `path`; `/` and `""` are the root directory.
    pub fn lookup(&self, path: &str) -> Option<TreeNode> {
        let mut dir = &self.root;
        let mut parts = path.split('/').filter(|p| !p.is_empty()).peekable();
        if parts.peek().is_none() {
            return Some(TreeNode::Dir(self.root.clone()));
        }
        while let Some(part) = parts.next() {
            match dir.get(part)? {
                TreeNode::Dir(children) => {
                    if parts.peek().is_none() {
                        return Some(TreeNode::Dir(children.clone()));
                    }
                    dir = children;
                }
                TreeNode::File(full) => {
                    // A file in the middle of a path, e.g. /index.html/x
                    return parts.peek().is_none().then(|| TreeNode::File(full.clone()));
                }
            }
        }
        None
    }
}

/// One line of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingEntry {
    /// Entry name; directories end in `/`.
    pub name: String,

    /// File size; absent for directories.
    pub size: Option<u64>,
}

/// What a request path resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    File {
        bytes: Arc<[u8]>,
        content_type: &'static str,
    },
    Listing(Vec<ListingEntry>),
}

/// Resolve `path` against the embedded filesystem.
pub fn resolve<R>(reader: &EmbedReader<R>, tree: &EmbedTree, path: &str) -> Result<Resolved>
where
    R: std::io::Read + std::io::Seek,
{
    if reader.contains(path) {
        return Ok(Resolved::File {
            bytes: reader.read_file(path)?,
            content_type: content_type(path),
        });
    }

    match tree.lookup(path) {
        Some(TreeNode::Dir(children)) => {
            let entries = children
                .iter()
                .map(|(name, node)| match node {
                    TreeNode::File(full) => ListingEntry {
                        name: name.clone(),
                        size: reader.header().files.get(full).map(|e| e.size),
                    },
                    TreeNode::Dir(_) => ListingEntry {
                        name: format!("{}/", name),
                        size: None,
                    },
                })
                .collect();
            Ok(Resolved::Listing(entries))
        }
        Some(TreeNode::File(full)) => Ok(Resolved::File {
            bytes: reader.read_file(&full)?,
            content_type: content_type(&full),
        }),
        None => Err(EmbedError::NotFound(path.to_string())),
    }
}
