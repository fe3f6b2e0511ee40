//! `localstar ls` — List the embedded filesystem of a binary.

use anyhow::Context;
use std::path::Path;

use localstar_embed::bundle::{resolve, EmbedReader, EmbedTree, ListingEntry, Resolved};
use localstar_embed::byte_size::to_human;

use crate::output::StyledOutput;

pub fn execute(
    binary: &Path,
    path: Option<&str>,
    json: bool,
    out: &mut StyledOutput,
) -> anyhow::Result<()> {
    let reader = EmbedReader::open(binary)
        .with_context(|| format!("Failed to read {}", binary.display()))?;
    if !reader.is_embedded() {
        anyhow::bail!("{} has no embedded filesystem", binary.display());
    }

    let Some(path) = path else {
        let files = reader.list_files();
        if json {
            let listing: Vec<_> = files
                .iter()
                .map(|f| ListingEntry {
                    name: f.path.clone(),
                    size: Some(f.size),
                })
                .collect();
            out.line(&serde_json::to_string_pretty(&listing)?);
        } else {
            for file in &files {
                out.line(&format!("{:>10}  {}", to_human(file.size), file.path));
            }
        }
        return Ok(());
    };

    let tree = EmbedTree::build(reader.header())?;
    match resolve(&reader, &tree, path)? {
        Resolved::Listing(entries) => {
            if json {
                out.line(&serde_json::to_string_pretty(&entries)?);
            } else {
                for entry in &entries {
                    let size = entry.size.map(to_human).unwrap_or_default();
                    out.line(&format!("{:>10}  {}", size, entry.name));
                }
            }
        }
        Resolved::File {
            bytes,
            content_type,
        } => {
            if json {
                let entry = serde_json::json!({
                    "name": path,
                    "size": bytes.len(),
                    "contentType": content_type,
                });
                out.line(&serde_json::to_string_pretty(&entry)?);
            } else {
                out.line(&format!(
                    "{:>10}  {}  {}",
                    to_human(bytes.len() as u64),
                    path,
                    content_type
                ));
            }
        }
    }
    Ok(())
}
