//! `localstar inspect` — Print where each payload of a binary lives.

use anyhow::Context;
use std::fs::File;
use std::path::{Path, PathBuf};

use localstar_embed::bundle::{scan_layout, BundleMetadataLayout, EmbedReader, TRAILER_SIZE};
use localstar_embed::byte_size::to_human;
use localstar_embed::error::as_hex;

use crate::output::StyledOutput;

pub fn execute(binaries: &[PathBuf], out: &mut StyledOutput) -> anyhow::Result<()> {
    for (i, binary) in binaries.iter().enumerate() {
        if i > 0 {
            out.newline();
        }
        inspect(binary, out).with_context(|| format!("Failed to inspect {}", binary.display()))?;
    }
    Ok(())
}

fn inspect(binary: &Path, out: &mut StyledOutput) -> anyhow::Result<()> {
    let mut file = File::open(binary)?;
    let len = file.metadata()?.len();
    let layout = scan_layout(&mut file)?;

    out.bold(&format!("{}", binary.display()));
    out.line(&format!(" ({})", to_human(len)));

    let Some(host) = layout.host_runtime_size() else {
        out.info("  Not a packaged executable");
        out.newline();
        return Ok(());
    };
    out.line(&format!("  Host runtime:      [0x0,{})", as_hex(host)));

    if let Some(embed) = &layout.embed_payload {
        print_payload("Embed", embed, out);
        let reader = EmbedReader::open(binary)?;
        let header = reader.header();
        out.line(&format!(
            "  Embedded files:    {} ({})",
            header.files.len(),
            to_human(header.total_size())
        ));
        out.line(&format!(
            "  Versions:          host runtime {}, payload {}",
            header.version.host_runtime, header.version.payload
        ));
    } else {
        out.info("  No embedded filesystem");
        out.newline();
    }

    if let Some(compile) = &layout.compile_payload {
        print_payload("Compile", compile, out);
    }
    Ok(())
}

fn print_payload(kind: &str, payload: &BundleMetadataLayout, out: &mut StyledOutput) {
    let trailer = payload.trailer_offset();
    out.line(&format!(
        "  {:<8} bundle:   [{},{})",
        kind,
        as_hex(payload.bundle_offset),
        as_hex(payload.metadata_offset)
    ));
    out.line(&format!(
        "  {:<8} metadata: [{},{})",
        kind,
        as_hex(payload.metadata_offset),
        as_hex(trailer)
    ));
    out.line(&format!(
        "  {:<8} trailer:  [{},{})",
        kind,
        as_hex(trailer),
        as_hex(trailer + TRAILER_SIZE)
    ));
}
