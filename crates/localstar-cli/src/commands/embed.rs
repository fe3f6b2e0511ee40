//! `localstar embed` — Splice a filesystem into compiled executables.

use anyhow::Context;
use termcolor::Color;
use tracing::debug;

use localstar_embed::bundle::{build_embed, BuildReport, EmbedOptions, SpliceOutcome, SpliceReport};
use localstar_embed::byte_size::to_human;
use localstar_embed::error::as_hex;
use std::path::PathBuf;

use crate::output::StyledOutput;

pub fn execute(
    options: &EmbedOptions,
    binaries: &[PathBuf],
    out: &mut StyledOutput,
) -> anyhow::Result<()> {
    debug!(
        roots = ?options.roots,
        limit = options.limit,
        dry_run = options.dry_run,
        "embed options"
    );
    let report = build_embed(options, binaries).context("Failed to build embed bundle")?;
    print_report(&report, options.dry_run, out);
    check_report(&report)
}

/// Skipped targets are fine; any target that errored fails the run.
fn check_report(report: &BuildReport) -> anyhow::Result<()> {
    let integrity = report.integrity_failures();
    if integrity > 0 {
        anyhow::bail!("{} binary(s) failed the integrity check", integrity);
    }
    let failures = report.failures();
    if failures > 0 {
        anyhow::bail!("{} binary(s) could not be embedded", failures);
    }
    Ok(())
}

fn print_report(report: &BuildReport, dry_run: bool, out: &mut StyledOutput) {
    for collision in &report.collisions {
        out.warning("⚠ ");
        out.line(&format!(
            "File {} overwrites {} for embed path {}",
            collision.replacement.display(),
            collision.previous.display(),
            collision.virtual_path
        ));
    }

    out.bold("Embed bundle: ");
    out.line(&format!(
        "{} files ({})",
        report.included,
        to_human(report.bundle_len)
    ));
    if report.limit_reached {
        out.warning("⚠ Size limit reached: ");
        out.line(&format!(
            "bundled {} of {} files",
            report.included, report.discovered
        ));
    }
    if dry_run {
        out.info("Dry run: no binary will be modified");
        out.newline();
    }

    for target in &report.targets {
        out.newline();
        match &target.result {
            Ok(SpliceOutcome::Embedded(splice)) => {
                out.badge("EMBED", Color::Green);
                out.line(&format!(" {}", target.path.display()));
                print_splice(splice, out);
                out.success("Binary OK");
                out.newline();
            }
            Ok(SpliceOutcome::WouldEmbed(splice)) => {
                out.badge("DRY", Color::Cyan);
                out.line(&format!(" {}", target.path.display()));
                print_splice(splice, out);
            }
            Ok(SpliceOutcome::NotPackaged) => {
                out.badge("SKIP", Color::Yellow);
                out.line(&format!(" {}: not a packaged executable", target.path.display()));
            }
            Ok(SpliceOutcome::AlreadyEmbedded) => {
                out.badge("SKIP", Color::Yellow);
                out.line(&format!(" {}: already embedded", target.path.display()));
            }
            Err(e) => {
                out.badge("FAIL", Color::Red);
                out.line(&format!(" {}", target.path.display()));
                out.error(&format!("  {}", e));
                out.newline();
            }
        }
    }
}

fn print_splice(splice: &SpliceReport, out: &mut StyledOutput) {
    let host = splice.host_runtime_size;
    let metadata = host + splice.embed_bundle_len;
    let trailer = metadata + splice.embed_metadata_len;
    let after = &splice.compile_after;
    out.line(&format!("  Host runtime:      [0x0,{})", as_hex(host)));
    out.line(&format!(
        "  Embed bundle:      [{},{}) {} files",
        as_hex(host),
        as_hex(metadata),
        splice.files
    ));
    out.line(&format!("  Embed metadata:    [{},{})", as_hex(metadata), as_hex(trailer)));
    out.line(&format!(
        "  Compile bundle:    {} -> {}",
        as_hex(splice.compile_before.bundle_offset),
        as_hex(after.bundle_offset)
    ));
    out.line(&format!(
        "  Compile metadata:  {} -> {}",
        as_hex(splice.compile_before.metadata_offset),
        as_hex(after.metadata_offset)
    ));
    out.line(&format!(
        "  Final size:        {} (+{})",
        to_human(splice.final_len),
        to_human(splice.embed_payload_len)
    ));
}
