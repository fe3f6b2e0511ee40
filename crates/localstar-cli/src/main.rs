//! Localstar packaging CLI
//!
//! Embeds file trees into compiled localstar executables and inspects the
//! result:
//!
//! ```bash
//! localstar embed --root=./dir1 --root=./dir2 --limit=20MB ./bin/*
//! localstar embed --root=/path/to/folder --dry-run ./localstar
//! localstar inspect ./localstar
//! localstar ls ./localstar /js
//! ```

mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use localstar_embed::bundle::{EmbedOptions, EmbedVersion, DEFAULT_LIMIT};
use localstar_embed::parse_byte_size;
use output::{resolve_color_choice, StyledOutput};

#[derive(Parser)]
#[command(name = "localstar")]
#[command(about = "Embed a filesystem into compiled localstar executables", long_about = None)]
#[command(version)]
struct Cli {
    /// Log filter, e.g. "info" or "localstar_embed=debug". RUST_LOG wins if set.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// When to color output: auto, always, never
    #[arg(long, global = true)]
    color: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed file trees merged from every --root into compiled executables
    Embed {
        /// Folder to walk. Repeat to overlay later folders on earlier ones
        #[arg(long = "root", value_name = "DIR", required = true)]
        roots: Vec<PathBuf>,

        /// Maximum bundle size, e.g. 20MB (default 100MB)
        #[arg(long, value_name = "SIZE", env = "LOCALSTAR_EMBED_LIMIT", value_parser = parse_limit)]
        limit: Option<u64>,

        /// Scan and report without writing
        #[arg(long)]
        dry_run: bool,

        /// Host runtime version stamped into the embed header
        #[arg(long, value_name = "VERSION")]
        host_version: Option<String>,

        /// Payload version stamped into the embed header
        #[arg(long, value_name = "VERSION")]
        payload_version: Option<String>,

        /// Compiled executables to embed into
        #[arg(value_name = "BINARY", required = true)]
        binaries: Vec<PathBuf>,
    },

    /// Print the payload layout of binaries
    Inspect {
        #[arg(value_name = "BINARY", required = true)]
        binaries: Vec<PathBuf>,
    },

    /// List the embedded filesystem of a binary
    Ls {
        binary: PathBuf,

        /// Directory or file inside the embedded filesystem
        path: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn parse_limit(value: &str) -> Result<u64, String> {
    parse_byte_size(value).map_err(|e| e.to_string())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);
    let mut out = StyledOutput::new(resolve_color_choice(cli.color.as_deref()));

    let result = match cli.command {
        Commands::Embed {
            roots,
            limit,
            dry_run,
            host_version,
            payload_version,
            binaries,
        } => {
            let mut version = EmbedVersion::default();
            if let Some(host) = host_version {
                version.host_runtime = host;
            }
            if let Some(payload) = payload_version {
                version.payload = payload;
            }
            let options = EmbedOptions {
                roots,
                limit: limit.unwrap_or(DEFAULT_LIMIT),
                dry_run,
                version,
            };
            commands::embed::execute(&options, &binaries, &mut out)
        }

        Commands::Inspect { binaries } => commands::inspect::execute(&binaries, &mut out),

        Commands::Ls { binary, path, json } => {
            commands::ls::execute(&binary, path.as_deref(), json, &mut out)
        }
    };

    out.flush();
    if let Err(e) = result {
        out.stderr_error(&format!("Error: {:#}", e));
        std::process::exit(1);
    }
}
