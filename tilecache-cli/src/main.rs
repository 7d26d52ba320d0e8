//! tilecache: tile cache synchronization CLI.
//!
//! # Usage
//!
//! ```text
//! tilecache sync -src src.db -dst dst.db {[-updateOnly | -noUpdateOnly] -dir layer}
//! tilecache sync --config run.yaml
//! tilecache import -db cache.db {[-flipY | -noFlipY] -dir dir}
//! tilecache export -db cache.db {[-flipY | -noFlipY] -dir dir}
//! ```
//!
//! Argument errors print the usage line and exit with status 2.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{sync::SyncArgs, transfer::TransferArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "tilecache",
    version,
    about = "Synchronize, import and export SQLite map tile caches",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Copy fresher tiles from a source cache into a destination cache.
    Sync(SyncArgs),

    /// Load zoom/x/y tile directories into a cache.
    Import(TransferArgs),

    /// Write cache layers out as zoom/x/y tile directories.
    Export(TransferArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Sync(args) => args.run(),
        Commands::Import(args) => args.run_import(),
        Commands::Export(args) => args.run_export(),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
