//! feedmirror: keep a local mirror of remote CSV feeds current.
//!
//! # Usage
//!
//! ```text
//! feedmirror [--root <dir>] run [--force] [--dry-run] [--json]
//! feedmirror [--root <dir>] status [--json]
//! feedmirror [--root <dir>] clear-cache
//! feedmirror [--root <dir>] watch [--interval-hours <n>]
//! ```
//!
//! The mirror root defaults to `$FEEDMIRROR_ROOT`, then `~/.feedmirror`.

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{clear_cache::ClearCacheArgs, run::RunArgs, status::StatusArgs, watch::WatchArgs};
use feedmirror_core::Layout;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "feedmirror",
    version,
    about = "Incrementally mirror remote CSV feeds",
    long_about = None,
)]
struct Cli {
    /// Mirror root directory (overrides $FEEDMIRROR_ROOT).
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check every resource and download the ones that changed.
    Run(RunArgs),

    /// Show freshness and the outcome of the last run.
    Status(StatusArgs),

    /// Forget cached remote signals so the next run re-downloads everything.
    ClearCache(ClearCacheArgs),

    /// Run on a fixed interval until interrupted.
    Watch(WatchArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let layout = Layout::discover(cli.root).context("could not resolve the mirror root")?;
    match cli.command {
        Commands::Run(args) => args.run(&layout),
        Commands::Status(args) => args.run(&layout),
        Commands::ClearCache(args) => args.run(&layout),
        Commands::Watch(args) => args.run(&layout),
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
