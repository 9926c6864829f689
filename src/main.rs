//! tierdoc - Incremental, cache-backed summaries of a source tree
//!
//! tierdoc provides:
//! - Bottom-up file, directory and codebase summaries through an LLM
//! - A digest-keyed cache under .tierdoc/ so unchanged entities are reused
//! - Freshness reports without any summarizer call
//! - Unified output format (jsonl/json/md/raw)

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

fn main() -> Result<()> {
    // Check for unsupported platforms
    #[cfg(windows)]
    {
        eprintln!("Error: Windows is not supported. Please use WSL (not guaranteed to work).");
        std::process::exit(1);
    }

    let cli = cli::Cli::parse();
    init_tracing(cli.verbose, cli.quiet);
    cli::run(cli)
}

/// Logs go to stderr so stdout stays machine-readable
fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
