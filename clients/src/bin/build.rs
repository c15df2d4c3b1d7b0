//! `rootseed-build`: derives the seed tables for a configuration and writes
//! the JSON artifact consumed by the solver renderers.
//!
//! **Usage:**
//! ```text
//! rootseed-build [--config <seed.toml>] [--out <path>] [-v]
//! ```
//!
//! Without `--config` the built-in standard configuration (n = 2..10,
//! FIXED_1 = 10^18) is used.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rootseed::serializer::json::to_json;
use rootseed_clients::{init_logging, load_config};

/// Build the seed table artifact.
#[derive(Parser)]
#[command(name = "rootseed-build", about = "Derive n-th root seed tables and write them as JSON")]
struct Args {
    /// TOML generation config (default: built-in standard ladder).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output artifact path.
    #[arg(long, default_value = "public/seed_tables.json")]
    out: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = load_config(args.config.as_deref())?;
    let tables = rootseed::generate(&config).context("Failed to generate seed tables")?;

    let branches: usize = tables.iter().map(|t| t.branches.len()).sum();
    println!(
        "rootseed: {} tables, {} branches, FIXED_1 = {}, {}-bit runtime",
        tables.len(),
        branches,
        config.fixed_one,
        config.target_bits
    );

    if let Some(dir) = args.out.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    }
    let value = to_json(&tables).context("Failed to serialize seed tables")?;
    let json_str =
        serde_json::to_string_pretty(&value).context("Failed to serialize seed tables")?;
    fs::write(&args.out, &json_str)
        .with_context(|| format!("Failed to write {}", args.out.display()))?;
    println!("  Written: {}", args.out.display());

    println!("Build complete.");
    Ok(())
}
