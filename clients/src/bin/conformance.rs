//! `rootseed-conformance`: validates a seed table artifact against the
//! configuration it was generated from.
//!
//! Runs precision, structure, continuity, seed bound, extreme input and
//! determinism checks.
//!
//! **Usage:**
//! ```text
//! rootseed-conformance [--config <seed.toml>] [--artifact <path>] [-v]
//! ```
//!
//! Exits non-zero if any conformance check fails.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::fs;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use rootseed::serializer::json::from_json;
use rootseed_clients::{init_logging, load_config};
use rootseed_conformance::{run_all, Severity};

/// Run the rootseed conformance suite.
#[derive(Parser)]
#[command(
    name = "rootseed-conformance",
    about = "Validate a seed table artifact against its generation config"
)]
struct Args {
    /// TOML generation config (default: built-in standard ladder).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to the artifact written by rootseed-build.
    #[arg(long, default_value = "public/seed_tables.json")]
    artifact: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = load_config(args.config.as_deref())?;
    let text = fs::read_to_string(&args.artifact)
        .with_context(|| format!("Failed to read {}", args.artifact.display()))?;
    let artifact = from_json(&text)
        .with_context(|| format!("Failed to parse {}", args.artifact.display()))?;

    let report = run_all(&config, &artifact)?;

    println!("rootseed Conformance Report");
    println!("===========================");
    println!();

    for result in &report.results {
        println!("[{}] {} — {}", result.severity, result.validator, result.message);
        for detail in &result.details {
            println!("       {}", detail);
        }
    }

    let failed = report.failure_count();
    println!();
    println!(
        "Summary: {} passed, {} warnings, {} failed",
        report.count(Severity::Pass),
        report.count(Severity::Warning),
        failed
    );

    if failed > 0 {
        eprintln!("Conformance FAILED: {} check(s) did not pass.", failed);
        process::exit(1);
    }

    println!("Conformance PASSED.");
    Ok(())
}
