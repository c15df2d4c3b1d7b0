//! Shared plumbing for the rootseed client binaries.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rootseed::GenerationConfig;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the stderr log subscriber. `RUST_LOG` wins when verbosity is 0;
/// each `-v` raises the level one step from `info`.
pub fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the TOML configuration at `path`, or the built-in standard
/// configuration when no path is given.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not validate.
pub fn load_config(path: Option<&Path>) -> Result<GenerationConfig> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            GenerationConfig::from_toml(&text)
                .with_context(|| format!("Invalid config {}", path.display()))
        }
        None => GenerationConfig::standard().context("Built-in standard config is invalid"),
    }
}
