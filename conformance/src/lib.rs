//! Conformance suite for generated seed tables.
//!
//! An artifact is only fit to be rendered into a solver when every property
//! below holds for the configuration it was generated from.
//!
//! # Conformance Scope
//!
//! | Validator | Property |
//! |-----------|----------|
//! | `derivation/precision` | `|x0^n - t| / t` below the configured bound |
//! | `tables/structure` | one table per degree, ascending thresholds, chained bounds, unbounded tail, widths |
//! | `tables/continuity` | each boundary step matches the tangent ratio `g(n, t_{i+1}/t_i)` within rounding slack |
//! | `tables/seed_bound` | seeds bound the exact root from above, by at most the tangent overshoot, and never decrease within a branch |
//! | `tables/extremes` | `10^40` and the largest representable base evaluate without overflow |
//! | `derivation/determinism` | regeneration reproduces the artifact exactly |
//!
//! # Entry Point
//!
//! ```
//! use rootseed::GenerationConfig;
//! use rootseed_conformance::run_generated;
//!
//! let config = GenerationConfig::new()
//!     .with_ladder([3], &["1", "2", "10"])
//!     .unwrap();
//! let report = run_generated(&config).unwrap();
//! assert!(report.all_passed());
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod report;
pub mod validators;

pub use report::{ConformanceReport, Severity, TestResult};

use anyhow::Context;
use rootseed::serializer::json::{from_json, to_json, Artifact};
use rootseed::{generate, GenerationConfig};
use tracing::info;

/// Runs all conformance validators and returns the aggregated report.
///
/// Validators are run in this order:
/// 1. Tangent point precision
/// 2. Table structure and inventory
/// 3. Boundary continuity
/// 4. Seed bounds and per-branch monotonicity
/// 5. Extreme bases
/// 6. Determinism against a fresh generation
///
/// # Errors
///
/// Returns an error only if `config` itself is invalid.
pub fn run_all(config: &GenerationConfig, artifact: &Artifact) -> anyhow::Result<ConformanceReport> {
    config.validate().context("configuration is invalid")?;
    let tolerance = &config.continuity;
    let mut report = ConformanceReport::new();

    report.extend(validators::precision::validate(config));
    report.extend(validators::structure::validate(config, artifact));
    report.extend(validators::continuity::validate(tolerance, artifact));
    report.extend(validators::seed_bound::validate(tolerance, artifact));
    report.extend(validators::extremes::validate(config, artifact));
    report.extend(validators::determinism::validate(config, artifact));

    info!(
        passed = report.count(Severity::Pass),
        warnings = report.count(Severity::Warning),
        failed = report.failure_count(),
        "conformance run finished"
    );
    Ok(report)
}

/// Generates the artifact for `config` in memory, round-trips it through its
/// JSON text and runs the suite on the result.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or generation fails.
pub fn run_generated(config: &GenerationConfig) -> anyhow::Result<ConformanceReport> {
    let tables = generate(config).context("generating tables")?;
    let text = to_json(&tables).context("serializing tables")?.to_string();
    let artifact = from_json(&text).context("re-reading the generated artifact")?;
    run_all(config, &artifact)
}

#[cfg(test)]
mod tests_unit {
    use super::*;

    #[test]
    fn invalid_configuration_is_an_error() {
        let mut config = GenerationConfig::new().with_ladder([2], &["1"]).unwrap();
        config.target_bits = 0;
        let artifact = Artifact {
            format: rootseed::serializer::json::FORMAT.to_string(),
            tables: Vec::new(),
        };
        assert!(run_all(&config, &artifact).is_err());
    }

    #[test]
    fn every_validator_reports() {
        let config = GenerationConfig::new().with_ladder([2], &["1", "5"]).unwrap();
        let report = run_generated(&config).unwrap();
        for validator in [
            "derivation/precision",
            "tables/structure",
            "tables/continuity",
            "tables/seed_bound",
            "tables/extremes",
            "derivation/determinism",
        ] {
            assert!(
                report.results.iter().any(|r| r.validator == validator),
                "{validator} produced no result"
            );
        }
        assert!(report.all_passed(), "{:#?}", report.results);
    }
}
