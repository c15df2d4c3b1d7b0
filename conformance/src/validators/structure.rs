//! Table structure validator.
//!
//! Checks the artifact's inventory against the configuration and the shape
//! the consuming runtime relies on: ascending thresholds, chained upper
//! bounds, an unbounded tail, positive divisors and integers that fit the
//! target width.

use std::collections::BTreeSet;

use num_traits::Zero;
use rootseed::error::check_width;
use rootseed::serializer::json::Artifact;
use rootseed::{EstimatorTable, GenerationConfig, Threshold};

use crate::report::{ConformanceReport, TestResult};

const VALIDATOR: &str = "tables/structure";

/// Validates the inventory and the shape of every table.
pub fn validate(config: &GenerationConfig, artifact: &Artifact) -> ConformanceReport {
    let mut report = ConformanceReport::new();
    report.push(check_inventory(config, artifact));

    for (degree, thresholds) in config.sequences() {
        if let Some(table) = artifact.table(degree.get()) {
            report.push(check_table(config, table, thresholds));
        }
    }
    report
}

fn check_inventory(config: &GenerationConfig, artifact: &Artifact) -> TestResult {
    let expected: BTreeSet<u32> = config.sequences().iter().map(|(d, _)| d.get()).collect();
    let mut seen = BTreeSet::new();
    let mut findings = Vec::new();

    for table in &artifact.tables {
        if !seen.insert(table.degree) {
            findings.push(format!("n={}: table appears twice", table.degree));
        }
        if !expected.contains(&table.degree) {
            findings.push(format!("n={}: not configured", table.degree));
        }
    }
    for degree in expected.difference(&seen) {
        findings.push(format!("n={degree}: missing from artifact"));
    }

    let ordered = artifact.tables.windows(2).all(|w| w[0].degree < w[1].degree);
    if !ordered {
        findings.push("tables are not ordered by degree".to_string());
    }

    TestResult::from_findings(
        VALIDATOR,
        format!("{} tables, one per configured degree", artifact.tables.len()),
        "artifact inventory does not match the configuration",
        findings,
    )
}

fn check_table(config: &GenerationConfig, table: &EstimatorTable, thresholds: &[Threshold]) -> TestResult {
    let n = table.degree;
    let mut findings = Vec::new();

    if table.fixed_one != config.fixed_one {
        findings.push(format!("fixed_one is {}, configured {}", table.fixed_one, config.fixed_one));
    }
    if table.target_bits != config.target_bits {
        findings.push(format!(
            "target_bits is {}, configured {}",
            table.target_bits, config.target_bits
        ));
    }
    if table.branches.is_empty() {
        findings.push("no branches".to_string());
    }

    let configured: Vec<_> = thresholds
        .iter()
        .map(|t| t.to_fixed(&config.fixed_one).ok())
        .collect();
    let actual: Vec<_> = table.branches.iter().map(|b| Some(b.threshold.clone())).collect();
    if configured != actual {
        findings.push("branch thresholds differ from the configured ladder".to_string());
    }

    for (index, branch) in table.branches.iter().enumerate() {
        let next = table.branches.get(index + 1);
        match (next, &branch.upper_bound) {
            (Some(next), Some(upper)) if *upper == next.threshold => {}
            (Some(next), _) => findings.push(format!(
                "branch {index}: upper bound is not the next threshold {}",
                next.threshold
            )),
            (None, Some(upper)) => {
                findings.push(format!("last branch is bounded by {upper}"));
            }
            (None, None) => {}
        }
        if let Some(next) = next {
            if next.threshold <= branch.threshold {
                findings.push(format!("branch {}: threshold does not increase", index + 1));
            }
        }
        if branch.coefficient.is_zero() {
            findings.push(format!("branch {index}: zero coefficient"));
        }
        for (quantity, value) in [
            ("threshold", &branch.threshold),
            ("intercept", &branch.intercept),
            ("coefficient", &branch.coefficient),
        ] {
            if let Err(e) = check_width(quantity, value, table.target_bits) {
                findings.push(format!("branch {index}: {e}"));
            }
        }
    }

    let findings = findings.into_iter().map(|f| format!("n={n}: {f}")).collect();
    TestResult::from_findings(
        VALIDATOR,
        format!("n={n}: {} branches, ascending, unbounded tail", table.branches.len()),
        format!("n={n}: malformed table"),
        findings,
    )
}
