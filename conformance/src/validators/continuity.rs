//! Boundary continuity validator.
//!
//! Re-runs the assembler's boundary check on the artifact and reports the
//! worst relative overshoot per table. Geometry alone sets that overshoot,
//! so it is informational; the check itself compares against the tangent.

use num_bigint::BigUint;
use rootseed::serializer::json::Artifact;
use rootseed::{ContinuityTolerance, EstimatorTable};

use crate::report::{ConformanceReport, TestResult};

const VALIDATOR: &str = "tables/continuity";

/// Validates every boundary of every table against `tolerance`.
pub fn validate(tolerance: &ContinuityTolerance, artifact: &Artifact) -> ConformanceReport {
    let mut report = ConformanceReport::new();
    for table in &artifact.tables {
        report.push(check_table(tolerance, table));
    }
    report
}

fn check_table(tolerance: &ContinuityTolerance, table: &EstimatorTable) -> TestResult {
    let n = table.degree;
    let mut findings = Vec::new();
    let mut worst = BigUint::default();

    for (index, pair) in table.branches.windows(2).enumerate() {
        let (left, right) = (&pair[0], &pair[1]);
        if let Err(e) = tolerance.check(n, index, left, right, &table.fixed_one, table.target_bits) {
            findings.push(format!("n={n}: {e}"));
            continue;
        }
        let point = &right.threshold;
        let (Ok(from_left), Ok(from_right)) = (
            left.evaluate(point, &table.fixed_one, table.target_bits),
            right.evaluate(point, &table.fixed_one, table.target_bits),
        ) else {
            continue;
        };
        if from_left > from_right && from_right > BigUint::default() {
            let percent = (from_left - &from_right) * 100u32 / from_right;
            worst = worst.max(percent);
        }
    }

    let boundaries = table.branches.len().saturating_sub(1);
    TestResult::from_findings(
        VALIDATOR,
        format!("n={n}: {boundaries} boundaries, worst overshoot {worst}%"),
        format!("n={n}: {} discontinuous boundaries", findings.len()),
        findings,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rootseed::{generate, GenerationConfig};

    fn artifact(thresholds: &[&str]) -> Artifact {
        let config = GenerationConfig::new().with_ladder([2], thresholds).unwrap();
        Artifact {
            format: rootseed::serializer::json::FORMAT.to_string(),
            tables: generate(&config).unwrap(),
        }
    }

    #[test]
    fn reports_worst_overshoot() {
        // Tangent at 1 evaluated at 4: 0.5 + 4/2 = 2.5 against 2, so 25%.
        let report = validate(&ContinuityTolerance::default(), &artifact(&["1", "4"]));
        assert!(report.all_passed());
        assert_eq!(report.results[0].message, "n=2: 1 boundaries, worst overshoot 25%");
    }

    #[test]
    fn flattened_branch_is_discontinuous() {
        let mut artifact = artifact(&["1", "4"]);
        // 0.5 + 4/100 at the boundary, far below the right branch's 2.
        artifact.tables[0].branches[0].coefficient = rootseed::precision::pow10(20);
        let report = validate(&ContinuityTolerance::default(), &artifact);
        assert_eq!(report.failure_count(), 1);
    }

    #[test]
    fn steepened_branch_is_discontinuous() {
        let mut artifact = artifact(&["1", "4"]);
        // 0.5 + 4 at the boundary: 125% above the right branch where a
        // tangent reaches only 25%.
        let branch = &mut artifact.tables[0].branches[0];
        branch.coefficient = &branch.coefficient / 2u32;
        let report = validate(&ContinuityTolerance::default(), &artifact);
        assert_eq!(report.failure_count(), 1);
        assert!(report.results[0].details[0].starts_with("n=2: degree 2: branch 0"));
    }
}
