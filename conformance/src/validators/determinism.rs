//! Determinism validator.
//!
//! Regenerates the tables twice from the configuration; both runs must
//! serialize to identical text and match the artifact integer for integer.

use rootseed::serializer::json::{to_json, Artifact};
use rootseed::{generate, EstimatorTable, GenerationConfig};

use crate::report::{ConformanceReport, TestResult};

const VALIDATOR: &str = "derivation/determinism";

/// Validates that `artifact` is exactly what `config` generates.
pub fn validate(config: &GenerationConfig, artifact: &Artifact) -> ConformanceReport {
    let mut report = ConformanceReport::new();

    let (first, second) = match (generate(config), generate(config)) {
        (Ok(first), Ok(second)) => (first, second),
        (Err(e), _) | (_, Err(e)) => {
            report.push(TestResult::fail(VALIDATOR, format!("generation failed: {e}")));
            return report;
        }
    };

    match (to_json(&first), to_json(&second)) {
        (Ok(a), Ok(b)) if a.to_string() == b.to_string() => {
            report.push(TestResult::pass(VALIDATOR, "two runs serialize identically"));
        }
        (Ok(_), Ok(_)) => {
            report.push(TestResult::fail(VALIDATOR, "two runs serialize differently"));
        }
        (Err(e), _) | (_, Err(e)) => {
            report.push(TestResult::fail(VALIDATOR, format!("serialization failed: {e}")));
        }
    }

    report.push(TestResult::from_findings(
        VALIDATOR,
        "artifact matches regenerated tables",
        "artifact differs from regenerated tables",
        differences(&first, &artifact.tables),
    ));
    report
}

fn differences(expected: &[EstimatorTable], actual: &[EstimatorTable]) -> Vec<String> {
    let mut findings = Vec::new();
    if expected.len() != actual.len() {
        findings.push(format!("{} tables regenerated, artifact has {}", expected.len(), actual.len()));
    }
    for (want, have) in expected.iter().zip(actual) {
        let n = want.degree;
        if want.degree != have.degree {
            findings.push(format!("n={n}: artifact has n={} in its place", have.degree));
            continue;
        }
        if want.branches.len() != have.branches.len() {
            findings.push(format!(
                "n={n}: {} branches regenerated, artifact has {}",
                want.branches.len(),
                have.branches.len()
            ));
        }
        for (index, (w, h)) in want.branches.iter().zip(&have.branches).enumerate() {
            if w.intercept != h.intercept {
                findings.push(format!(
                    "n={n} branch {index}: intercept {} regenerates as {}",
                    h.intercept, w.intercept
                ));
            }
            if w.coefficient != h.coefficient {
                findings.push(format!(
                    "n={n} branch {index}: coefficient {} regenerates as {}",
                    h.coefficient, w.coefficient
                ));
            }
            if w.threshold != h.threshold || w.upper_bound != h.upper_bound {
                findings.push(format!("n={n} branch {index}: interval differs"));
            }
        }
        if want.fixed_one != have.fixed_one || want.target_bits != have.target_bits {
            findings.push(format!("n={n}: fixed-point parameters differ"));
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;

    #[test]
    fn off_by_one_coefficient_is_named() {
        let config = GenerationConfig::new().with_ladder([4], &["1", "2"]).unwrap();
        let mut artifact = Artifact {
            format: rootseed::serializer::json::FORMAT.to_string(),
            tables: generate(&config).unwrap(),
        };
        assert!(validate(&config, &artifact).all_passed());

        let branch = &mut artifact.tables[0].branches[1];
        branch.coefficient = &branch.coefficient + BigUint::from(1u8);
        let report = validate(&config, &artifact);
        let failure = report.failures().next().unwrap();
        assert_eq!(failure.details.len(), 1);
        assert!(failure.details[0].starts_with("n=4 branch 1: coefficient"));
    }
}
