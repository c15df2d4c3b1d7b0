//! Extreme input validator.
//!
//! The runtime feeds arbitrary `uint256` bases to the table. Evaluates each
//! table at `10^40` and at the largest base whose `base · FIXED_1` still fits
//! the target width, checking that neither overflows and both seeds stay
//! above the root. The largest base is derived from the configured scale
//! and width, so a table that disagrees with either fails before any
//! evaluation.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use rootseed::precision::pow10;
use rootseed::serializer::json::Artifact;
use rootseed::{EstimatorTable, GenerationConfig};

use super::exact_root;
use crate::report::{ConformanceReport, TestResult};

const VALIDATOR: &str = "tables/extremes";

/// Decimal exponent of the large fixed sample base.
pub const LARGE_BASE_EXPONENT: u32 = 40;

/// Largest `base` with `base · fixed_one < 2^target_bits`, or `None` for a
/// zero scale.
pub fn max_base(fixed_one: &BigUint, target_bits: u32) -> Option<BigUint> {
    if fixed_one.is_zero() {
        return None;
    }
    let limit = (BigUint::one() << target_bits) - 1u32;
    Some(limit / fixed_one)
}

/// Validates every table at the extreme bases of `config`'s domain.
pub fn validate(config: &GenerationConfig, artifact: &Artifact) -> ConformanceReport {
    let mut report = ConformanceReport::new();
    for table in &artifact.tables {
        report.extend(check_table(config, table));
    }
    report
}

fn check_table(config: &GenerationConfig, table: &EstimatorTable) -> ConformanceReport {
    let n = table.degree;
    let mut report = ConformanceReport::new();
    if table.fixed_one != config.fixed_one || table.target_bits != config.target_bits {
        report.push(TestResult::fail(
            VALIDATOR,
            format!(
                "n={n}: table declares FIXED_1 = {} at {} bits, configured {} at {} bits",
                table.fixed_one, table.target_bits, config.fixed_one, config.target_bits
            ),
        ));
        return report;
    }
    let Some(largest) = max_base(&config.fixed_one, config.target_bits) else {
        report.push(TestResult::fail(VALIDATOR, format!("n={n}: FIXED_1 is zero")));
        return report;
    };
    let large = pow10(LARGE_BASE_EXPONENT);

    let mut bases = vec![largest.clone()];
    if large <= largest {
        bases.insert(0, large);
    } else {
        report.push(TestResult::warn(
            VALIDATOR,
            format!("n={n}: 10^{LARGE_BASE_EXPONENT} exceeds the {}-bit domain", table.target_bits),
        ));
    }

    let mut findings = Vec::new();
    for base in &bases {
        let seed = match table.estimate(base) {
            Ok(seed) => seed,
            Err(e) => {
                findings.push(format!("n={n} base={base}: {e}"));
                continue;
            }
        };
        let Some(branch) = table.branch_for(base) else {
            continue;
        };
        match exact_root(base, n, &table.fixed_one) {
            Ok(root) => {
                let slack =
                    branch.rounding_slack(base, &table.fixed_one) + config.continuity.slack_units;
                if seed + slack < root {
                    findings.push(format!("n={n} base={base}: seed below root {root}"));
                }
            }
            Err(e) => findings.push(format!("n={n} base={base}: {e}")),
        }
    }

    report.push(TestResult::from_findings(
        VALIDATOR,
        format!("n={n}: {} extreme bases evaluate within {} bits", bases.len(), table.target_bits),
        format!("n={n}: extreme bases fail"),
        findings,
    ));
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use rootseed::{generate, GenerationConfig};

    #[test]
    fn max_base_fits_exactly() {
        let f = pow10(18);
        let base = max_base(&f, 256).unwrap();
        assert!((&base * &f).bits() <= 256);
        assert!(((&base + 1u32) * &f).bits() > 256);
    }

    #[test]
    fn narrow_runtime_skips_large_base() {
        let mut config = GenerationConfig::new().with_ladder([3], &["1", "100"]).unwrap();
        config.target_bits = 128;
        let artifact = Artifact {
            format: rootseed::serializer::json::FORMAT.to_string(),
            tables: generate(&config).unwrap(),
        };
        let report = validate(&config, &artifact);
        assert_eq!(report.count(crate::Severity::Warning), 1);
        assert!(report.all_passed(), "{:#?}", report.results);
    }

    #[test]
    fn zero_scale_fails_instead_of_dividing() {
        assert_eq!(max_base(&BigUint::zero(), 256), None);

        let config = GenerationConfig::new().with_ladder([2], &["1", "2"]).unwrap();
        let mut artifact = Artifact {
            format: rootseed::serializer::json::FORMAT.to_string(),
            tables: generate(&config).unwrap(),
        };
        artifact.tables[0].fixed_one = BigUint::zero();
        let report = validate(&config, &artifact);
        assert_eq!(report.failure_count(), 1);
        assert!(report.results[0].message.contains("FIXED_1 = 0"));
    }

    #[test]
    fn foreign_width_is_not_evaluated() {
        let config = GenerationConfig::new().with_ladder([2], &["1", "2"]).unwrap();
        let mut artifact = Artifact {
            format: rootseed::serializer::json::FORMAT.to_string(),
            tables: generate(&config).unwrap(),
        };
        artifact.tables[0].target_bits = u32::MAX;
        let report = validate(&config, &artifact);
        assert_eq!(report.failure_count(), 1);
    }
}
