//! Seed quality validator.
//!
//! Samples every branch and compares the runtime estimate with the exact
//! fixed-point root. A tangent seed of a concave root lies above the root,
//! so the estimate must never drop below it by more than the branch's
//! rounding slack. On the branch's own interval it may exceed the root by no
//! more than the tangent overshoot `g(n, base / threshold)`, and it must not
//! decrease inside a branch.

use num_bigint::{BigInt, BigUint};
use num_rational::BigRational;
use num_traits::Zero;
use rootseed::serializer::json::Artifact;
use rootseed::table::tangent_overshoot;
use rootseed::{Branch, ContinuityTolerance, Degree, EstimatorTable};

use super::exact_root;
use crate::report::{ConformanceReport, TestResult};

const VALIDATOR: &str = "tables/seed_bound";

/// Validates seed bounds and per-branch monotonicity on every table.
pub fn validate(tolerance: &ContinuityTolerance, artifact: &Artifact) -> ConformanceReport {
    let mut report = ConformanceReport::new();
    for table in &artifact.tables {
        report.push(check_table(tolerance, table));
    }
    report
}

/// Ascending sample bases for branch `index`: below the first threshold for
/// the first branch, then the threshold, the midpoint and the last base
/// before the upper bound (or two multiples of the threshold for the tail).
fn samples(table: &EstimatorTable, index: usize) -> Vec<BigUint> {
    let branch = &table.branches[index];
    let threshold = &branch.threshold;
    let mut bases = Vec::new();
    if index == 0 {
        bases.push(BigUint::default());
        bases.push(threshold / 2u32);
    }
    bases.push(threshold.clone());
    match &branch.upper_bound {
        Some(upper) => {
            bases.push((threshold + upper) / 2u32);
            if upper > threshold {
                bases.push(upper - 1u32);
            }
        }
        None => {
            bases.push(threshold * 2u32);
            bases.push(threshold * 10u32);
        }
    }
    bases
}

/// Largest seed a correct branch may return at `base` given the floor of the
/// exact root there: `g_high · (root + 1) + slack + root · relative_slack`.
fn ceiling(
    tolerance: &ContinuityTolerance,
    degree: Degree,
    branch: &Branch,
    base: &BigUint,
    root: &BigUint,
    slack: &BigUint,
) -> rootseed::Result<BigRational> {
    let ratio = BigRational::new(
        BigInt::from(base.clone()),
        BigInt::from(branch.threshold.clone()),
    );
    let (_, high) = tangent_overshoot(degree, &ratio)?;
    let root = BigRational::from_integer(BigInt::from(root.clone()));
    let slack = BigRational::from_integer(BigInt::from(slack.clone()));
    Ok(high * (&root + BigRational::from_integer(BigInt::from(1u8)))
        + slack
        + root * &tolerance.relative_slack)
}

fn check_table(tolerance: &ContinuityTolerance, table: &EstimatorTable) -> TestResult {
    let n = table.degree;
    let degree = match Degree::new(n) {
        Ok(degree) => degree,
        Err(e) => return TestResult::fail(VALIDATOR, format!("n={n}: {e}")),
    };
    let mut findings = Vec::new();
    let mut sampled = 0usize;

    for (index, branch) in table.branches.iter().enumerate() {
        let mut previous: Option<BigUint> = None;
        for base in samples(table, index) {
            sampled += 1;
            let (seed, root) = match (table.estimate(&base), exact_root(&base, n, &table.fixed_one)) {
                (Ok(seed), Ok(root)) => (seed, root),
                (Err(e), _) | (_, Err(e)) => {
                    findings.push(format!("n={n} base={base}: {e}"));
                    continue;
                }
            };
            let slack = branch.rounding_slack(&base, &table.fixed_one) + tolerance.slack_units;

            if &seed + &slack < root {
                findings.push(format!("n={n} base={base}: seed {seed} below root {root}"));
            }
            if branch.threshold.is_zero() {
                findings.push(format!("n={n} branch {index}: zero threshold"));
            } else if base >= branch.threshold {
                match ceiling(tolerance, degree, branch, &base, &root, &slack) {
                    Ok(ceiling) if BigRational::from_integer(BigInt::from(seed.clone())) > ceiling => {
                        findings.push(format!(
                            "n={n} base={base}: seed {seed} overshoots root {root} beyond the tangent"
                        ));
                    }
                    Ok(_) => {}
                    Err(e) => findings.push(format!("n={n} base={base}: {e}")),
                }
            }
            if let Some(previous) = &previous {
                if seed < *previous {
                    findings.push(format!("n={n} branch {index}: estimate decreases at base={base}"));
                }
            }
            previous = Some(seed);
        }
    }

    TestResult::from_findings(
        VALIDATOR,
        format!("n={n}: {sampled} samples bound the root from above"),
        format!("n={n}: {} seed bound violations", findings.len()),
        findings,
    )
}
