//! Tangent point precision validator.
//!
//! Recomputes `x0 = t^(1/n)` for every configured pair and checks both the
//! width of its enclosure and `|x0^n - t| / t` against the configured
//! relative bound.

use num_traits::Signed;
use rootseed::precision::rational_pow;
use rootseed::GenerationConfig;

use crate::report::{ConformanceReport, TestResult};

const VALIDATOR: &str = "derivation/precision";

/// Validates the precision of every configured tangent point.
pub fn validate(config: &GenerationConfig) -> ConformanceReport {
    let mut report = ConformanceReport::new();
    let digits = config.precision.digits();

    let deriver = match config.deriver() {
        Ok(deriver) => deriver,
        Err(e) => {
            report.push(TestResult::fail(VALIDATOR, format!("no deriver for this configuration: {e}")));
            return report;
        }
    };
    let bound = config.precision.relative_bound();

    let mut checked = 0usize;
    let mut findings = Vec::new();
    for (degree, thresholds) in config.sequences() {
        for threshold in thresholds {
            checked += 1;
            let root = match deriver.root(degree, threshold) {
                Ok(root) => root,
                Err(e) => {
                    findings.push(format!("n={degree} t={threshold}: {e}"));
                    continue;
                }
            };
            match root.relative_error_bound() {
                Some(width) if width < bound => {}
                _ => findings.push(format!(
                    "n={degree} t={threshold}: enclosure of x0 = {root} is wider than 10^-{digits}"
                )),
            }
            let t = threshold.as_ratio();
            let error = (rational_pow(&root.lower(), degree.get()) - t).abs() / t;
            if error >= bound {
                findings.push(format!(
                    "n={degree} t={threshold}: x0 = {root} misses 10^-{digits}"
                ));
            }
        }
    }

    report.push(TestResult::from_findings(
        VALIDATOR,
        format!("{checked} tangent points within 10^-{digits}"),
        format!("{} of {checked} tangent points miss 10^-{digits}", findings.len()),
        findings,
    ));
    report
}
