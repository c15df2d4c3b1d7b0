//! Piecewise table assembly.
//!
//! An [`EstimatorTable`] is the validated, ordered list of branches for one
//! degree. The consuming runtime scans it in ascending order and evaluates
//! the first branch whose upper bound exceeds `base`; the last branch has no
//! upper bound. The first branch also serves every `base` below its own
//! threshold, so the table covers the whole non-negative domain.
//!
//! Tangent lines of the concave `t^(1/n)` lie above the curve, so at each
//! boundary the left branch ends *above* the right one and the seed is an
//! upper bound of the root everywhere (up to rounding). By how much is fixed
//! by geometry alone: with `ρ = t_{i+1} / t_i` the left tangent meets the
//! next boundary at [`tangent_overshoot`]`(n, ρ)` times the right one. The
//! continuity check holds every boundary to that ratio, widened by the
//! rounding slack of both lines.

use num_bigint::{BigInt, BigUint};
use num_rational::BigRational;
use num_integer::Integer;
use num_traits::{Signed, Zero};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::derivation::{BreakpointCoefficients, Degree};
use crate::error::{check_width, Error, Result};
use crate::precision::{power, Precision};
use crate::serializer::{decimal_string, optional_decimal_string};

/// Default for [`ContinuityTolerance::relative_slack`], as a literal.
pub const DEFAULT_RELATIVE_SLACK: &str = "1e-9";

/// Default for [`ContinuityTolerance::slack_units`].
pub const DEFAULT_SLACK_UNITS: u32 = 4;

/// Digits of the overshoot enclosure computed by [`tangent_overshoot`].
const OVERSHOOT_DIGITS: u32 = 30;

/// Encloses `g(n, ρ) = (n - 1)/n · ρ^(-1/n) + ρ^((n - 1)/n) / n`, the ratio
/// between the tangent of `t^(1/n)` at `t` and the curve itself at `ρ · t`.
///
/// `g(n, 1) = 1` and `g` grows with `ρ`; it is also the factor by which the
/// branch at `t` overestimates the root anywhere up to `ρ · t`.
///
/// # Errors
///
/// Returns [`Error::Domain`] for a non-positive `ratio` and propagates
/// [`Error::Precision`] from the arithmetic engine.
pub fn tangent_overshoot(
    degree: Degree,
    ratio: &BigRational,
) -> Result<(BigRational, BigRational)> {
    if !ratio.is_positive() {
        return Err(Error::domain(format!("overshoot ratio {ratio} is not positive")));
    }
    let n = BigInt::from(degree.get());
    let n_minus_one = BigInt::from(degree.get() - 1);
    let precision = Precision::new(OVERSHOOT_DIGITS)?;
    let shrink = power(ratio, &BigRational::new(BigInt::from(-1), n.clone()), precision)?;
    let grow = power(ratio, &BigRational::new(n_minus_one.clone(), n.clone()), precision)?;

    let left_weight = BigRational::new(n_minus_one, n.clone());
    let right_weight = BigRational::new(BigInt::from(1), n);
    let low = &left_weight * shrink.lower() + &right_weight * grow.lower();
    let high = left_weight * shrink.upper() + right_weight * grow.upper();
    Ok((low, high))
}

/// One linear segment of the estimator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Branch {
    /// Tangent point `t · FIXED_1`; the branch's left edge.
    #[serde(with = "decimal_string")]
    pub threshold: BigUint,
    /// Exclusive upper edge, `None` for the final unbounded branch.
    #[serde(with = "optional_decimal_string", default)]
    pub upper_bound: Option<BigUint>,
    /// Fixed-point intercept.
    #[serde(with = "decimal_string")]
    pub intercept: BigUint,
    /// Fixed-point divisor of `base · FIXED_1`.
    #[serde(with = "decimal_string")]
    pub coefficient: BigUint,
}

impl Branch {
    /// True when the runtime's ascending scan stops at this branch for `base`
    /// (assuming every earlier branch was passed).
    #[must_use]
    pub fn accepts(&self, base: &BigUint) -> bool {
        self.upper_bound.as_ref().map_or(true, |upper| base < upper)
    }

    /// `intercept + base · FIXED_1 / coefficient` with the runtime's integer
    /// semantics: floor division, `target_bits`-wide intermediates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Range`] when the coefficient is zero or an
    /// intermediate exceeds `target_bits`.
    pub fn evaluate(&self, base: &BigUint, fixed_one: &BigUint, target_bits: u32) -> Result<BigUint> {
        if self.coefficient.is_zero() {
            return Err(Error::range(
                format!("coefficient at threshold {}", self.threshold),
                "is zero",
            ));
        }
        let scaled = base * fixed_one;
        check_width("base · FIXED_1", &scaled, target_bits)?;
        let estimate = &self.intercept + scaled / &self.coefficient;
        check_width("estimate", &estimate, target_bits)?;
        Ok(estimate)
    }

    /// Bound on how far [`Branch::evaluate`] can sit below the exact tangent
    /// line at `base`: half a unit from the intercept, under one unit from
    /// the floor division, and `ceil(base · FIXED_1 / coefficient²)` from the
    /// rounded divisor.
    #[must_use]
    pub fn rounding_slack(&self, base: &BigUint, fixed_one: &BigUint) -> BigUint {
        if self.coefficient.is_zero() {
            return BigUint::zero();
        }
        let square = &self.coefficient * &self.coefficient;
        let (quotient, remainder) = (base * fixed_one).div_rem(&square);
        let divisor_error = if remainder.is_zero() {
            quotient
        } else {
            quotient + 1u32
        };
        divisor_error + 2u32
    }

    /// The `{threshold, intercept, coefficient}` record of this branch.
    #[must_use]
    pub fn record(&self) -> BreakpointCoefficients {
        BreakpointCoefficients {
            threshold: self.threshold.clone(),
            intercept: self.intercept.clone(),
            coefficient: self.coefficient.clone(),
        }
    }
}

/// How far adjacent branches may disagree at their shared boundary.
///
/// The left branch, evaluated at the right branch's threshold, has to land
/// within `[g_low, g_high] · right` of [`tangent_overshoot`], give or take
/// the rounding slack of both lines, `slack_units` and `relative_slack`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuityTolerance {
    /// Extra allowance relative to the right branch's value at the boundary.
    pub relative_slack: BigRational,
    /// Fixed-point units of extra allowance on top of the divisor rounding
    /// of both lines (see [`Branch::rounding_slack`]).
    pub slack_units: u32,
}

impl Default for ContinuityTolerance {
    fn default() -> Self {
        Self {
            relative_slack: BigRational::new(BigInt::from(1), BigInt::from(1_000_000_000u32)),
            slack_units: DEFAULT_SLACK_UNITS,
        }
    }
}

impl ContinuityTolerance {
    /// Checks the boundary between `left` (branch `index`) and `right`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Discontinuity`] when the lines diverge beyond the
    /// tolerance, [`Error::Range`] when evaluation overflows,
    /// [`Error::InvalidDegree`] for an unusable `degree` and
    /// [`Error::InvalidThresholdSequence`] for a zero left threshold.
    pub fn check(
        &self,
        degree: u32,
        index: usize,
        left: &Branch,
        right: &Branch,
        fixed_one: &BigUint,
        target_bits: u32,
    ) -> Result<()> {
        let point = &right.threshold;
        let from_left = left.evaluate(point, fixed_one, target_bits)?;
        let from_right = right.evaluate(point, fixed_one, target_bits)?;

        let (low, high) = expected_ratio(degree, left, right)?;
        let (below, above) = self.bounds(&low, &high, left, right, fixed_one, &from_right);
        let value = BigRational::from_integer(BigInt::from(from_left.clone()));
        if value < below || value > above {
            return Err(Error::Discontinuity {
                degree,
                index,
                left: from_left.to_string(),
                right: from_right.to_string(),
            });
        }
        Ok(())
    }

    /// The closed range `from_left` may take given the right branch's value.
    fn bounds(
        &self,
        low: &BigRational,
        high: &BigRational,
        left: &Branch,
        right: &Branch,
        fixed_one: &BigUint,
        from_right: &BigUint,
    ) -> (BigRational, BigRational) {
        let point = &right.threshold;
        let anchor = BigRational::from_integer(BigInt::from(from_right.clone()));
        let allowance = BigInt::from(self.slack_units)
            + BigInt::from(left.rounding_slack(point, fixed_one))
            + high.ceil().to_integer() * BigInt::from(right.rounding_slack(point, fixed_one))
            + (&anchor * &self.relative_slack).ceil().to_integer();
        let allowance = BigRational::from_integer(allowance);
        (low * &anchor - &allowance, high * &anchor + allowance)
    }
}

/// Enclosure of `left / right` at the boundary for exact tangents.
fn expected_ratio(degree: u32, left: &Branch, right: &Branch) -> Result<(BigRational, BigRational)> {
    let degree = Degree::new(degree)?;
    if left.threshold.is_zero() {
        return Err(Error::sequence("zero threshold has no tangent"));
    }
    let ratio = BigRational::new(
        BigInt::from(right.threshold.clone()),
        BigInt::from(left.threshold.clone()),
    );
    tangent_overshoot(degree, &ratio)
}

/// Validated piecewise-linear seed for `t^(1/n)` over the whole domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimatorTable {
    /// Root degree `n`.
    pub degree: u32,
    /// Fixed-point scale.
    #[serde(with = "decimal_string")]
    pub fixed_one: BigUint,
    /// Integer width of the consuming runtime.
    pub target_bits: u32,
    /// Branches in ascending threshold order; the last one is unbounded.
    pub branches: Vec<Branch>,
}

impl EstimatorTable {
    /// The branch the runtime's ascending scan selects for `base`.
    #[must_use]
    pub fn branch_for(&self, base: &BigUint) -> Option<&Branch> {
        self.branches.iter().find(|branch| branch.accepts(base))
    }

    /// Seed estimate of `base^(1/n)` in fixed point, as the runtime computes it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Range`] on overflow of the target width, or
    /// [`Error::InvalidThresholdSequence`] for a table without branches.
    pub fn estimate(&self, base: &BigUint) -> Result<BigUint> {
        let branch = self
            .branch_for(base)
            .ok_or_else(|| Error::sequence(format!("degree {}: no branch accepts {base}", self.degree)))?;
        branch.evaluate(base, &self.fixed_one, self.target_bits)
    }

    /// The ordered `{threshold, intercept, coefficient}` records.
    #[must_use]
    pub fn records(&self) -> Vec<BreakpointCoefficients> {
        self.branches.iter().map(Branch::record).collect()
    }
}

/// Orders and validates derived coefficients into an [`EstimatorTable`].
#[derive(Debug, Clone)]
pub struct TableAssembler {
    fixed_one: BigUint,
    target_bits: u32,
    tolerance: ContinuityTolerance,
}

impl TableAssembler {
    /// Creates an assembler for one fixed-point scale and integer width.
    #[must_use]
    pub fn new(fixed_one: BigUint, target_bits: u32, tolerance: ContinuityTolerance) -> Self {
        Self {
            fixed_one,
            target_bits,
            tolerance,
        }
    }

    /// Validates `coefficients` and links them into branches.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidThresholdSequence`] for an empty or not strictly
    ///   increasing sequence.
    /// - [`Error::Range`] for a zero coefficient or an overflowing evaluation.
    /// - [`Error::Discontinuity`] when a boundary check fails.
    pub fn assemble(
        &self,
        degree: Degree,
        coefficients: Vec<BreakpointCoefficients>,
    ) -> Result<EstimatorTable> {
        let n = degree.get();
        if coefficients.is_empty() {
            return Err(Error::sequence(format!("degree {n}: no thresholds")));
        }
        for (position, pair) in coefficients.windows(2).enumerate() {
            if pair[1].threshold <= pair[0].threshold {
                return Err(Error::sequence(format!(
                    "degree {n}: threshold {} at position {} does not exceed {}",
                    pair[1].threshold,
                    position + 1,
                    pair[0].threshold
                )));
            }
        }

        let upper_bounds: Vec<Option<BigUint>> = coefficients
            .iter()
            .skip(1)
            .map(|c| Some(c.threshold.clone()))
            .chain(std::iter::once(None))
            .collect();
        let branches: Vec<Branch> = coefficients
            .into_iter()
            .zip(upper_bounds)
            .map(|(c, upper_bound)| Branch {
                threshold: c.threshold,
                upper_bound,
                intercept: c.intercept,
                coefficient: c.coefficient,
            })
            .collect();

        for (index, pair) in branches.windows(2).enumerate() {
            self.tolerance.check(
                n,
                index,
                &pair[0],
                &pair[1],
                &self.fixed_one,
                self.target_bits,
            )?;
        }
        if let Some(last) = branches.last() {
            if last.coefficient.is_zero() {
                return Err(Error::range(
                    format!("coefficient at threshold {}", last.threshold),
                    "is zero",
                ));
            }
        }

        info!(degree = n, branches = branches.len(), "assembled estimator table");
        Ok(EstimatorTable {
            degree: n,
            fixed_one: self.fixed_one.clone(),
            target_bits: self.target_bits,
            branches,
        })
    }
}
