//! Breakpoint coefficient derivation.
//!
//! For a degree `n` and a threshold `t` the seed line is the tangent of
//! `t ↦ t^(1/n)` at `t`, written so the consuming runtime can evaluate it
//! with one division:
//!
//! ```text
//! estimate(base) = intercept + base · FIXED_1 / coefficient
//! intercept      = round(t^(1/n) · (n - 1)/n · FIXED_1)
//! coefficient    = round(t^((n - 1)/n) · n · FIXED_1)
//! ```
//!
//! Each `(n, t)` pair is independent; [`CoefficientDeriver::derive_all`]
//! evaluates a whole threshold sequence in parallel.

use std::fmt;
use std::str::FromStr;

use num_bigint::{BigInt, BigUint};
use num_rational::BigRational;
use num_traits::{Signed, Zero};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::{check_width, Error, Result};
use crate::precision::{power, scale_to_fixed_point, Decimal, Precision};
use crate::rational::{format_rational, parse_rational};

/// How many times an ambiguous rounding is retried at a tighter precision.
pub const ROUNDING_REFINEMENTS: u32 = 6;

/// Digits added to the precision on every rounding retry.
const REFINEMENT_DIGITS: u32 = 18;

/// Largest accepted root degree. The radicand of `t^((n - 1)/n)` is widened
/// by `10^(scale · n)`, so the degree bounds every allocation.
pub const MAX_DEGREE: u32 = 64;

/// Root degree `2 <= n <= MAX_DEGREE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Degree(u32);

impl Degree {
    /// Validates `n`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDegree`] when `n < 2` or `n > MAX_DEGREE`.
    pub fn new(n: u32) -> Result<Self> {
        if !(2..=MAX_DEGREE).contains(&n) {
            return Err(Error::InvalidDegree { degree: n });
        }
        Ok(Self(n))
    }

    /// The degree as a plain integer.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }

    /// Guard digits that keep `x0^n` within the bound requested for `x0`.
    fn guard_digits(self) -> u32 {
        self.0.to_string().len() as u32
    }
}

impl TryFrom<u32> for Degree {
    type Error = Error;

    fn try_from(n: u32) -> Result<Self> {
        Self::new(n)
    }
}

impl fmt::Display for Degree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Left edge of a domain interval, relative to `FIXED_1` (so `1.1` means
/// `1.1 · FIXED_1` in the consuming runtime).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Threshold(BigRational);

impl Threshold {
    /// Wraps a strictly positive rational.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidThresholdSequence`] for zero or negative values;
    /// the tangent of `t^(1/n)` at zero is vertical.
    pub fn new(value: BigRational) -> Result<Self> {
        if !value.is_positive() {
            return Err(Error::sequence(format!(
                "threshold {} is not positive",
                format_rational(&value)
            )));
        }
        Ok(Self(value))
    }

    /// The exact rational value.
    #[must_use]
    pub fn as_ratio(&self) -> &BigRational {
        &self.0
    }

    /// `t · FIXED_1`, which has to be a whole number.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidThresholdSequence`] if the product has a
    /// fractional part: the runtime compares against an integer, and a
    /// rounded boundary would no longer be the tangent point.
    pub fn to_fixed(&self, fixed_one: &BigUint) -> Result<BigUint> {
        let scaled = &self.0 * BigRational::from_integer(BigInt::from(fixed_one.clone()));
        if !scaled.is_integer() {
            return Err(Error::sequence(format!(
                "threshold {self} is not representable at FIXED_1 = {fixed_one}"
            )));
        }
        scaled
            .to_integer()
            .to_biguint()
            .ok_or_else(|| Error::sequence(format!("threshold {self} is negative")))
    }
}

impl FromStr for Threshold {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value = parse_rational(s).map_err(|e| Error::config(e.to_string()))?;
        Self::new(value)
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_rational(&self.0))
    }
}

/// Fixed-point tangent line for one `(n, t)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BreakpointCoefficients {
    /// `t · FIXED_1`.
    pub threshold: BigUint,
    /// `round(t^(1/n) · (n - 1)/n · FIXED_1)`.
    pub intercept: BigUint,
    /// `round(t^((n - 1)/n) · n · FIXED_1)`, a runtime divisor.
    pub coefficient: BigUint,
}

/// Derives breakpoint coefficients at a fixed scale and precision.
#[derive(Debug, Clone)]
pub struct CoefficientDeriver {
    fixed_one: BigUint,
    precision: Precision,
    target_bits: u32,
}

impl CoefficientDeriver {
    /// Creates a deriver for `FIXED_1 = fixed_one` and integers of
    /// `target_bits` bits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when `fixed_one` is zero or `target_bits`
    /// is zero.
    pub fn new(fixed_one: BigUint, precision: Precision, target_bits: u32) -> Result<Self> {
        if fixed_one.is_zero() {
            return Err(Error::config("FIXED_1 must be positive"));
        }
        if target_bits == 0 {
            return Err(Error::config("target integer width must be positive"));
        }
        Ok(Self {
            fixed_one,
            precision,
            target_bits,
        })
    }

    /// The fixed-point scale.
    #[must_use]
    pub fn fixed_one(&self) -> &BigUint {
        &self.fixed_one
    }

    /// The requested relative precision.
    #[must_use]
    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Width of the consuming runtime's integers.
    #[must_use]
    pub fn target_bits(&self) -> u32 {
        self.target_bits
    }

    /// The tangent point `x0 = t^(1/n)`, accurate enough that
    /// `|x0^n - t| / t` stays below the configured precision.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::Precision`] from the arithmetic engine.
    pub fn root(&self, degree: Degree, threshold: &Threshold) -> Result<Decimal> {
        let exponent = BigRational::new(BigInt::from(1u8), BigInt::from(degree.get()));
        power(
            threshold.as_ratio(),
            &exponent,
            self.precision.tightened(degree.guard_digits()),
        )
    }

    /// Derives the coefficients of the tangent line at `threshold`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidThresholdSequence`] if `t · FIXED_1` is fractional.
    /// - [`Error::Precision`] if a rounding stays ambiguous after
    ///   [`ROUNDING_REFINEMENTS`] retries.
    /// - [`Error::Range`] if any integer exceeds the target width or the
    ///   coefficient rounds to zero.
    pub fn derive(&self, degree: Degree, threshold: &Threshold) -> Result<BreakpointCoefficients> {
        let n = degree.get();
        let fixed = threshold.to_fixed(&self.fixed_one)?;
        check_width(&format!("threshold {threshold}"), &fixed, self.target_bits)?;

        let fixed_one = BigRational::from_integer(BigInt::from(self.fixed_one.clone()));
        let n_ratio = BigRational::from_integer(BigInt::from(n));
        let root_exponent = BigRational::new(BigInt::from(1u8), BigInt::from(n));
        let slope_exponent = BigRational::new(BigInt::from(n - 1), BigInt::from(n));

        let intercept_scale = &fixed_one * &slope_exponent;
        let coefficient_scale = &fixed_one * &n_ratio;

        let intercept = self.rounded_power(threshold, &root_exponent, &intercept_scale)?;
        let coefficient = self.rounded_power(threshold, &slope_exponent, &coefficient_scale)?;

        if coefficient.is_zero() {
            return Err(Error::range(
                format!("coefficient at threshold {threshold}"),
                "rounds to zero, which the runtime would divide by",
            ));
        }
        check_width(&format!("intercept at threshold {threshold}"), &intercept, self.target_bits)?;
        check_width(
            &format!("coefficient at threshold {threshold}"),
            &coefficient,
            self.target_bits,
        )?;

        debug!(
            degree = n,
            %threshold,
            %intercept,
            %coefficient,
            "derived breakpoint coefficients"
        );

        Ok(BreakpointCoefficients {
            threshold: fixed,
            intercept,
            coefficient,
        })
    }

    /// Derives every threshold of a sequence, in order.
    ///
    /// Pairs are computed on the rayon pool; results and the reported error
    /// (the first failing threshold in sequence order) do not depend on
    /// scheduling.
    ///
    /// # Errors
    ///
    /// Returns the error of the first threshold that fails to derive.
    pub fn derive_all(
        &self,
        degree: Degree,
        thresholds: &[Threshold],
    ) -> Result<Vec<BreakpointCoefficients>> {
        let results: Vec<Result<BreakpointCoefficients>> = thresholds
            .par_iter()
            .map(|threshold| self.derive(degree, threshold))
            .collect();
        results.into_iter().collect()
    }

    /// `round(threshold^exponent · scale)`, retrying at tighter precision
    /// while the enclosure straddles a rounding boundary.
    fn rounded_power(
        &self,
        threshold: &Threshold,
        exponent: &BigRational,
        scale: &BigRational,
    ) -> Result<BigUint> {
        let label = format!("{threshold}^({exponent})");
        refine_rounding(&label, self.precision, scale, |precision| {
            power(threshold.as_ratio(), exponent, precision)
        })
    }
}

/// Rounds `evaluate(precision) · scale`, tightening the precision by
/// [`REFINEMENT_DIGITS`] after every ambiguous attempt. At most
/// `ROUNDING_REFINEMENTS + 1` evaluations are made.
fn refine_rounding<F>(
    label: &str,
    start: Precision,
    scale: &BigRational,
    mut evaluate: F,
) -> Result<BigUint>
where
    F: FnMut(Precision) -> Result<Decimal>,
{
    let mut precision = start;
    for attempt in 0..=ROUNDING_REFINEMENTS {
        let value = evaluate(precision)?;
        match scale_to_fixed_point(&value, scale) {
            Ok(rounded) => return Ok(rounded),
            Err(err) if err.is_precision() => {
                warn!(
                    value = label,
                    attempt,
                    digits = precision.digits(),
                    "rounding is ambiguous, tightening precision"
                );
                precision = precision.tightened(REFINEMENT_DIGITS);
            }
            Err(err) => return Err(err),
        }
    }
    Err(Error::precision(format!(
        "rounding {label} stayed ambiguous at {} digits",
        precision.digits()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precision::{pow10, rational_pow};

    fn deriver() -> CoefficientDeriver {
        CoefficientDeriver::new(pow10(18), Precision::default(), 256).unwrap()
    }

    fn threshold(s: &str) -> Threshold {
        s.parse().unwrap()
    }

    fn big(s: &str) -> BigUint {
        s.parse().unwrap()
    }

    #[test]
    fn degree_outside_range_is_rejected() {
        assert_eq!(Degree::new(1).unwrap_err(), Error::InvalidDegree { degree: 1 });
        assert_eq!(Degree::new(0).unwrap_err(), Error::InvalidDegree { degree: 0 });
        assert_eq!(Degree::try_from(10).unwrap().get(), 10);
        assert_eq!(Degree::new(MAX_DEGREE).unwrap().get(), MAX_DEGREE);
        assert_eq!(
            Degree::new(MAX_DEGREE + 1).unwrap_err(),
            Error::InvalidDegree { degree: MAX_DEGREE + 1 }
        );
        assert!(Degree::new(100_000_000).is_err());
    }

    #[test]
    fn square_root_at_eleven_tenths() {
        let c = deriver()
            .derive(Degree::new(2).unwrap(), &threshold("1.1"))
            .unwrap();
        assert_eq!(c.threshold, big("1100000000000000000"));
        assert_eq!(c.intercept, big("524404424085075773"));
        assert_eq!(c.coefficient, big("2097617696340303094"));
    }

    #[test]
    fn tangent_at_one_is_the_plain_average() {
        for n in 2..=10u32 {
            let c = deriver().derive(Degree::new(n).unwrap(), &threshold("1")).unwrap();
            assert_eq!(c.coefficient, pow10(18) * n);
            // (n - 1)/n · 10^18, half-up.
            let expected = (pow10(18) * (2 * (n - 1)) + n) / (2 * n);
            assert_eq!(c.intercept, expected, "degree {n}");
        }
    }

    #[test]
    fn perfect_powers_are_exact() {
        let c = deriver().derive(Degree::new(3).unwrap(), &threshold("8")).unwrap();
        assert_eq!(c.intercept, big("1333333333333333333"));
        assert_eq!(c.coefficient, big("12000000000000000000"));

        let c = deriver().derive(Degree::new(2).unwrap(), &threshold("1e12")).unwrap();
        assert_eq!(c.intercept, big("500000000000000000000000"));
        assert_eq!(c.coefficient, big("2000000000000000000000000"));
    }

    #[test]
    fn root_meets_the_precision_bound() {
        let d = deriver();
        for n in 2..=10u32 {
            let t = threshold("1.7");
            let x0 = d.root(Degree::new(n).unwrap(), &t).unwrap();
            let err = (rational_pow(&x0.lower(), n) - t.as_ratio()).abs() / t.as_ratio();
            assert!(err < d.precision().relative_bound(), "degree {n}");
        }
    }

    #[test]
    fn fractional_fixed_threshold_is_rejected() {
        let err = deriver()
            .derive(Degree::new(2).unwrap(), &threshold("1/3"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidThresholdSequence { .. }));
    }

    #[test]
    fn non_positive_threshold_is_rejected() {
        assert!(matches!(
            "0".parse::<Threshold>(),
            Err(Error::InvalidThresholdSequence { .. })
        ));
        assert!(matches!("abc".parse::<Threshold>(), Err(Error::Config { .. })));
    }

    #[test]
    fn narrow_target_width_overflows() {
        let narrow = CoefficientDeriver::new(pow10(18), Precision::default(), 64).unwrap();
        let err = narrow
            .derive(Degree::new(2).unwrap(), &threshold("1e12"))
            .unwrap_err();
        assert!(matches!(err, Error::Range { .. }));
    }

    #[test]
    fn derive_all_preserves_order_and_is_repeatable() {
        let d = deriver();
        let ladder: Vec<Threshold> = ["1", "1.5", "2", "10", "1e6"]
            .iter()
            .map(|s| threshold(s))
            .collect();
        let first = d.derive_all(Degree::new(5).unwrap(), &ladder).unwrap();
        let second = d.derive_all(Degree::new(5).unwrap(), &ladder).unwrap();
        assert_eq!(first, second);
        let fixed: Vec<BigUint> = ladder.iter().map(|t| t.to_fixed(d.fixed_one()).unwrap()).collect();
        let derived: Vec<BigUint> = first.iter().map(|c| c.threshold.clone()).collect();
        assert_eq!(fixed, derived);
    }

    #[test]
    fn derive_all_reports_first_failure_in_order() {
        let d = deriver();
        let ladder: Vec<Threshold> = ["1", "1/3", "1/7"].iter().map(|s| threshold(s)).collect();
        let err = d.derive_all(Degree::new(2).unwrap(), &ladder).unwrap_err();
        assert!(err.to_string().contains("1/3"));
    }

    #[test]
    fn persistent_ambiguity_exhausts_refinements() {
        // [2.4, 2.5) · 10 always contains 24.5.
        let mut calls = 0;
        let err = refine_rounding("x", Precision::default(), &"10".parse().unwrap(), |_| {
            calls += 1;
            Ok(Decimal::enclosed(BigUint::from(24u32), 1))
        })
        .unwrap_err();
        assert!(err.is_precision());
        assert_eq!(calls, ROUNDING_REFINEMENTS + 1);
    }

    #[test]
    fn refinement_tightens_until_decidable() {
        let mut seen = Vec::new();
        let rounded = refine_rounding("x", Precision::default(), &"10".parse().unwrap(), |p| {
            seen.push(p.digits());
            if seen.len() < 3 {
                Ok(Decimal::enclosed(BigUint::from(24u32), 1))
            } else {
                Ok(Decimal::enclosed(BigUint::from(2_449u32), 3))
            }
        })
        .unwrap();
        assert_eq!(rounded, BigUint::from(24u32));
        assert_eq!(seen, vec![36, 54, 72]);
    }

    #[test]
    fn unreachable_precision_propagates_from_derive() {
        let d = CoefficientDeriver::new(pow10(18), Precision::new(3_000_000_000).unwrap(), 256)
            .unwrap();
        let err = d.derive(Degree::new(2).unwrap(), &threshold("1.1")).unwrap_err();
        assert!(err.is_precision(), "{err}");
        assert!(err.to_string().contains("overflow the scale"));
    }
}
