//! Property-based tests for coefficient derivation and table assembly.
//!
//! Thresholds are drawn as `mantissa · 10^exponent` so that `t · FIXED_1`
//! stays integral at `FIXED_1 = 10^18`.

use num_bigint::{BigInt, BigUint};
use num_rational::BigRational;
use num_traits::Signed;
use proptest::prelude::*;
use rootseed::precision::{nth_root_floor, pow10, rational_pow};
use rootseed::{
    CoefficientDeriver, Degree, EstimatorTable, GenerationConfig, Precision, Threshold,
};

fn deriver() -> CoefficientDeriver {
    CoefficientDeriver::new(pow10(18), Precision::default(), 256).unwrap()
}

fn threshold(mantissa: u64, exponent: i32) -> Threshold {
    format!("{mantissa}e{exponent}").parse().unwrap()
}

/// Floor of the exact fixed-point root of `base`: `(base · F^(n-1))^(1/n)`.
fn exact_root(base: &BigUint, n: u32) -> BigUint {
    let radicand = base * pow10(18).pow(n - 1);
    nth_root_floor(&radicand, n).unwrap().0
}

/// A ladder starting at `first` where consecutive thresholds differ by a
/// factor in `[1.1, 10]`.
fn ladder() -> impl Strategy<Value = Vec<String>> {
    (1u64..=1000, prop::collection::vec(11u64..=100, 1..6)).prop_map(|(first, factors)| {
        let mut current = BigRational::from_integer(BigInt::from(first));
        let mut literals = vec![first.to_string()];
        for factor in factors {
            current = current * BigRational::new(BigInt::from(factor), BigInt::from(10u8));
            literals.push(format!("{}/{}", current.numer(), current.denom()));
        }
        literals
    })
}

fn table(degree: u32, literals: &[String]) -> EstimatorTable {
    let literals: Vec<&str> = literals.iter().map(String::as_str).collect();
    let config = GenerationConfig::new()
        .with_ladder([degree], &literals)
        .unwrap();
    rootseed::generate(&config).unwrap().remove(0)
}

// =============================================================================
// Tangent Point Precision
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// |x0^n - t| / t stays below the configured relative precision.
    #[test]
    fn prop_root_meets_precision(n in 2u32..=10, mantissa in 1u64..1_000_000, exponent in -6i32..=12) {
        let t = threshold(mantissa, exponent);
        let root = deriver().root(Degree::new(n).unwrap(), &t).unwrap();

        let x0 = root.lower();
        let ratio = t.as_ratio();
        let error = (rational_pow(&x0, n) - ratio).abs() / ratio;
        prop_assert!(error < Precision::default().relative_bound());
    }

    /// Deriving the same pair twice yields identical integers.
    #[test]
    fn prop_derivation_is_idempotent(n in 2u32..=10, mantissa in 1u64..1_000_000, exponent in -6i32..=12) {
        let t = threshold(mantissa, exponent);
        let degree = Degree::new(n).unwrap();
        let d = deriver();
        prop_assert_eq!(d.derive(degree, &t).unwrap(), d.derive(degree, &t).unwrap());
    }

    /// The intercept and coefficient bracket the tangent point consistently:
    /// `intercept · n / (n - 1)` and `coefficient / n` are `x0 · F` and
    /// `x0^(n-1) · F` up to rounding, so their ratio reproduces `t`.
    #[test]
    fn prop_coefficients_reproduce_threshold(n in 2u32..=10, mantissa in 1u64..1000, exponent in 0i32..=6) {
        let t = threshold(mantissa, exponent);
        let pair = deriver().derive(Degree::new(n).unwrap(), &t).unwrap();

        // x0 · x0^(n-1) = t, so (intercept·n/(n-1)) · (coefficient/n) ≈ t · F².
        let x0_fixed = BigRational::new(BigInt::from(pair.intercept.clone()) * BigInt::from(n), BigInt::from(n - 1));
        let slope_fixed = BigRational::new(BigInt::from(pair.coefficient.clone()), BigInt::from(n));
        let product = x0_fixed * slope_fixed;
        let expected = BigRational::from_integer(BigInt::from(&pair.threshold * pow10(18)));
        let relative = ((product - &expected) / expected).abs();
        prop_assert!(relative < BigRational::new(BigInt::from(1u8), BigInt::from(pow10(15))));
    }
}

// =============================================================================
// Assembled Table Shape
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Within one branch the estimate never decreases.
    #[test]
    fn prop_monotonic_within_branch(n in 2u32..=10, literals in ladder(), a in 0u64..1000, b in 0u64..1000) {
        let table = table(n, &literals);
        let branch = &table.branches[0];
        let upper = branch.upper_bound.clone().unwrap();
        let width = &upper - &branch.threshold;
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let at = |k: u64| &branch.threshold + &width * k / 1000u32;

        let low = table.estimate(&at(lo)).unwrap();
        let high = table.estimate(&at(hi)).unwrap();
        prop_assert!(low <= high);
    }

    /// The seed never falls below the true root by more than its rounding slack.
    #[test]
    fn prop_seed_bounds_root(n in 2u32..=10, literals in ladder(), k in 0u64..=2000) {
        let table = table(n, &literals);
        let last = &table.branches[table.branches.len() - 1].threshold;
        let base = last * k / 1000u32;

        let branch = table.branch_for(&base).unwrap();
        let seed = table.estimate(&base).unwrap();
        let slack = branch.rounding_slack(&base, &table.fixed_one);
        prop_assert!(seed + slack >= exact_root(&base, n));
    }

    /// Every branch but the last is bounded by its successor's threshold.
    #[test]
    fn prop_upper_bounds_link_branches(n in 2u32..=10, literals in ladder()) {
        let table = table(n, &literals);
        prop_assert_eq!(table.branches.len(), literals.len());
        for pair in table.branches.windows(2) {
            prop_assert_eq!(pair[0].upper_bound.as_ref(), Some(&pair[1].threshold));
        }
        prop_assert!(table.branches[table.branches.len() - 1].upper_bound.is_none());
    }
}
