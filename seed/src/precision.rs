//! Precision arithmetic engine.
//!
//! Rational powers are evaluated with exact big-integer arithmetic: the only
//! inexact operation is the floor of an integer n-th root, so every result
//! is an *enclosure* `[m, m + 1) · 10^-scale` of the true value. Rounding to
//! fixed point happens once, in [`scale_to_fixed_point`], and refuses to
//! guess when the enclosure straddles a rounding boundary.
//!
//! ```
//! use num_rational::BigRational;
//! use rootseed::precision::{power, Precision};
//!
//! let base: BigRational = "11/10".parse().unwrap();
//! let half: BigRational = "1/2".parse().unwrap();
//! let root = power(&base, &half, Precision::default()).unwrap();
//! assert!(root.to_string().starts_with("1.04880884817015154699"));
//! ```

use std::fmt;

use num_bigint::{BigInt, BigUint};
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};
use tracing::debug;

use crate::error::{Error, Result};

/// Default relative precision, in decimal digits.
///
/// Results are later rounded into 18-decimal fixed point, so the default
/// keeps roughly twice that many digits.
pub const DEFAULT_DIGITS: u32 = 36;

/// Maximum number of scale refinements in [`power`].
pub const MAX_REFINEMENT_ROUNDS: u32 = 12;

/// Base Newton step budget for [`nth_root_floor`]; the budget grows by `2·n`.
const ROOT_STEP_BUDGET: u32 = 256;

/// A relative-error bound of `10^-digits`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Precision {
    digits: u32,
}

impl Precision {
    /// Creates a bound of `10^-digits`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when `digits` is zero.
    pub fn new(digits: u32) -> Result<Self> {
        if digits == 0 {
            return Err(Error::config("precision needs at least one digit"));
        }
        Ok(Self { digits })
    }

    /// Number of correct significant decimal digits requested.
    #[must_use]
    pub fn digits(&self) -> u32 {
        self.digits
    }

    /// The same bound with `extra` more digits.
    #[must_use]
    pub fn tightened(self, extra: u32) -> Self {
        Self {
            digits: self.digits.saturating_add(extra),
        }
    }

    /// The bound as an exact rational, `1 / 10^digits`.
    #[must_use]
    pub fn relative_bound(&self) -> BigRational {
        BigRational::new(BigInt::one(), BigInt::from(pow10(self.digits)))
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self {
            digits: DEFAULT_DIGITS,
        }
    }
}

/// A high-precision decimal given as an enclosure of the true value.
///
/// The true value lies in `[mantissa, mantissa + 1) · 10^-scale`, or is
/// exactly `mantissa · 10^-scale` when [`Decimal::is_exact`] holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decimal {
    mantissa: BigUint,
    scale: u32,
    exact: bool,
}

impl Decimal {
    /// An exactly known value `mantissa · 10^-scale`.
    #[must_use]
    pub fn exact(mantissa: BigUint, scale: u32) -> Self {
        Self {
            mantissa,
            scale,
            exact: true,
        }
    }

    /// A value known to lie in `[mantissa, mantissa + 1) · 10^-scale`.
    #[must_use]
    pub fn enclosed(mantissa: BigUint, scale: u32) -> Self {
        Self {
            mantissa,
            scale,
            exact: false,
        }
    }

    /// Number of fractional decimal digits.
    #[must_use]
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// True when the value carries no truncation error at all.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.exact
    }

    /// Inclusive lower bound of the true value.
    #[must_use]
    pub fn lower(&self) -> BigRational {
        BigRational::new(
            BigInt::from(self.mantissa.clone()),
            BigInt::from(pow10(self.scale)),
        )
    }

    /// Upper bound of the true value (exclusive unless exact).
    #[must_use]
    pub fn upper(&self) -> BigRational {
        if self.exact {
            return self.lower();
        }
        BigRational::new(
            BigInt::from(&self.mantissa + 1u32),
            BigInt::from(pow10(self.scale)),
        )
    }

    /// Count of decimal digits in the mantissa (zero for a zero mantissa).
    #[must_use]
    pub fn significant_digits(&self) -> u32 {
        decimal_digits(&self.mantissa)
    }

    /// Upper bound on `|true - lower| / true`, or `None` for a zero mantissa
    /// of an inexact value (nothing is known about its magnitude).
    #[must_use]
    pub fn relative_error_bound(&self) -> Option<BigRational> {
        if self.exact {
            return Some(BigRational::zero());
        }
        if self.mantissa.is_zero() {
            return None;
        }
        Some(BigRational::new(
            BigInt::one(),
            BigInt::from(self.mantissa.clone()),
        ))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa.to_str_radix(10);
        let scale = self.scale as usize;
        if scale == 0 {
            return f.write_str(&digits);
        }
        let padded = if digits.len() <= scale {
            format!("{}{digits}", "0".repeat(scale + 1 - digits.len()))
        } else {
            digits
        };
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{int_part}.{frac_part}")
    }
}

/// `10^exp` as a big integer.
#[must_use]
pub fn pow10(exp: u32) -> BigUint {
    BigUint::from(10u8).pow(exp)
}

fn decimal_digits(value: &BigUint) -> u32 {
    if value.is_zero() {
        return 0;
    }
    value.to_str_radix(10).len() as u32
}

/// Floor of the `n`-th root of `x`, and whether the root is exact.
///
/// Integer Newton iteration started from a power of two above the root;
/// iterates decrease strictly until they reach the floor.
///
/// # Errors
///
/// Returns [`Error::Domain`] for `n == 0` and [`Error::Precision`] if the
/// step budget runs out.
pub fn nth_root_floor(x: &BigUint, n: u32) -> Result<(BigUint, bool)> {
    nth_root_floor_within(x, n, ROOT_STEP_BUDGET.saturating_add(n.saturating_mul(2)))
}

fn nth_root_floor_within(x: &BigUint, n: u32, budget: u32) -> Result<(BigUint, bool)> {
    if n == 0 {
        return Err(Error::domain("zeroth root is undefined"));
    }
    if n == 1 || x.is_zero() {
        return Ok((x.clone(), true));
    }

    let bits = x.bits();
    let shift = bits.div_ceil(u64::from(n));
    let mut guess = BigUint::one() << shift;
    let n_big = BigUint::from(n);
    let n_minus_one = BigUint::from(n - 1);

    for _ in 0..budget {
        let next = (&n_minus_one * &guess + x / guess.pow(n - 1)) / &n_big;
        if next >= guess {
            let exact = guess.pow(n) == *x;
            return Ok((guess, exact));
        }
        guess = next;
    }

    Err(Error::precision(format!(
        "{n}-th root of a {bits}-bit integer did not converge within {budget} Newton steps"
    )))
}

/// Evaluates `base^exponent` to a relative error below `precision`.
///
/// Negative exponents invert the base first. The radicand is kept as an
/// exact fraction `a^p / b^p`, so the single truncation is the floor of
/// `(a^p · 10^(scale·q) / b^p)^(1/q)`. When that mantissa has too few
/// significant digits the scale grows and the root is recomputed, at most
/// [`MAX_REFINEMENT_ROUNDS`] times.
///
/// # Errors
///
/// Returns [`Error::Domain`] for a negative base, `0^0`, a zero base with a
/// negative exponent, or an exponent whose parts do not fit `u32`.
/// Returns [`Error::Precision`] when the refinement rounds are exhausted.
pub fn power(base: &BigRational, exponent: &BigRational, precision: Precision) -> Result<Decimal> {
    if base.is_negative() {
        return Err(Error::domain(format!("negative base {base}")));
    }
    if exponent.is_zero() {
        if base.is_zero() {
            return Err(Error::domain("0^0 is undefined"));
        }
        return Ok(Decimal::exact(BigUint::one(), 0));
    }
    if base.is_zero() {
        if exponent.is_negative() {
            return Err(Error::domain("zero base with a negative exponent"));
        }
        return Ok(Decimal::exact(BigUint::zero(), 0));
    }

    let p = exponent
        .numer()
        .magnitude()
        .to_u32()
        .ok_or_else(|| Error::domain(format!("exponent numerator of {exponent} is too large")))?;
    let q = exponent
        .denom()
        .magnitude()
        .to_u32()
        .ok_or_else(|| Error::domain(format!("exponent denominator of {exponent} is too large")))?;

    let (mut num, mut den) = (base.numer().magnitude().clone(), base.denom().magnitude().clone());
    if exponent.is_negative() {
        std::mem::swap(&mut num, &mut den);
    }
    let mut scale = precision
        .digits()
        .checked_add(1)
        .filter(|scale| scale.checked_mul(q).is_some())
        .ok_or_else(|| {
            Error::precision(format!("{} digits overflow the scale of root {q}", precision.digits()))
        })?;
    let radicand_num = num.pow(p);
    let radicand_den = den.pow(p);
    let target = pow10(precision.digits());

    for round in 0..MAX_REFINEMENT_ROUNDS {
        let shift = scale
            .checked_mul(q)
            .ok_or_else(|| Error::precision(format!("scale 10^-{scale} overflows for root {q}")))?;
        let widened = &radicand_num * pow10(shift);
        let divisible = (&widened % &radicand_den).is_zero();
        let (root, root_exact) = nth_root_floor(&(widened / &radicand_den), q)?;

        let value = Decimal {
            mantissa: root,
            scale,
            exact: root_exact && divisible,
        };
        if value.exact || value.mantissa >= target {
            return Ok(value);
        }

        let grow = if value.mantissa.is_zero() {
            scale.max(precision.digits())
        } else {
            precision.digits() + 1 - value.significant_digits()
        };
        debug!(
            round,
            scale,
            grow,
            digits = precision.digits(),
            "power: mantissa too short, refining scale"
        );
        scale = scale
            .checked_add(grow)
            .ok_or_else(|| Error::precision("decimal scale overflowed during refinement"))?;
    }

    Err(Error::precision(format!(
        "{base}^({exponent}) did not reach {} significant digits within {MAX_REFINEMENT_ROUNDS} \
         refinement rounds",
        precision.digits()
    )))
}

/// Rounds `value · scale` half-up to an integer.
///
/// This is the one and only rounding step. For an inexact `value` both ends
/// of the enclosure are rounded; if they disagree the result is undecidable
/// at the value's precision and the caller has to supply a tighter value.
///
/// # Errors
///
/// Returns [`Error::Domain`] for a negative `scale` and
/// [`Error::Precision`] when the rounding is ambiguous.
pub fn scale_to_fixed_point(value: &Decimal, scale: &BigRational) -> Result<BigUint> {
    if scale.is_negative() {
        return Err(Error::domain(format!("negative fixed-point scale {scale}")));
    }
    let half = BigRational::new(BigInt::one(), BigInt::from(2u8));
    let low = (value.lower() * scale + &half).floor();

    if !value.is_exact() {
        let high = (value.upper() * scale + &half).ceil() - BigRational::one();
        if high != low {
            return Err(Error::precision(format!(
                "rounding {value} x {scale} is ambiguous at 10^-{}",
                value.scale()
            )));
        }
    }

    low.to_integer()
        .to_biguint()
        .ok_or_else(|| Error::domain("rounded value is negative"))
}

/// `r^e` for a non-negative integer exponent, exactly.
#[must_use]
pub fn rational_pow(r: &BigRational, e: u32) -> BigRational {
    BigRational::new(r.numer().pow(e), r.denom().pow(e))
}
