//! Rational literals used in configuration files.
//!
//! Thresholds such as `1.1`, `1e20` or `1/3` must be read exactly: going
//! through `f64` would already round `1.1` before any derivation starts.

use num_bigint::{BigInt, BigUint};
use num_rational::BigRational;
use num_traits::{One, Zero};
use thiserror::Error;

/// Largest decimal exponent accepted in a literal.
pub const MAX_EXPONENT: i64 = 4096;

/// Why a rational literal was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseRationalError {
    /// The literal is empty.
    #[error("empty rational literal")]
    Empty,
    /// The literal is not `digits[.digits][e[+-]digits]` or `a/b`.
    #[error("malformed rational literal `{0}`")]
    Malformed(String),
    /// The exponent is unreadable or beyond [`MAX_EXPONENT`].
    #[error("exponent out of range in `{0}`")]
    Exponent(String),
    /// `a/0`.
    #[error("zero denominator in `{0}`")]
    ZeroDenominator(String),
}

/// Parses a non-negative rational literal exactly.
///
/// Accepted forms: `5`, `1.1`, `.5`, `1e20`, `2.5E-3`, and a quotient of two
/// such literals, `1/3` or `1e3/7`. Signs are not accepted.
///
/// # Errors
///
/// Returns a [`ParseRationalError`] describing the first problem found.
pub fn parse_rational(literal: &str) -> Result<BigRational, ParseRationalError> {
    let literal = literal.trim();
    if literal.is_empty() {
        return Err(ParseRationalError::Empty);
    }
    match literal.split_once('/') {
        Some((num, den)) => {
            let num = parse_decimal(num.trim(), literal)?;
            let den = parse_decimal(den.trim(), literal)?;
            if den.is_zero() {
                return Err(ParseRationalError::ZeroDenominator(literal.to_owned()));
            }
            Ok(num / den)
        }
        None => parse_decimal(literal, literal),
    }
}

/// Parses a literal that must denote a whole number, such as `1e18`.
///
/// # Errors
///
/// Returns [`ParseRationalError::Malformed`] for fractional values.
pub fn parse_integer(literal: &str) -> Result<BigUint, ParseRationalError> {
    let value = parse_rational(literal)?;
    if !value.is_integer() {
        return Err(ParseRationalError::Malformed(literal.trim().to_owned()));
    }
    value
        .to_integer()
        .to_biguint()
        .ok_or_else(|| ParseRationalError::Malformed(literal.trim().to_owned()))
}

fn parse_decimal(part: &str, literal: &str) -> Result<BigRational, ParseRationalError> {
    let malformed = || ParseRationalError::Malformed(literal.to_owned());

    let (mantissa, exponent) = match part.find(|c| c == 'e' || c == 'E') {
        Some(at) => {
            let exponent: i64 = part[at + 1..]
                .parse()
                .map_err(|_| ParseRationalError::Exponent(literal.to_owned()))?;
            (&part[..at], exponent)
        }
        None => (part, 0),
    };
    if exponent.abs() > MAX_EXPONENT {
        return Err(ParseRationalError::Exponent(literal.to_owned()));
    }

    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(malformed());
    }
    if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }

    let digits = format!("{int_part}{frac_part}");
    let value = BigInt::parse_bytes(digits.as_bytes(), 10).ok_or_else(malformed)?;
    let shift = exponent - frac_part.len() as i64;
    let magnitude = u32::try_from(shift.unsigned_abs())
        .map_err(|_| ParseRationalError::Exponent(literal.to_owned()))?;
    let power = BigInt::from(10u8).pow(magnitude);

    Ok(if shift >= 0 {
        BigRational::from_integer(value * power)
    } else {
        BigRational::new(value, power)
    })
}

/// Formats a rational the way it would be written in a configuration file:
/// integers plainly, everything else as `a/b`.
#[must_use]
pub fn format_rational(value: &BigRational) -> String {
    if value.denom().is_one() {
        value.numer().to_string()
    } else {
        format!("{}/{}", value.numer(), value.denom())
    }
}
