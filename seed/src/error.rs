//! Error taxonomy for seed-table generation.
//!
//! Every error is raised synchronously at generation time. None of them is
//! retried automatically: each one points at a configuration or precision
//! budget that the caller has to fix before generating again.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while deriving or assembling seed tables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The root degree is below 2 or above [`MAX_DEGREE`](crate::derivation::MAX_DEGREE).
    #[error(
        "invalid degree {degree}: n-th roots need 2 <= n <= {}",
        crate::derivation::MAX_DEGREE
    )]
    InvalidDegree {
        /// The rejected degree.
        degree: u32,
    },

    /// The threshold sequence is empty, unordered, or holds an unusable value.
    #[error("invalid threshold sequence: {reason}")]
    InvalidThresholdSequence {
        /// What is wrong with the sequence.
        reason: String,
    },

    /// The arithmetic engine could not reach the requested precision.
    #[error("precision target not reached: {reason}")]
    Precision {
        /// Which bound was exhausted.
        reason: String,
    },

    /// A derived integer does not fit the consuming runtime's integers.
    #[error("{quantity} out of range: {reason}")]
    Range {
        /// Name of the offending quantity.
        quantity: String,
        /// Why it cannot be represented.
        reason: String,
    },

    /// Two adjacent branches disagree at their shared boundary.
    #[error(
        "degree {degree}: branch {index} evaluates to {left} at the start of the next branch, \
         which evaluates to {right}"
    )]
    Discontinuity {
        /// Root degree of the table.
        degree: u32,
        /// Index of the left-hand branch.
        index: usize,
        /// Left branch evaluated at the boundary.
        left: String,
        /// Right branch evaluated at the boundary.
        right: String,
    },

    /// An operand lies outside the arithmetic engine's domain.
    #[error("domain error: {reason}")]
    Domain {
        /// The offending operation.
        reason: String,
    },

    /// The generation configuration could not be parsed or is inconsistent.
    #[error("configuration error: {reason}")]
    Config {
        /// Parse or validation message.
        reason: String,
    },
}

impl Error {
    pub(crate) fn precision(reason: impl Into<String>) -> Self {
        Self::Precision {
            reason: reason.into(),
        }
    }

    pub(crate) fn sequence(reason: impl Into<String>) -> Self {
        Self::InvalidThresholdSequence {
            reason: reason.into(),
        }
    }

    pub(crate) fn domain(reason: impl Into<String>) -> Self {
        Self::Domain {
            reason: reason.into(),
        }
    }

    pub(crate) fn range(quantity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Range {
            quantity: quantity.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Returns true for [`Error::Precision`].
    #[must_use]
    pub fn is_precision(&self) -> bool {
        matches!(self, Self::Precision { .. })
    }
}

/// Fails with [`Error::Range`] when `value` needs more than `target_bits` bits.
///
/// # Errors
///
/// Returns [`Error::Range`] naming `quantity` on overflow.
pub fn check_width(
    quantity: &str,
    value: &num_bigint::BigUint,
    target_bits: u32,
) -> Result<()> {
    let bits = value.bits();
    if bits > u64::from(target_bits) {
        return Err(Error::range(
            quantity,
            format!("needs {bits} bits, target width is {target_bits}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;

    #[test]
    fn width_check_accepts_exact_fit() {
        let value = (BigUint::from(1u8) << 256u32) - BigUint::from(1u8);
        assert!(check_width("coefficient", &value, 256).is_ok());
    }

    #[test]
    fn width_check_rejects_overflow() {
        let value = BigUint::from(1u8) << 256u32;
        let err = check_width("coefficient", &value, 256).unwrap_err();
        assert_eq!(
            err.to_string(),
            "coefficient out of range: needs 257 bits, target width is 256"
        );
    }

    #[test]
    fn discontinuity_message_names_both_branches() {
        let err = Error::Discontinuity {
            degree: 3,
            index: 4,
            left: "10".to_owned(),
            right: "20".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("branch 4"));
        assert!(msg.contains("10"));
        assert!(msg.contains("20"));
    }
}
