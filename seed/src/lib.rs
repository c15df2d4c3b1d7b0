//! Seed tables for fixed-point n-th root solvers.
//!
//! A Newton n-th root solver working in fixed point (`FIXED_1 = 10^18`)
//! needs a cheap first guess. This crate derives, for each degree `n` and a
//! ladder of thresholds, the tangent line of `t^(1/n)` at every threshold as
//! a pair of integers usable as `intercept + base · FIXED_1 / coefficient`,
//! and assembles them into a validated piecewise table. The tables end up as
//! literal constants in a downstream artifact, so every step is exact
//! arithmetic with a single, explicit rounding.
//!
//! Data flows strictly one way:
//!
//! 1. [`precision`]: rational powers as exact enclosures, plus the one
//!    rounding into fixed point.
//! 2. [`derivation`]: `(degree, threshold)` to [`BreakpointCoefficients`].
//! 3. [`table`]: ordering, continuity validation, the unbounded tail branch.
//!
//! # Entry Point
//!
//! ```
//! use rootseed::{generate, GenerationConfig};
//!
//! let config = GenerationConfig::new()
//!     .with_ladder([2], &["1", "1.1", "2"])
//!     .unwrap();
//! let tables = generate(&config).unwrap();
//! let sqrt = &tables[0];
//! assert_eq!(sqrt.branches.len(), 3);
//! assert!(sqrt.branches[2].upper_bound.is_none());
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod config;
pub mod derivation;
pub mod error;
pub mod precision;
pub mod rational;
pub mod serializer;
pub mod table;

pub use config::{GenerationConfig, Ladder};
pub use derivation::{BreakpointCoefficients, CoefficientDeriver, Degree, Threshold};
pub use error::{Error, Result};
pub use precision::{power, scale_to_fixed_point, Decimal, Precision};
pub use table::{Branch, ContinuityTolerance, EstimatorTable, TableAssembler};

use tracing::info_span;

/// Derives and assembles one table per configured degree, ordered by degree.
///
/// # Errors
///
/// Returns the first error met, in degree order: configuration problems,
/// derivation failures ([`Error::Precision`], [`Error::Range`],
/// [`Error::InvalidThresholdSequence`]) or assembly failures
/// ([`Error::Discontinuity`]).
pub fn generate(config: &GenerationConfig) -> Result<Vec<EstimatorTable>> {
    config.validate()?;
    let deriver = config.deriver()?;
    let assembler = config.assembler();

    config
        .sequences()
        .into_iter()
        .map(|(degree, thresholds)| {
            let span = info_span!("derive_table", degree = degree.get());
            let _entered = span.enter();
            let coefficients = deriver.derive_all(degree, thresholds)?;
            assembler.assemble(degree, coefficients)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_ordered_by_degree() {
        let config = GenerationConfig::new()
            .with_ladder([7, 3], &["1", "2"])
            .unwrap()
            .with_ladder([2], &["1", "4"])
            .unwrap();
        let degrees: Vec<u32> = generate(&config)
            .unwrap()
            .iter()
            .map(|t| t.degree)
            .collect();
        assert_eq!(degrees, vec![2, 3, 7]);
    }

    #[test]
    fn duplicate_degree_within_ladder_is_rejected() {
        let config = GenerationConfig::new().with_ladder([2, 2], &["1"]).unwrap();
        assert!(matches!(generate(&config), Err(Error::Config { .. })));
    }

    #[test]
    fn unordered_ladder_fails_in_assembly() {
        let config = GenerationConfig::new().with_ladder([2], &["2", "1"]).unwrap();
        assert!(matches!(
            generate(&config),
            Err(Error::InvalidThresholdSequence { .. })
        ));
    }
}
