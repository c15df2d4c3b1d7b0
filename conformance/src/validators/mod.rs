//! Property validators over generated estimator tables.
//!
//! Every validator takes the configuration the artifact claims to implement
//! and reports per-degree findings. None of them performs I/O.

pub mod continuity;
pub mod determinism;
pub mod extremes;
pub mod precision;
pub mod seed_bound;
pub mod structure;

use num_bigint::BigUint;
use rootseed::precision::nth_root_floor;
use rootseed::Degree;

/// Floor of the exact fixed-point root of `base`:
/// `(base · FIXED_1^(n-1))^(1/n)`, the value a converged solver returns.
pub(crate) fn exact_root(base: &BigUint, degree: u32, fixed_one: &BigUint) -> rootseed::Result<BigUint> {
    let degree = Degree::new(degree)?.get();
    let radicand = base * fixed_one.pow(degree - 1);
    nth_root_floor(&radicand, degree).map(|(root, _)| root)
}
