//! Generation configuration.
//!
//! Degrees, threshold ladders, the fixed-point scale and the precision budget
//! are caller-supplied data. They are read from TOML:
//!
//! ```toml
//! fixed_one = "1e18"
//! precision_digits = 36
//! target_bits = 256
//!
//! [continuity]
//! relative_slack = "1e-9"
//! slack_units = 4
//!
//! [[ladder]]
//! degrees = [2, 3]
//! thresholds = ["1", "1.5", "2", "1e3"]
//! ```
//!
//! Every field except `ladder` has a default. A degree may appear in at most
//! one ladder.

use std::collections::BTreeMap;

use num_bigint::BigUint;
use num_traits::{Signed, Zero};
use serde::Deserialize;

use crate::derivation::{CoefficientDeriver, Degree, Threshold};
use crate::error::{Error, Result};
use crate::precision::{Precision, DEFAULT_DIGITS};
use crate::rational::{parse_integer, parse_rational};
use crate::table::{
    ContinuityTolerance, TableAssembler, DEFAULT_RELATIVE_SLACK, DEFAULT_SLACK_UNITS,
};

/// The standard ladder for n = 2..10 at FIXED_1 = 10^18.
pub const STANDARD_TOML: &str = include_str!("../standard.toml");

/// Default integer width of the consuming runtime.
pub const DEFAULT_TARGET_BITS: u32 = 256;

const DEFAULT_FIXED_ONE: &str = "1e18";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default = "default_fixed_one")]
    fixed_one: String,
    #[serde(default = "default_precision_digits")]
    precision_digits: u32,
    #[serde(default = "default_target_bits")]
    target_bits: u32,
    #[serde(default)]
    continuity: RawContinuity,
    ladder: Vec<RawLadder>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawContinuity {
    #[serde(default = "default_relative_slack")]
    relative_slack: String,
    #[serde(default = "default_slack_units")]
    slack_units: u32,
}

impl Default for RawContinuity {
    fn default() -> Self {
        Self {
            relative_slack: default_relative_slack(),
            slack_units: default_slack_units(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLadder {
    degrees: Vec<u32>,
    thresholds: Vec<String>,
}

fn default_fixed_one() -> String {
    DEFAULT_FIXED_ONE.to_owned()
}

fn default_precision_digits() -> u32 {
    DEFAULT_DIGITS
}

fn default_target_bits() -> u32 {
    DEFAULT_TARGET_BITS
}

fn default_relative_slack() -> String {
    DEFAULT_RELATIVE_SLACK.to_owned()
}

fn default_slack_units() -> u32 {
    DEFAULT_SLACK_UNITS
}

/// A threshold sequence shared by one or more degrees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ladder {
    /// Degrees generated from this sequence.
    pub degrees: Vec<Degree>,
    /// Thresholds in the order they were configured.
    pub thresholds: Vec<Threshold>,
}

/// Validated generation configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    /// Fixed-point scale `FIXED_1`.
    pub fixed_one: BigUint,
    /// Relative precision of every root.
    pub precision: Precision,
    /// Integer width of the consuming runtime.
    pub target_bits: u32,
    /// Boundary tolerance for the assembler.
    pub continuity: ContinuityTolerance,
    /// Threshold ladders.
    pub ladders: Vec<Ladder>,
}

impl GenerationConfig {
    /// A configuration with default scale, precision, width and tolerance,
    /// and no ladders yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            fixed_one: crate::precision::pow10(18),
            precision: Precision::default(),
            target_bits: DEFAULT_TARGET_BITS,
            continuity: ContinuityTolerance::default(),
            ladders: Vec::new(),
        }
    }

    /// The built-in standard configuration.
    ///
    /// # Errors
    ///
    /// Only fails if the embedded file is broken.
    pub fn standard() -> Result<Self> {
        Self::from_toml(STANDARD_TOML)
    }

    /// Parses and validates a TOML configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for syntax errors, unknown keys, malformed
    /// literals, a non-integral `fixed_one`, zero `precision_digits` or
    /// `target_bits`, a negative relative slack, or a degree listed twice;
    /// [`Error::InvalidDegree`] for a degree outside `2..=MAX_DEGREE`; and
    /// [`Error::InvalidThresholdSequence`] for a non-positive threshold.
    pub fn from_toml(text: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(text).map_err(|e| Error::config(e.to_string()))?;

        let fixed_one = parse_integer(&raw.fixed_one)
            .map_err(|e| Error::config(format!("fixed_one: {e}")))?;
        let relative_slack = parse_rational(&raw.continuity.relative_slack)
            .map_err(|e| Error::config(format!("relative_slack: {e}")))?;

        let mut config = Self {
            fixed_one,
            precision: Precision::new(raw.precision_digits)?,
            target_bits: raw.target_bits,
            continuity: ContinuityTolerance {
                relative_slack,
                slack_units: raw.continuity.slack_units,
            },
            ladders: Vec::new(),
        };
        for ladder in &raw.ladder {
            let thresholds: Vec<&str> = ladder.thresholds.iter().map(String::as_str).collect();
            config = config.with_ladder(ladder.degrees.iter().copied(), &thresholds)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Adds a ladder of threshold literals for `degrees`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDegree`], [`Error::Config`] or
    /// [`Error::InvalidThresholdSequence`] for bad entries, and
    /// [`Error::Config`] when a degree is already configured.
    pub fn with_ladder(
        mut self,
        degrees: impl IntoIterator<Item = u32>,
        thresholds: &[&str],
    ) -> Result<Self> {
        let degrees = degrees
            .into_iter()
            .map(Degree::new)
            .collect::<Result<Vec<_>>>()?;
        let thresholds = thresholds
            .iter()
            .map(|literal| literal.parse::<Threshold>())
            .collect::<Result<Vec<_>>>()?;
        for degree in &degrees {
            if self.ladders.iter().any(|l| l.degrees.contains(degree)) {
                return Err(Error::config(format!("degree {degree} is configured twice")));
            }
        }
        self.ladders.push(Ladder {
            degrees,
            thresholds,
        });
        Ok(self)
    }

    /// Checks the scalar settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a zero scale or width, a negative
    /// relative slack, or a degree listed twice within one ladder.
    pub fn validate(&self) -> Result<()> {
        if self.fixed_one.is_zero() {
            return Err(Error::config("fixed_one must be positive"));
        }
        if self.target_bits == 0 {
            return Err(Error::config("target_bits must be positive"));
        }
        if self.continuity.relative_slack.is_negative() {
            return Err(Error::config("relative_slack must not be negative"));
        }
        let mut seen = BTreeMap::new();
        for (index, ladder) in self.ladders.iter().enumerate() {
            for degree in &ladder.degrees {
                if let Some(previous) = seen.insert(*degree, index) {
                    return Err(Error::config(format!(
                        "degree {degree} appears in ladders {previous} and {index}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Every configured `(degree, thresholds)` pair, ordered by degree.
    #[must_use]
    pub fn sequences(&self) -> Vec<(Degree, &[Threshold])> {
        let mut sequences: Vec<(Degree, &[Threshold])> = self
            .ladders
            .iter()
            .flat_map(|ladder| {
                ladder
                    .degrees
                    .iter()
                    .map(move |degree| (*degree, ladder.thresholds.as_slice()))
            })
            .collect();
        sequences.sort_by_key(|(degree, _)| *degree);
        sequences
    }

    /// A deriver for this scale, precision and width.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a zero scale or width.
    pub fn deriver(&self) -> Result<CoefficientDeriver> {
        CoefficientDeriver::new(self.fixed_one.clone(), self.precision, self.target_bits)
    }

    /// An assembler for this scale, width and tolerance.
    #[must_use]
    pub fn assembler(&self) -> TableAssembler {
        TableAssembler::new(self.fixed_one.clone(), self.target_bits, self.continuity.clone())
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new()
    }
}
