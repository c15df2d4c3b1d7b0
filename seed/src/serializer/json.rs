//! JSON artifact: the sole output consumed by external renderers.
//!
//! ```json
//! {
//!   "format": "rootseed-tables/1",
//!   "tables": [
//!     {
//!       "degree": 2,
//!       "fixed_one": "1000000000000000000",
//!       "target_bits": 256,
//!       "branches": [
//!         { "threshold": "1000000000000000000", "upper_bound": "1100000000000000000",
//!           "intercept": "500000000000000000", "coefficient": "2000000000000000000" },
//!         ...
//!       ]
//!     }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::table::EstimatorTable;

/// Format tag written into every artifact.
pub const FORMAT: &str = "rootseed-tables/1";

/// A parsed artifact.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Artifact {
    /// Format tag, always [`FORMAT`] after a successful [`from_json`].
    pub format: String,
    /// One table per degree.
    pub tables: Vec<EstimatorTable>,
}

#[derive(Serialize)]
struct ArtifactRef<'a> {
    format: &'a str,
    tables: &'a [EstimatorTable],
}

impl Artifact {
    /// The table for `degree`, if present.
    #[must_use]
    pub fn table(&self, degree: u32) -> Option<&EstimatorTable> {
        self.tables.iter().find(|t| t.degree == degree)
    }
}

/// Serializes tables into the artifact layout through their `Serialize`
/// impls.
///
/// Keys come out sorted, so equal tables always produce identical text.
///
/// # Errors
///
/// Returns [`Error::Config`] if a table cannot be represented as JSON.
pub fn to_json(tables: &[EstimatorTable]) -> Result<Value> {
    serde_json::to_value(ArtifactRef {
        format: FORMAT,
        tables,
    })
    .map_err(|e| Error::config(format!("artifact: {e}")))
}

/// Parses an artifact produced by [`to_json`].
///
/// # Errors
///
/// Returns [`Error::Config`] for malformed JSON or an unknown format tag.
pub fn from_json(text: &str) -> Result<Artifact> {
    let artifact: Artifact =
        serde_json::from_str(text).map_err(|e| Error::config(format!("artifact: {e}")))?;
    if artifact.format != FORMAT {
        return Err(Error::config(format!(
            "artifact format `{}`, expected `{FORMAT}`",
            artifact.format
        )));
    }
    Ok(artifact)
}
