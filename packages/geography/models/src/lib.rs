#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geographic identifiers used to join election results with census and
//! labor statistics data.
//!
//! Counties are identified by a five-digit FIPS code: the two-digit state
//! FIPS prefix followed by the three-digit county suffix. Election results
//! additionally group counties under a two-letter postal state code.

pub mod fips;

use serde::{Deserialize, Serialize};

/// A county as seen by the enrichment pipeline.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GeographyKey {
    /// Two-letter postal state code (e.g. `"VA"`).
    pub state: String,
    /// Five-digit county FIPS code (e.g. `"51059"`).
    pub fipscode: String,
}

impl GeographyKey {
    /// Creates a key, upper-casing the state code.
    #[must_use]
    pub fn new(state: &str, fipscode: &str) -> Self {
        Self {
            state: state.trim().to_ascii_uppercase(),
            fipscode: fipscode.trim().to_string(),
        }
    }
}

/// Splits a five-digit county FIPS code into its two-digit state prefix
/// and three-digit county suffix.
///
/// Returns `None` unless `fipscode` is exactly five ASCII digits.
#[must_use]
pub fn split_county_fips(fipscode: &str) -> Option<(&str, &str)> {
    if fipscode.len() != 5 || !fipscode.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(fipscode.split_at(2))
}
