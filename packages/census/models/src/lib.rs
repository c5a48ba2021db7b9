#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Census payload and enriched county record types.
//!
//! [`CensusResponse`] mirrors the Census Reporter `data/show` response
//! closely enough to pull estimates out of it; everything else in the
//! payload is ignored. [`EnrichedCountyRecord`] is what the renderers
//! consume, one per county, grouped into a [`StateSnapshot`] per state.

pub mod tables;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Raw census payloads for one state, keyed by county FIPS code.
///
/// Values are kept exactly as the provider returned them so a later
/// enrichment pass can re-read them without another round of requests.
pub type CensusCache = BTreeMap<String, serde_json::Value>;

/// Enriched records for one state, keyed by county FIPS code.
pub type StateSnapshot = BTreeMap<String, EnrichedCountyRecord>;

/// One ACS table for one geography.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CensusTable {
    /// Field code (e.g. `"B01003001"`) to estimate. The provider reports
    /// suppressed estimates as `null`.
    #[serde(default)]
    pub estimate: BTreeMap<String, Option<f64>>,
    /// Field code to margin of error.
    #[serde(default)]
    pub error: BTreeMap<String, Option<f64>>,
}

impl CensusTable {
    /// Returns the estimate for `field`, if present and finite.
    #[must_use]
    pub fn estimate(&self, field: &str) -> Option<f64> {
        self.estimate
            .get(field)
            .copied()
            .flatten()
            .filter(|v| v.is_finite())
    }
}

/// The part of a `data/show` response the pipeline reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CensusResponse {
    /// Geography id (e.g. `"05000US51059"`) to table code to table.
    #[serde(default)]
    pub data: BTreeMap<String, BTreeMap<String, CensusTable>>,
}

impl CensusResponse {
    /// Decodes a cached raw payload.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if the value does not have the
    /// expected shape.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    /// Tables for the first geography in the payload. Each request asks
    /// for exactly one geography.
    #[must_use]
    pub fn first_geography(&self) -> Option<&BTreeMap<String, CensusTable>> {
        self.data.values().next()
    }
}

/// Census-derived fields for one county.
///
/// Each field is absent when its estimates are missing or its denominator
/// is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CensusFields {
    /// Total population.
    pub population: Option<u64>,
    /// Share of the population reporting white alone, `0.0..=1.0`.
    pub percent_white: Option<f64>,
    /// Share of the population reporting Black alone, `0.0..=1.0`.
    pub percent_black: Option<f64>,
    /// Share of the population of Hispanic or Latino origin.
    pub percent_hispanic: Option<f64>,
    /// Median household income in dollars.
    pub median_income: Option<f64>,
    /// Share of adults 25+ holding a bachelor's degree or higher.
    pub percent_bachelors: Option<f64>,
}

/// Enrichment data for a single county.
///
/// The three groups are independent: a gap in one source leaves only that
/// group as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichedCountyRecord {
    /// Unemployment rate in percent.
    pub unemployment: Option<f64>,
    /// Prior presidential margin, e.g. `"D +6"`.
    pub past_margin: Option<String>,
    /// Census profile; `None` when the county has no usable census payload.
    pub census: Option<CensusFields>,
}

impl EnrichedCountyRecord {
    /// Whether the county has a census profile.
    #[must_use]
    pub const fn has_census(&self) -> bool {
        self.census.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_census_reporter_shape() {
        let value = serde_json::json!({
            "tables": { "B01003": { "title": "Total Population" } },
            "geography": { "05000US51059": { "name": "Fairfax County, VA" } },
            "data": {
                "05000US51059": {
                    "B01003": {
                        "estimate": { "B01003001": 1128722.0 },
                        "error": { "B01003001": 0.0 }
                    }
                }
            }
        });

        let response = CensusResponse::from_value(&value).unwrap();
        let tables = response.first_geography().unwrap();
        assert_eq!(tables["B01003"].estimate("B01003001"), Some(1_128_722.0));
    }

    #[test]
    fn null_estimates_read_as_none() {
        let value = serde_json::json!({
            "data": { "05000US01001": { "B19013": { "estimate": { "B19013001": null } } } }
        });

        let response = CensusResponse::from_value(&value).unwrap();
        let tables = response.first_geography().unwrap();
        assert_eq!(tables["B19013"].estimate("B19013001"), None);
        assert_eq!(tables["B19013"].estimate("B19013002"), None);
    }

    #[test]
    fn empty_record_serializes_null_groups() {
        let json = serde_json::to_value(EnrichedCountyRecord::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "unemployment": null, "past_margin": null, "census": null })
        );
    }

    #[test]
    fn census_fields_nest_under_census_key() {
        let record = EnrichedCountyRecord {
            unemployment: Some(5.4),
            past_margin: Some("D +6".to_string()),
            census: Some(CensusFields {
                population: Some(1_000),
                percent_white: Some(0.5),
                percent_black: None,
                percent_hispanic: Some(0.1),
                median_income: Some(61_000.0),
                percent_bachelors: Some(0.4),
            }),
        };

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"unemployment":5.4,"past_margin":"D +6","census":{"population":1000,"percent_white":0.5,"percent_black":null,"percent_hispanic":0.1,"median_income":61000.0,"percent_bachelors":0.4}}"#
        );
    }

    #[test]
    fn has_census_tracks_census_group_only() {
        let mut record = EnrichedCountyRecord {
            unemployment: Some(5.4),
            ..EnrichedCountyRecord::default()
        };
        assert!(!record.has_census());
        record.census = Some(CensusFields::default());
        assert!(record.has_census());
    }
}
