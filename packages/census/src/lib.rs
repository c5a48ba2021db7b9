#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! County enrichment pipeline for election results.
//!
//! Walks the states present in the election results, fetches ACS census
//! tables for every county from Census Reporter one request at a time, and
//! joins the cached census payloads with the prior-election margin and
//! unemployment flat files into one [`EnrichedCountyRecord`] per county.
//!
//! Requests are strictly sequential: each one is followed by a throttle
//! pause, or a longer backoff pause when it fails. A failed county is left
//! out of that run's output rather than retried; re-running the pipeline
//! with `start_state` set to the last finished state picks up from there.
//!
//! [`EnrichedCountyRecord`]: elections_census_models::EnrichedCountyRecord

pub mod config;
pub mod fetcher;
pub mod merge;
pub mod pacing;
pub mod pipeline;
pub mod snapshot;
pub mod sources;
pub mod walker;

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a pipeline run.
///
/// Problems with a single county (a failed request, a missing row, an
/// unparsable number) never surface here; they only blank that county's
/// fields.
#[derive(Debug, Error)]
pub enum EnrichError {
    /// Reading or writing a file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// The file involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A flat file could not be parsed as CSV.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The HTTP client could not be built.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The configuration file is invalid.
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// A flat file lacks a column the merge needs.
    #[error("{file} is missing required column '{column}'")]
    MissingColumn {
        /// Label of the offending file.
        file: String,
        /// The column that was expected in the header.
        column: String,
    },

    /// The results store could not be queried.
    #[error("Results store error: {0}")]
    KeyStore(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl EnrichError {
    /// Wraps an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Read-only view of the geographies present in the election results.
pub trait GeoKeyStore {
    /// Distinct postal state codes, ascending.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError::KeyStore`] if the store cannot be queried.
    fn state_codes(&self) -> Result<Vec<String>, EnrichError>;

    /// Distinct, non-null county FIPS codes for `state`, ascending.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError::KeyStore`] if the store cannot be queried.
    fn fips_codes(&self, state: &str) -> Result<Vec<String>, EnrichError>;
}

/// A fixed state-to-counties mapping, e.g. for a hand-picked subset of
/// counties.
impl GeoKeyStore for BTreeMap<String, Vec<String>> {
    fn state_codes(&self) -> Result<Vec<String>, EnrichError> {
        Ok(self.keys().cloned().collect())
    }

    fn fips_codes(&self, state: &str) -> Result<Vec<String>, EnrichError> {
        let mut codes: Vec<String> = self
            .get(state)
            .map(|codes| codes.iter().filter(|c| !c.is_empty()).cloned().collect())
            .unwrap_or_default();
        codes.sort();
        codes.dedup();
        Ok(codes)
    }
}
