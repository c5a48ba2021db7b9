//! Pipeline configuration.
//!
//! Everything the pipeline used to hard-code (the provider endpoint, the
//! requested tables, pacing delays, file locations and the candidates
//! compared for the prior margin) lives in [`EnrichConfig`]. Every field
//! has a default, so an empty TOML file is a valid configuration.
//!
//! ```toml
//! [census_api]
//! throttle_ms = 2000
//! backoff_ms = 10000
//!
//! [paths]
//! census_dir = "data/census"
//!
//! [margin.first]
//! last_name = "Obama"
//! party = "D"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use elections_census_models::tables;
use serde::Deserialize;

use crate::EnrichError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EnrichConfig {
    /// Remote census API settings.
    pub census_api: CensusApiConfig,
    /// Input and output file locations.
    pub paths: PathsConfig,
    /// Candidates compared for the prior-election margin.
    pub margin: MarginCandidates,
}

impl EnrichConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError::Config`] if the document is not valid.
    pub fn from_toml(toml_str: &str) -> Result<Self, EnrichError> {
        toml::from_str(toml_str).map_err(Into::into)
    }

    /// Loads the configuration at `path`, or the defaults when `path` is
    /// `None`.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError`] if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, EnrichError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = std::fs::read_to_string(path).map_err(|e| EnrichError::io(path, e))?;
        let config = Self::from_toml(&contents)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// Census Reporter request settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CensusApiConfig {
    /// `data/show` endpoint for the ACS release to query.
    pub base_url: String,
    /// Prefix turning a county FIPS code into a geography id.
    pub geo_id_prefix: String,
    /// Table codes requested for every county.
    pub tables: Vec<String>,
    /// Pause after a successful request, in milliseconds.
    pub throttle_ms: u64,
    /// Pause after a failed request, in milliseconds.
    pub backoff_ms: u64,
    /// Per-request timeout, in seconds.
    pub timeout_secs: u64,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for CensusApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://api.censusreporter.org/1.0/data/show/acs2014_5yr".to_string(),
            geo_id_prefix: "05000US".to_string(),
            tables: tables::ALL.iter().map(ToString::to_string).collect(),
            throttle_ms: 2_000,
            backoff_ms: 10_000,
            timeout_secs: 60,
            user_agent: concat!("elections-census/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl CensusApiConfig {
    /// Pause after a successful request.
    #[must_use]
    pub const fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    /// Pause after a failed request.
    #[must_use]
    pub const fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// File locations, relative to the working directory unless absolute.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// `DuckDB` file holding the imported election results.
    pub results_db: PathBuf,
    /// Directory of per-state raw census caches.
    pub census_dir: PathBuf,
    /// Directory of per-state enriched snapshots.
    pub output_dir: PathBuf,
    /// Prior-election results by county and candidate.
    pub margin_csv: PathBuf,
    /// County unemployment rates.
    pub unemployment_csv: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            results_db: PathBuf::from("data/results.duckdb"),
            census_dir: PathBuf::from("data/census"),
            output_dir: PathBuf::from("data/extra_data"),
            margin_csv: PathBuf::from("data/twentyTwelve.csv"),
            unemployment_csv: PathBuf::from("data/unemployment.csv"),
        }
    }
}

/// A candidate in the prior-election file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Candidate {
    /// Value of the `last` column identifying the candidate's rows.
    pub last_name: String,
    /// Party letter used when this candidate leads, e.g. `"D"`.
    pub party: String,
}

impl Candidate {
    /// Creates a candidate.
    #[must_use]
    pub fn new(last_name: &str, party: &str) -> Self {
        Self {
            last_name: last_name.to_string(),
            party: party.to_string(),
        }
    }
}

/// The two candidates whose vote shares make up the margin.
///
/// A positive difference (`first` ahead) is labeled with `first`'s party;
/// anything else with `second`'s.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MarginCandidates {
    /// Candidate whose share is subtracted from.
    pub first: Candidate,
    /// Candidate whose share is subtracted.
    pub second: Candidate,
}

impl Default for MarginCandidates {
    fn default() -> Self {
        Self {
            first: Candidate::new("Obama", "D"),
            second: Candidate::new("Romney", "R"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(EnrichConfig::from_toml("").unwrap(), EnrichConfig::default());
    }

    #[test]
    fn defaults_match_census_reporter() {
        let api = CensusApiConfig::default();
        assert_eq!(api.geo_id_prefix, "05000US");
        assert_eq!(api.tables, vec!["B01003", "B02001", "B03003", "B19013", "B15003"]);
        assert_eq!(api.throttle(), Duration::from_secs(2));
        assert_eq!(api.backoff(), Duration::from_secs(10));
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = EnrichConfig::from_toml(
            r#"
            [census_api]
            throttle_ms = 0
            backoff_ms = 0

            [paths]
            output_dir = "out"

            [margin.second]
            last_name = "Trump"
            party = "R"
            "#,
        )
        .unwrap();

        assert_eq!(config.census_api.throttle(), Duration::ZERO);
        assert_eq!(config.census_api.geo_id_prefix, "05000US");
        assert_eq!(config.paths.output_dir, PathBuf::from("out"));
        assert_eq!(config.paths.census_dir, PathBuf::from("data/census"));
        assert_eq!(config.margin.first, Candidate::new("Obama", "D"));
        assert_eq!(config.margin.second, Candidate::new("Trump", "R"));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            EnrichConfig::from_toml("[census_api\nthrottle_ms = 1"),
            Err(EnrichError::Config(_))
        ));
    }

    #[test]
    fn load_without_path_uses_defaults() {
        assert_eq!(EnrichConfig::load(None).unwrap(), EnrichConfig::default());
    }
}
