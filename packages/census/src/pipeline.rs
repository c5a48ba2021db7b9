//! State-by-state drivers for the fetch and enrichment passes.
//!
//! Both passes hold at most one state's records in memory and write that
//! state's snapshot before moving on, so an interrupted run loses only the
//! state it was working on. Resume by passing the last completed state as
//! `start_state`.

use std::path::PathBuf;

use elections_census_models::{CensusCache, StateSnapshot};

use crate::fetcher::{CensusFetcher, FetchOutcome};
use crate::merge::{FlatSources, merge};
use crate::snapshot::SnapshotStore;
use crate::walker::states_after;
use crate::{EnrichError, GeoKeyStore};

/// A county left out of a state's census cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedGeography {
    /// County FIPS code.
    pub fipscode: String,
    /// HTTP status, if any response was received.
    pub status: Option<u16>,
    /// Why the request failed.
    pub reason: String,
}

/// Outcome of fetching one state.
#[derive(Debug, Clone)]
pub struct StateFetchSummary {
    /// Postal state code.
    pub state: String,
    /// Counties written to the cache.
    pub fetched: usize,
    /// Counties omitted from the cache.
    pub failed: Vec<FailedGeography>,
    /// Cache file written.
    pub path: PathBuf,
}

/// Outcome of a fetch pass.
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    /// One entry per processed state, in walk order.
    pub states: Vec<StateFetchSummary>,
}

impl FetchReport {
    /// Counties fetched across all states.
    #[must_use]
    pub fn total_fetched(&self) -> usize {
        self.states.iter().map(|s| s.fetched).sum()
    }

    /// Every county that failed, across all states.
    pub fn failures(&self) -> impl Iterator<Item = &FailedGeography> {
        self.states.iter().flat_map(|s| s.failed.iter())
    }

    /// The last state processed, i.e. the checkpoint to resume after.
    #[must_use]
    pub fn last_state(&self) -> Option<&str> {
        self.states.last().map(|s| s.state.as_str())
    }
}

/// Fetches census data for every county of every state after
/// `start_state`, writing one cache file per state.
///
/// Failed counties are recorded in the report and omitted from the cache;
/// they never stop the run.
///
/// # Errors
///
/// Returns [`EnrichError`] if the results store cannot be queried or a
/// cache file cannot be written.
#[allow(clippy::future_not_send)]
pub async fn fetch_census(
    keys: &dyn GeoKeyStore,
    fetcher: &CensusFetcher,
    snapshots: &SnapshotStore,
    start_state: Option<&str>,
) -> Result<FetchReport, EnrichError> {
    let mut report = FetchReport::default();

    for state in states_after(&keys.state_codes()?, start_state) {
        log::info!("getting {state}");

        let mut cache = CensusCache::new();
        let mut failed = Vec::new();

        for fipscode in keys.fips_codes(&state)? {
            match fetcher.fetch(&fipscode).await {
                FetchOutcome::Fetched(payload) => {
                    cache.insert(fipscode, payload);
                }
                FetchOutcome::Failed { status, reason } => failed.push(FailedGeography {
                    fipscode,
                    status,
                    reason,
                }),
            }
        }

        let path = snapshots.write_cache(&state, &cache)?;
        log::info!(
            "{state}: cached {} counties, {} failed -> {}",
            cache.len(),
            failed.len(),
            path.display()
        );

        report.states.push(StateFetchSummary {
            state,
            fetched: cache.len(),
            failed,
            path,
        });
    }

    Ok(report)
}

/// Merges every county in `fips_codes` into a snapshot.
///
/// The snapshot has exactly one entry per distinct code, whatever the
/// sources hold for it.
#[must_use]
pub fn enrich_state(
    fips_codes: &[String],
    census: &CensusCache,
    sources: &FlatSources,
) -> StateSnapshot {
    fips_codes
        .iter()
        .filter(|code| !code.is_empty())
        .map(|fipscode| {
            log::debug!("extracting {fipscode}");
            (fipscode.clone(), merge(fipscode, census, sources))
        })
        .collect()
}

/// Outcome of enriching one state.
#[derive(Debug, Clone)]
pub struct StateEnrichSummary {
    /// Postal state code.
    pub state: String,
    /// Counties in the snapshot.
    pub counties: usize,
    /// Counties with at least one census field.
    pub with_census: usize,
    /// Counties with a prior margin.
    pub with_margin: usize,
    /// Counties with an unemployment rate.
    pub with_unemployment: usize,
    /// Snapshot file written.
    pub path: PathBuf,
}

/// Outcome of an enrichment pass.
#[derive(Debug, Clone, Default)]
pub struct EnrichReport {
    /// One entry per processed state, in walk order.
    pub states: Vec<StateEnrichSummary>,
}

/// Builds and writes the enriched snapshot of every state after
/// `start_state` from its cached census data and the flat files.
///
/// A state without a census cache is still written, with census fields
/// absent.
///
/// # Errors
///
/// Returns [`EnrichError`] if the results store cannot be queried, a cache
/// file is unreadable, or a snapshot cannot be written.
pub fn enrich(
    keys: &dyn GeoKeyStore,
    snapshots: &SnapshotStore,
    sources: &FlatSources,
    start_state: Option<&str>,
) -> Result<EnrichReport, EnrichError> {
    let mut report = EnrichReport::default();

    for state in states_after(&keys.state_codes()?, start_state) {
        log::info!("getting {state}");

        let census = snapshots.read_cache(&state)?.unwrap_or_else(|| {
            log::warn!(
                "{state}: no census cache at {}, census fields will be empty",
                snapshots.cache_path(&state).display()
            );
            CensusCache::new()
        });

        let snapshot = enrich_state(&keys.fips_codes(&state)?, &census, sources);
        let path = snapshots.write_enriched(&state, &snapshot)?;

        let summary = StateEnrichSummary {
            counties: snapshot.len(),
            with_census: snapshot.values().filter(|r| r.has_census()).count(),
            with_margin: snapshot.values().filter(|r| r.past_margin.is_some()).count(),
            with_unemployment: snapshot.values().filter(|r| r.unemployment.is_some()).count(),
            state,
            path,
        };
        log::info!(
            "{}: {} counties ({} census, {} margin, {} unemployment) -> {}",
            summary.state,
            summary.counties,
            summary.with_census,
            summary.with_margin,
            summary.with_unemployment,
            summary.path.display()
        );
        report.states.push(summary);
    }

    Ok(report)
}
