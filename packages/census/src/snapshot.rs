//! Per-state JSON artifacts.
//!
//! Two kinds of snapshot are written, one file per state each:
//!
//! * the raw census cache, `<census_dir>/<st>.json`, mapping county FIPS
//!   code to the payload Census Reporter returned;
//! * the enriched snapshot, `<output_dir>/<st>-extra.json`, mapping county
//!   FIPS code to its [`EnrichedCountyRecord`].
//!
//! `<st>` is the lower-cased postal code. Each write replaces the whole
//! file; nothing is merged with a previous run.
//!
//! [`EnrichedCountyRecord`]: elections_census_models::EnrichedCountyRecord

use std::path::{Path, PathBuf};

use elections_census_models::{CensusCache, StateSnapshot};
use serde::Serialize;

use crate::EnrichError;

/// Locations of the per-state artifacts.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    census_dir: PathBuf,
    output_dir: PathBuf,
}

impl SnapshotStore {
    /// Creates a store over the given directories. Nothing is touched on
    /// disk until the first write.
    #[must_use]
    pub fn new(census_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            census_dir: census_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Path of the raw census cache for `state`.
    #[must_use]
    pub fn cache_path(&self, state: &str) -> PathBuf {
        self.census_dir
            .join(format!("{}.json", state.to_ascii_lowercase()))
    }

    /// Path of the enriched snapshot for `state`.
    #[must_use]
    pub fn enriched_path(&self, state: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}-extra.json", state.to_ascii_lowercase()))
    }

    /// Replaces the census cache for `state`.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError`] if the file cannot be written.
    pub fn write_cache(&self, state: &str, cache: &CensusCache) -> Result<PathBuf, EnrichError> {
        let path = self.cache_path(state);
        write_json(&path, cache)?;
        Ok(path)
    }

    /// Reads the census cache for `state`, or `None` if no cache has been
    /// written for it yet.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError`] if the file exists but cannot be read or
    /// decoded.
    pub fn read_cache(&self, state: &str) -> Result<Option<CensusCache>, EnrichError> {
        let path = self.cache_path(state);
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(EnrichError::io(path, e)),
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Replaces the enriched snapshot for `state`.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError`] if the file cannot be written.
    pub fn write_enriched(
        &self,
        state: &str,
        snapshot: &StateSnapshot,
    ) -> Result<PathBuf, EnrichError> {
        let path = self.enriched_path(state);
        write_json(&path, snapshot)?;
        Ok(path)
    }
}

/// Serializes `value` next to `path` and renames it into place so a crash
/// never leaves a truncated snapshot behind.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), EnrichError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| EnrichError::io(parent, e))?;
    }

    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_vec(value)?;
    std::fs::write(&tmp, json).map_err(|e| EnrichError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| EnrichError::io(path, e))?;

    log::debug!("Wrote {}", path.display());
    Ok(())
}
