//! Flat-file join sources.
//!
//! The prior-election and unemployment files are read once per run and
//! indexed by their join keys. Cell values stay as the raw strings from the
//! file; they are only parsed when a county is merged, so one bad cell
//! blanks one county's field instead of failing the whole load. A row that
//! cannot be decoded at all is skipped with a warning for the same reason.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use crate::EnrichError;

/// Column holding the five-digit county FIPS code in the margin file.
pub const MARGIN_FIPS_COLUMN: &str = "fipscode";
/// Column holding the candidate's last name in the margin file.
pub const MARGIN_LAST_NAME_COLUMN: &str = "last";
/// Column holding the candidate's vote share (`0.0..=1.0`) in the margin file.
pub const MARGIN_VOTE_PCT_COLUMN: &str = "votepct";

/// Column holding the two-digit state FIPS code in the unemployment file.
pub const UNEMPLOYMENT_STATE_COLUMN: &str = "State FIPS Code";
/// Column holding the three-digit county FIPS code in the unemployment file.
pub const UNEMPLOYMENT_COUNTY_COLUMN: &str = "County FIPS Code";
/// Column holding the unemployment rate in percent.
pub const UNEMPLOYMENT_RATE_COLUMN: &str = "Unemployment Rate (%)";

/// Prior-election vote shares by county and candidate.
#[derive(Debug, Clone, Default)]
pub struct MarginTable {
    /// County FIPS code to `(last name, vote share)` rows in file order.
    rows: BTreeMap<String, Vec<(String, String)>>,
}

impl MarginTable {
    /// Loads the margin file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError`] if the file cannot be opened, is not valid
    /// CSV, or lacks a required column.
    pub fn from_path(path: &Path) -> Result<Self, EnrichError> {
        let file = std::fs::File::open(path).map_err(|e| EnrichError::io(path, e))?;
        let table = Self::from_reader(file, &path.display().to_string())?;
        log::info!(
            "Loaded prior-election rows for {} counties from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Loads margin rows from any CSV reader. `label` names the source in
    /// errors.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError`] if the header row is unreadable, a required
    /// column is missing, or the reader fails.
    pub fn from_reader<R: Read>(reader: R, label: &str) -> Result<Self, EnrichError> {
        let mut reader = csv_reader(reader);
        let headers = reader.headers()?.clone();
        let fips_idx = column_index(&headers, MARGIN_FIPS_COLUMN, label)?;
        let last_idx = column_index(&headers, MARGIN_LAST_NAME_COLUMN, label)?;
        let pct_idx = column_index(&headers, MARGIN_VOTE_PCT_COLUMN, label)?;

        let mut rows: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
        for record in reader.records() {
            let Some(record) = readable_row(record, label)? else {
                continue;
            };
            let fipscode = cell(&record, fips_idx);
            if fipscode.is_empty() {
                continue;
            }
            rows.entry(fipscode.to_string()).or_default().push((
                cell(&record, last_idx).to_string(),
                cell(&record, pct_idx).to_string(),
            ));
        }

        Ok(Self { rows })
    }

    /// The raw vote share of the first row for `last_name` in `fipscode`.
    #[must_use]
    pub fn vote_pct(&self, fipscode: &str, last_name: &str) -> Option<&str> {
        self.rows
            .get(fipscode)?
            .iter()
            .find(|(last, _)| last == last_name)
            .map(|(_, pct)| pct.as_str())
    }

    /// Number of distinct counties in the file.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the file had no county rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// County unemployment rates keyed by `(state FIPS, county FIPS)`.
#[derive(Debug, Clone, Default)]
pub struct UnemploymentTable {
    rates: BTreeMap<(String, String), String>,
}

impl UnemploymentTable {
    /// Loads the unemployment file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError`] if the file cannot be opened, is not valid
    /// CSV, or lacks a required column.
    pub fn from_path(path: &Path) -> Result<Self, EnrichError> {
        let file = std::fs::File::open(path).map_err(|e| EnrichError::io(path, e))?;
        let table = Self::from_reader(file, &path.display().to_string())?;
        log::info!(
            "Loaded unemployment rates for {} counties from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Loads unemployment rows from any CSV reader. `label` names the
    /// source in errors.
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError`] if the header row is unreadable, a required
    /// column is missing, or the reader fails.
    pub fn from_reader<R: Read>(reader: R, label: &str) -> Result<Self, EnrichError> {
        let mut reader = csv_reader(reader);
        let headers = reader.headers()?.clone();
        let state_idx = column_index(&headers, UNEMPLOYMENT_STATE_COLUMN, label)?;
        let county_idx = column_index(&headers, UNEMPLOYMENT_COUNTY_COLUMN, label)?;
        let rate_idx = column_index(&headers, UNEMPLOYMENT_RATE_COLUMN, label)?;

        let mut rates = BTreeMap::new();
        for record in reader.records() {
            let Some(record) = readable_row(record, label)? else {
                continue;
            };
            let key = (
                cell(&record, state_idx).to_string(),
                cell(&record, county_idx).to_string(),
            );
            // Raw, untrimmed: the rate column is padded in the BLS export.
            let rate = record.get(rate_idx).unwrap_or_default().to_string();
            rates.entry(key).or_insert(rate);
        }

        Ok(Self { rates })
    }

    /// The raw rate string for a county.
    #[must_use]
    pub fn rate(&self, state_fips: &str, county_fips: &str) -> Option<&str> {
        self.rates
            .get(&(state_fips.to_string(), county_fips.to_string()))
            .map(String::as_str)
    }

    /// Number of counties in the file.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// Whether the file had no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader)
}

fn column_index(
    headers: &csv::StringRecord,
    column: &str,
    label: &str,
) -> Result<usize, EnrichError> {
    headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| EnrichError::MissingColumn {
            file: label.to_string(),
            column: column.to_string(),
        })
}

/// Passes a decoded row through. Undecodable rows (invalid UTF-8 and the
/// like) become `None`; only reader I/O failures are fatal.
fn readable_row(
    record: Result<csv::StringRecord, csv::Error>,
    label: &str,
) -> Result<Option<csv::StringRecord>, EnrichError> {
    match record {
        Ok(record) => Ok(Some(record)),
        Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => Err(e.into()),
        Err(e) => {
            let line = e
                .position()
                .map_or_else(String::new, |p| format!(" line {}", p.line()));
            log::warn!("Skipping unreadable row in {label}{line}: {e}");
            Ok(None)
        }
    }
}

fn cell(record: &csv::StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or_default().trim()
}
