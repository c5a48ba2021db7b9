#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Election results storage in `DuckDB`.
//!
//! The enrichment pipeline only needs to know which states and counties
//! appear in the results, so the store keeps the imported results CSV as a
//! single `result` table and answers those two questions through
//! [`GeoKeyStore`].

use std::path::Path;

use duckdb::Connection;
use elections_census::{EnrichError, GeoKeyStore};
use elections_geography_models::GeographyKey;

/// Errors that can occur in the results store.
#[derive(Debug, thiserror::Error)]
pub enum ResultsError {
    /// `DuckDB` operation failed.
    #[error("DuckDB error: {0}")]
    Duckdb(#[from] duckdb::Error),

    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Handle to the results database.
pub struct ResultsStore {
    conn: Connection,
}

impl ResultsStore {
    /// Opens (or creates) the results database at `path` and ensures the
    /// schema exists.
    ///
    /// # Errors
    ///
    /// Returns [`ResultsError`] if the directory, connection, or schema
    /// cannot be created.
    pub fn open(path: &Path) -> Result<Self, ResultsError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    /// Opens a transient in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`ResultsError`] if the connection or schema cannot be
    /// created.
    pub fn open_in_memory() -> Result<Self, ResultsError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, ResultsError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS result (
                statepostal TEXT,
                fipscode TEXT
            );",
        )?;
        Ok(Self { conn })
    }

    /// The underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Replaces the `result` table with the contents of a results CSV.
    ///
    /// Every column is read as text so FIPS codes keep their leading
    /// zeros. The file must have `statepostal` and `fipscode` columns.
    /// Returns the number of rows imported.
    ///
    /// # Errors
    ///
    /// Returns [`ResultsError`] if the file cannot be read or lacks the
    /// required columns.
    pub fn import_csv(&self, csv_path: &Path) -> Result<u64, ResultsError> {
        let quoted = csv_path.display().to_string().replace('\'', "''");
        self.conn.execute_batch(&format!(
            "CREATE OR REPLACE TEMP TABLE result_import AS
             SELECT * FROM read_csv('{quoted}', header = true, all_varchar = true);"
        ))?;

        // Naming the key columns fails the bind if the file lacks them,
        // leaving the current `result` table untouched.
        let count: i64 = match self
            .conn
            .prepare("SELECT COUNT(*) FROM (SELECT statepostal, fipscode FROM result_import)")
            .and_then(|mut stmt| stmt.query_row([], |row| row.get(0)))
        {
            Ok(count) => count,
            Err(e) => {
                self.conn.execute_batch("DROP TABLE IF EXISTS result_import;")?;
                return Err(e.into());
            }
        };

        self.conn.execute_batch(
            "CREATE OR REPLACE TABLE result AS SELECT * FROM result_import;
             DROP TABLE result_import;",
        )?;

        log::info!("Imported {count} result rows from {}", csv_path.display());
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Adds one `(state, county)` row.
    ///
    /// # Errors
    ///
    /// Returns [`ResultsError`] if the insert fails.
    pub fn insert_key(&self, key: &GeographyKey) -> Result<(), ResultsError> {
        self.conn.execute(
            "INSERT INTO result (statepostal, fipscode) VALUES (?, ?)",
            duckdb::params![key.state, key.fipscode],
        )?;
        Ok(())
    }

    /// Distinct state codes present in the results, ascending.
    ///
    /// # Errors
    ///
    /// Returns [`ResultsError`] if the query fails.
    pub fn distinct_states(&self) -> Result<Vec<String>, ResultsError> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT statepostal FROM result
             WHERE statepostal IS NOT NULL AND statepostal <> ''
             ORDER BY statepostal",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Distinct non-null county FIPS codes for `state`, ascending.
    ///
    /// # Errors
    ///
    /// Returns [`ResultsError`] if the query fails.
    pub fn distinct_fips(&self, state: &str) -> Result<Vec<String>, ResultsError> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT fipscode FROM result
             WHERE statepostal = ? AND fipscode IS NOT NULL AND fipscode <> ''
             ORDER BY fipscode",
        )?;
        let rows = stmt.query_map([state], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

impl GeoKeyStore for ResultsStore {
    fn state_codes(&self) -> Result<Vec<String>, EnrichError> {
        self.distinct_states()
            .map_err(|e| EnrichError::KeyStore(Box::new(e)))
    }

    fn fips_codes(&self, state: &str) -> Result<Vec<String>, EnrichError> {
        self.distinct_fips(state)
            .map_err(|e| EnrichError::KeyStore(Box::new(e)))
    }
}
