#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dataset loader for the SPVM citizen-intervention CSV.
//!
//! Fetches the raw CSV from the open-data portal, decodes its Latin-1
//! payload, parses the typed incident table, and sorts it ascending by
//! date. Fetch and parse failures are fatal for the run — the pipeline
//! never publishes artifacts derived from a partial dataset.

pub mod fetch;
pub mod parse;

use mtl_crime_models::IncidentTable;
use thiserror::Error;

/// Default delimiter used by the portal CSV.
pub const DEFAULT_DELIMITER: u8 = b',';

/// Errors that can occur while loading the source dataset.
#[derive(Debug, Error)]
pub enum SourceError {
    /// HTTP transport failure after all retries.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned a non-success status after all retries.
    #[error("HTTP status {status} fetching {url}")]
    Status {
        /// Response status code.
        status: reqwest::StatusCode,
        /// Request URL.
        url: String,
    },

    /// CSV reader failure (malformed quoting, uneven rows, etc.).
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is absent from the CSV header.
    #[error("Missing required column: {name}")]
    MissingColumn {
        /// Header name that was not found.
        name: String,
    },

    /// The CSV parsed but produced no usable incident rows.
    #[error("Source dataset contained no parseable incident rows")]
    Empty,
}

/// Fetches, decodes, and parses the source CSV into a sorted incident table.
///
/// # Errors
///
/// Returns [`SourceError`] if the download fails after retries, a required
/// column is missing, or no rows parse.
pub async fn load(url: &str, delimiter: u8) -> Result<IncidentTable, SourceError> {
    let bytes = fetch::fetch_csv(url).await?;
    log::info!("Fetched {} bytes from {url}", bytes.len());

    let text = parse::decode_latin1(&bytes);
    let table = parse::parse_table(&text, delimiter)?;

    log::info!(
        "Loaded {} incidents ({} .. {})",
        table.len(),
        table
            .earliest_date()
            .map_or_else(String::new, |d| d.to_string()),
        table
            .latest_date()
            .map_or_else(String::new, |d| d.to_string()),
    );

    Ok(table)
}
