#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Artifact generation for the static dashboard and the tile host.
//!
//! Merges aggregate counts onto the hex grid geometry, serializes the
//! result to `GeoJSON` (one file per language), and packages the chart and
//! supporting-data bundles as script-embeddable `var NAME = {...};`
//! assignments. The grid itself is never mutated; every export derives new
//! records, so repeated calls within one run are idempotent.

pub mod charts;
pub mod locale;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use geo::MultiPolygon;
use geojson::feature::Id;
use geojson::{Feature, FeatureCollection};
use mtl_crime_models::{Category, CategoryCounts, Lang};
use mtl_crime_spatial::{HexCounts, HexGrid};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while writing artifacts.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Filesystem failure writing an artifact.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One hex with its geometry and joined aggregate counts, ready to export.
#[derive(Debug, Clone, PartialEq)]
pub struct HexRecord {
    /// Stringified hex ordinal, the published cell identity.
    pub id: String,
    /// Cell polygon, copied from the grid (the grid stays untouched).
    pub geometry: MultiPolygon<f64>,
    /// Per-category counts for this hex.
    pub counts: CategoryCounts,
}

/// Left-joins aggregate counts onto the grid geometry.
///
/// Grid cardinality is the source of truth: every cell produces a record,
/// and a cell with no aggregate row gets all-zero counts.
#[must_use]
pub fn merge(grid: &HexGrid, counts: &HexCounts) -> Vec<HexRecord> {
    grid.cells()
        .iter()
        .map(|cell| HexRecord {
            id: cell.id.to_string(),
            geometry: cell.polygon.clone(),
            counts: counts.get(cell.id),
        })
        .collect()
}

/// Serializes export records to a `GeoJSON` `FeatureCollection`.
///
/// One feature per hex, keyed by the hex id, with one localized
/// category-label property per category count.
#[must_use]
pub fn to_geojson(records: &[HexRecord], lang: Lang) -> FeatureCollection {
    let features = records
        .iter()
        .map(|record| {
            let mut properties = serde_json::Map::new();
            for (category, count) in record.counts.iter() {
                properties.insert(category.label(lang).to_string(), count.into());
            }

            Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::from(
                    &record.geometry,
                ))),
                id: Some(Id::String(record.id.clone())),
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// The `{min, max}` pair that scales the choropleth color legend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LegendRange {
    /// Largest count over all hex/category cells.
    pub max: u64,
    /// Smallest *nonzero* count.
    pub min: u64,
}

/// Computes the legend range over every hex/category cell.
///
/// Zero cells are excluded from the minimum: most hexes are near-empty,
/// and a legend floor of 0 would wash out the color scale. An all-zero
/// table degrades to `{max: 0, min: 0}`.
#[must_use]
pub fn legend_range(counts: &HexCounts) -> LegendRange {
    let mut max = 0;
    let mut min: Option<u64> = None;

    for (_, row) in counts.iter() {
        for (_, count) in row.iter() {
            max = max.max(count);
            if count > 0 {
                min = Some(min.map_or(count, |m| m.min(count)));
            }
        }
    }

    LegendRange {
        max,
        min: min.unwrap_or(0),
    }
}

/// Mean count per hex for each category, rounded to one decimal.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn means_per_hex(records: &[HexRecord]) -> BTreeMap<Category, f64> {
    let hexes = records.len();
    let mut totals: BTreeMap<Category, u64> = BTreeMap::new();

    for record in records {
        for (category, count) in record.counts.iter() {
            *totals.entry(category).or_default() += count;
        }
    }

    Category::ALL
        .iter()
        .map(|&category| {
            let total = totals.get(&category).copied().unwrap_or(0);
            let mean = if hexes == 0 {
                0.0
            } else {
                mtl_crime_analytics::round1(total as f64 / hexes as f64)
            };
            (category, mean)
        })
        .collect()
}

/// Writes the per-language `GeoJSON` artifact and returns its path.
///
/// # Errors
///
/// Returns [`ExportError`] on filesystem or serialization failure.
pub fn write_geojson(
    output_dir: &Path,
    lang: Lang,
    collection: &FeatureCollection,
) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(format!("hexes_crime_{}.geojson", lang.code()));
    std::fs::write(&path, serde_json::to_string(collection)?)?;
    log::info!("Wrote {}", path.display());
    Ok(path)
}

/// Renders a value as a named script-variable assignment.
///
/// The dashboard loads these as plain `<script>` files, so each bundle is
/// a `var NAME = {...};` line. Serialization keeps non-ASCII intact — the
/// French labels must not be escaped into unreadability.
///
/// # Errors
///
/// Returns [`ExportError::Json`] if the value fails to serialize.
pub fn script_assignment<T: Serialize>(name: &str, value: &T) -> Result<String, ExportError> {
    Ok(format!("var {name} = {};", serde_json::to_string(value)?))
}

/// Writes the chart bundle script for one language and returns its path.
///
/// # Errors
///
/// Returns [`ExportError`] on filesystem or serialization failure.
pub fn write_chart_scripts(
    output_dir: &Path,
    lang: Lang,
    line: &charts::LineChartBundle,
    pie: &charts::PieChartBundle,
) -> Result<PathBuf, ExportError> {
    let dir = output_dir.join("static").join(lang.code()).join("js");
    std::fs::create_dir_all(&dir)?;

    let path = dir.join("crime_charts.js");
    let contents = format!(
        "{}\n{}\n",
        script_assignment("lineCharts", line)?,
        script_assignment("pieCharts", pie)?,
    );
    std::fs::write(&path, contents)?;
    log::info!("Wrote {}", path.display());
    Ok(path)
}

/// Writes the supporting-data script for one language and returns its path.
///
/// # Errors
///
/// Returns [`ExportError`] on filesystem or serialization failure.
pub fn write_supporting_data(
    output_dir: &Path,
    lang: Lang,
    data: &charts::SupportingData,
) -> Result<PathBuf, ExportError> {
    let dir = output_dir.join("static").join(lang.code()).join("js");
    std::fs::create_dir_all(&dir)?;

    let path = dir.join("supporting_data.js");
    std::fs::write(&path, format!("{}\n", script_assignment("supportingData", data)?))?;
    log::info!("Wrote {}", path.display());
    Ok(path)
}
