#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial index for the hexagonal aggregation grid.
//!
//! Loads the static hex grid from a `GeoJSON` asset, builds an R-tree over
//! the cell bounding boxes, and joins incident points to cells with an
//! envelope pre-filter followed by an exact point-in-polygon test. The grid
//! is read-only after load; hex identity is the feature ordinal in the
//! asset, stringified in all published outputs.
//!
//! Points that fall outside every hex are dropped from the join. That is a
//! documented non-error: the grid covers the island, not the whole data
//! extent.

use std::collections::BTreeMap;
use std::path::Path;

use geo::{BoundingRect, Contains, MultiPolygon, Point};
use geojson::GeoJson;
use mtl_crime_models::{Category, CategoryCounts, Incident, IncidentTable};
use rstar::{AABB, RTree, RTreeObject};
use thiserror::Error;

/// Errors that can occur while loading the grid asset.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// Failed to read the asset file.
    #[error("I/O error reading grid asset: {0}")]
    Io(#[from] std::io::Error),

    /// Asset is not valid `GeoJSON`.
    #[error("GeoJSON error: {0}")]
    Geojson(#[from] geojson::Error),

    /// Asset parsed but is not a `FeatureCollection`.
    #[error("Grid asset is not a GeoJSON FeatureCollection")]
    NotAFeatureCollection,

    /// A feature is missing a usable polygon geometry.
    #[error("Grid feature {index} has no polygon geometry")]
    InvalidGeometry {
        /// Ordinal of the offending feature.
        index: usize,
    },

    /// The asset contained no features.
    #[error("Grid asset contained no hex cells")]
    Empty,
}

/// One hexagonal grid cell from the static asset.
#[derive(Debug, Clone)]
pub struct HexCell {
    /// Feature ordinal in the asset; the stable hex identity.
    pub id: usize,
    /// Resident population (`POP` attribute).
    pub population: f64,
    /// Cell polygon (WGS84).
    pub polygon: MultiPolygon<f64>,
}

/// An R-tree entry holding a cell's bounding box and its ordinal.
#[derive(Debug)]
struct HexEntry {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for HexEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// The static hexagonal grid with its spatial index.
///
/// Constructed once per run and never mutated afterwards.
#[derive(Debug)]
pub struct HexGrid {
    cells: Vec<HexCell>,
    index: RTree<HexEntry>,
}

impl HexGrid {
    /// Loads the grid from a `GeoJSON` file and builds the R-tree index.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError`] if the file cannot be read or parsed, a
    /// feature has no polygon geometry, or the collection is empty.
    pub fn load(path: &Path) -> Result<Self, SpatialError> {
        let text = std::fs::read_to_string(path)?;
        let grid = Self::from_geojson(&text)?;
        log::info!(
            "Loaded {} hex cells into spatial index from {}",
            grid.len(),
            path.display()
        );
        Ok(grid)
    }

    /// Parses the grid from `GeoJSON` text.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError`] on parse failures, non-polygon geometry, or
    /// an empty collection.
    pub fn from_geojson(text: &str) -> Result<Self, SpatialError> {
        let GeoJson::FeatureCollection(collection) = text.parse::<GeoJson>()? else {
            return Err(SpatialError::NotAFeatureCollection);
        };

        let mut cells = Vec::with_capacity(collection.features.len());

        for (index, feature) in collection.features.into_iter().enumerate() {
            let polygon = feature
                .geometry
                .and_then(to_multipolygon)
                .ok_or(SpatialError::InvalidGeometry { index })?;

            let population = feature
                .properties
                .as_ref()
                .and_then(|props| props.get("POP"))
                .and_then(serde_json::Value::as_f64)
                .unwrap_or(0.0);

            cells.push(HexCell {
                id: index,
                population,
                polygon,
            });
        }

        if cells.is_empty() {
            return Err(SpatialError::Empty);
        }

        let entries = cells
            .iter()
            .map(|cell| HexEntry {
                index: cell.id,
                envelope: compute_envelope(&cell.polygon),
            })
            .collect();

        Ok(Self {
            cells,
            index: RTree::bulk_load(entries),
        })
    }

    /// Number of cells in the grid.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the grid has no cells.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// All cells in ordinal order.
    #[must_use]
    pub fn cells(&self) -> &[HexCell] {
        &self.cells
    }

    /// Finds the hex containing a point, if any.
    ///
    /// Hexes tile without overlap, so the first envelope candidate that
    /// actually contains the point wins.
    #[must_use]
    pub fn locate(&self, lng: f64, lat: f64) -> Option<usize> {
        let point = Point::new(lng, lat);
        let query_env = AABB::from_point([lng, lat]);

        for entry in self.index.locate_in_envelope_intersecting(&query_env) {
            if self.cells[entry.index].polygon.contains(&point) {
                return Some(entry.index);
            }
        }
        None
    }
}

/// Builds point geometries from incident coordinates.
///
/// Records failing the bounding-box sanity check are filtered out here and
/// never participate in spatial operations.
pub fn to_points(table: &IncidentTable) -> impl Iterator<Item = (&Incident, Point<f64>)> {
    table
        .iter()
        .filter(|incident| incident.has_valid_location())
        .map(|incident| (incident, Point::new(incident.longitude, incident.latitude)))
}

/// Joins incident points to the grid, counting per hex and per category.
///
/// Returns a sparse table: only hexes that matched at least one point
/// appear. Points outside every hex boundary are dropped (logged at debug
/// level, not an error). Use [`HexCounts::complete`] to zero-fill the rest
/// of the grid.
#[must_use]
pub fn join_to_grid(table: &IncidentTable, grid: &HexGrid) -> BTreeMap<usize, CategoryCounts> {
    let mut sparse: BTreeMap<usize, CategoryCounts> = BTreeMap::new();
    let mut matched: u64 = 0;
    let mut dropped: u64 = 0;

    for (incident, point) in to_points(table) {
        match grid.locate(point.x(), point.y()) {
            Some(hex) => {
                sparse.entry(hex).or_default().incr(incident.category);
                matched += 1;
            }
            None => dropped += 1,
        }
    }

    log::debug!("Spatial join: {matched} points matched, {dropped} outside the grid");

    sparse
}

/// Complete per-hex per-category count table.
///
/// Holds exactly one row per grid cell, in hex-id order, with zeros where
/// the join produced nothing. Downstream legend min/max computation depends
/// on this full coverage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexCounts {
    rows: Vec<CategoryCounts>,
}

impl HexCounts {
    /// Expands a sparse join result to full grid coverage.
    #[must_use]
    pub fn complete(sparse: &BTreeMap<usize, CategoryCounts>, grid: &HexGrid) -> Self {
        let rows = (0..grid.len())
            .map(|hex| sparse.get(&hex).copied().unwrap_or_default())
            .collect();
        Self { rows }
    }

    /// Number of rows (always the grid cardinality).
    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Count vector for one hex.
    #[must_use]
    pub fn get(&self, hex: usize) -> CategoryCounts {
        self.rows.get(hex).copied().unwrap_or_default()
    }

    /// Count for one hex/category pair.
    #[must_use]
    pub fn count(&self, hex: usize, category: Category) -> u64 {
        self.get(hex).get(category)
    }

    /// `(hex id, counts)` rows in hex-id order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, CategoryCounts)> + '_ {
        self.rows.iter().copied().enumerate()
    }
}

/// Converts a `GeoJSON` geometry to a [`MultiPolygon`], accepting both
/// `Polygon` and `MultiPolygon` types.
fn to_multipolygon(geometry: geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

/// Bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}
