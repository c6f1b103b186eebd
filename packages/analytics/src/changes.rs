//! Year-over-year change detection over per-hex count tables.
//!
//! Compares a baseline window against a current window and flags hex ×
//! category pairs whose percentage change crosses a threshold. A minimum
//! baseline count guards against division-driven false positives: 2 → 5
//! incidents is a +150% "spike" no one should see on a map.

use std::collections::BTreeMap;

use mtl_crime_models::Category;
use mtl_crime_spatial::HexCounts;
use serde::Serialize;

/// Default significance threshold, in percent.
pub const DEFAULT_THRESHOLD_PCT: f64 = 20.0;

/// Default minimum baseline count for a pair to be considered.
pub const DEFAULT_MIN_BASELINE: u64 = 10;

/// Sparse table of significant year-over-year changes.
///
/// A hex appears only if at least one of its categories passed the filter;
/// within a hex, only passing categories appear.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChangeTable {
    /// Hex id → category → percentage delta.
    entries: BTreeMap<usize, BTreeMap<Category, f64>>,
}

impl ChangeTable {
    /// Number of hexes with at least one significant change.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no pair passed the filter.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Percentage delta for one hex/category pair, if it was flagged.
    #[must_use]
    pub fn get(&self, hex: usize, category: Category) -> Option<f64> {
        self.entries.get(&hex)?.get(&category).copied()
    }

    /// Flagged hexes with their per-category deltas, in hex-id order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &BTreeMap<Category, f64>)> {
        self.entries.iter().map(|(&hex, deltas)| (hex, deltas))
    }
}

/// Flags hex/category pairs whose count changed significantly year over
/// year.
///
/// For each pair present (nonzero) in both windows, the delta is
/// `(current / baseline - 1) * 100`. A pair is emitted only if
/// `|delta| >= threshold_pct` **and** `baseline >= min_baseline`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn detect_changes(
    baseline: &HexCounts,
    current: &HexCounts,
    threshold_pct: f64,
    min_baseline: u64,
) -> ChangeTable {
    let mut entries: BTreeMap<usize, BTreeMap<Category, f64>> = BTreeMap::new();

    for (hex, baseline_counts) in baseline.iter() {
        for (category, before) in baseline_counts.iter() {
            let after = current.count(hex, category);
            // Pairs absent from either window are not comparable.
            if before == 0 || after == 0 {
                continue;
            }

            let delta = (after as f64 / before as f64 - 1.0) * 100.0;
            if delta.abs() >= threshold_pct && before >= min_baseline {
                entries.entry(hex).or_default().insert(category, delta);
            }
        }
    }

    ChangeTable { entries }
}
