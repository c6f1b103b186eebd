//! Chart and supporting-data bundles for the dashboard.
//!
//! All three bundles emit categories in the canonical display order, in
//! both languages. The serialized field names are the contract the chart
//! rendering on the other side of the boundary binds to; do not rename
//! them casually.

use std::collections::BTreeMap;

use mtl_crime_analytics::resample::{Period, time_series};
use mtl_crime_analytics::{period_average, time_of_day_distribution};
use mtl_crime_models::{Category, IncidentTable, Lang, TimeOfDay};
use serde::Serialize;

use crate::{HexRecord, LegendRange, locale, means_per_hex};

/// One line-chart series: monthly counts plus weekly/monthly averages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineGraph {
    /// Localized category label.
    pub title: String,
    /// Counts aligned with the bundle's date labels.
    pub data: Vec<u64>,
    /// Mean incidents per week over the whole dataset.
    #[serde(rename = "averageWeek")]
    pub average_week: f64,
    /// Mean incidents per month over the whole dataset.
    #[serde(rename = "averageMonth")]
    pub average_month: f64,
}

/// Line-chart bundle: one graph per category over a shared date axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineChartBundle {
    /// Ordered `%Y-%m-%d` bucket labels.
    pub labels: Vec<String>,
    /// Per-category graphs in canonical display order.
    pub graphs: Vec<LineGraph>,
}

/// Builds the line-chart bundle from monthly resampled counts.
///
/// The monthly series excludes the trailing partial month; the embedded
/// averages are computed over the full dataset.
#[must_use]
pub fn line_chart_bundle(table: &IncidentTable, lang: Lang) -> LineChartBundle {
    let series = time_series(table, Period::Month);
    let week_averages = period_average(table, Period::Week);
    let month_averages = period_average(table, Period::Month);

    let graphs = Category::ALL
        .iter()
        .map(|&category| LineGraph {
            title: category.label(lang).to_string(),
            data: series.counts.get(&category).cloned().unwrap_or_default(),
            average_week: week_averages.get(&category).copied().unwrap_or(0.0),
            average_month: month_averages.get(&category).copied().unwrap_or(0.0),
        })
        .collect();

    LineChartBundle {
        labels: series.labels,
        graphs,
    }
}

/// One pie-chart series: a category's split across the three time-of-day
/// buckets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieGraph {
    /// Localized category label.
    pub title: String,
    /// Percentages for day, evening, night.
    pub data: [f64; 3],
}

/// Pie-chart bundle: time-of-day split per category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieChartBundle {
    /// Localized bucket names, always day/evening/night order.
    pub labels: Vec<String>,
    /// Per-category graphs in canonical display order.
    pub graphs: Vec<PieGraph>,
}

/// Builds the pie-chart bundle.
#[must_use]
pub fn pie_chart_bundle(table: &IncidentTable, lang: Lang) -> PieChartBundle {
    let distribution = time_of_day_distribution(table);

    PieChartBundle {
        labels: TimeOfDay::ALL
            .iter()
            .map(|bucket| bucket.label(lang).to_string())
            .collect(),
        graphs: Category::ALL
            .iter()
            .map(|&category| PieGraph {
                title: category.label(lang).to_string(),
                data: distribution.get(&category).copied().unwrap_or([0.0; 3]),
            })
            .collect(),
    }
}

/// The supporting-data bundle backing the map legend and summary panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupportingData {
    /// Localized category labels in canonical display order.
    pub crime_categories: Vec<String>,
    /// Localized label → mean count per hex.
    pub mean_per_hex: BTreeMap<String, f64>,
    /// Legend maximum.
    pub max: u64,
    /// Legend minimum (over nonzero cells).
    pub min: u64,
    /// Human-readable, localized date of the latest incident.
    pub latest_date: String,
}

/// Builds the supporting-data bundle.
#[must_use]
pub fn supporting_data(
    table: &IncidentTable,
    records: &[HexRecord],
    legend: LegendRange,
    lang: Lang,
) -> SupportingData {
    let mean_per_hex = means_per_hex(records)
        .into_iter()
        .map(|(category, mean)| (category.label(lang).to_string(), mean))
        .collect();

    SupportingData {
        crime_categories: Category::ALL
            .iter()
            .map(|category| category.label(lang).to_string())
            .collect(),
        mean_per_hex,
        max: legend.max,
        min: legend.min,
        latest_date: table
            .latest_date()
            .map_or_else(String::new, |date| locale::localized_date(date, lang)),
    }
}
