#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Temporal aggregation over the incident table.
//!
//! Category totals, per-day and per-period averages, calendar-bucket time
//! series, time-of-day splits, and year-over-year comparison windows. All
//! functions take the table explicitly; there is no ambient dataset.
//!
//! Maps keyed by [`Category`] use `BTreeMap` deliberately: `Category`'s
//! `Ord` follows the canonical display order, so iteration order matches
//! the published chart order everywhere.

pub mod changes;
pub mod resample;
pub mod windows;

use std::collections::{BTreeMap, BTreeSet};

use mtl_crime_models::{Category, CategoryCounts, IncidentTable};

use crate::resample::Period;

/// Rounds to one decimal place, matching the published artifact precision.
#[must_use]
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Total occurrences grouped by category.
#[must_use]
pub fn category_counts(table: &IncidentTable) -> CategoryCounts {
    let mut counts = CategoryCounts::zero();
    for incident in table {
        counts.incr(incident.category);
    }
    counts
}

/// Mean incidents per calendar day for each category.
///
/// The divisor is the number of *distinct* dates present in the data, not
/// the span length.
#[must_use]
pub fn daily_average(table: &IncidentTable) -> BTreeMap<Category, f64> {
    let days = table.iter().map(|i| i.date).collect::<BTreeSet<_>>().len();
    averages(category_counts(table), days)
}

/// Mean incidents per week or per month for each category.
///
/// The divisor is the number of calendar buckets spanned by the data
/// (contiguous from the first bucket to the last, empty buckets included),
/// which is what a fixed-width resample produces.
#[must_use]
pub fn period_average(table: &IncidentTable, period: Period) -> BTreeMap<Category, f64> {
    let buckets = match (table.earliest_date(), table.latest_date()) {
        (Some(first), Some(last)) => period.buckets_spanned(first, last),
        _ => 0,
    };
    averages(category_counts(table), buckets)
}

#[allow(clippy::cast_precision_loss)]
fn averages(counts: CategoryCounts, divisor: usize) -> BTreeMap<Category, f64> {
    counts
        .iter()
        .map(|(category, count)| {
            let avg = if divisor == 0 {
                0.0
            } else {
                round1(count as f64 / divisor as f64)
            };
            (category, avg)
        })
        .collect()
}

/// Percentage split across day/evening/night for each category.
///
/// Percentages are rounded to one decimal and sum to ~100 per category.
/// Categories with no incidents map to all zeros.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn time_of_day_distribution(table: &IncidentTable) -> BTreeMap<Category, [f64; 3]> {
    let mut raw: BTreeMap<Category, [u64; 3]> = Category::ALL
        .iter()
        .map(|&category| (category, [0; 3]))
        .collect();

    for incident in table {
        if let Some(buckets) = raw.get_mut(&incident.category) {
            buckets[incident.time_of_day.ordinal()] += 1;
        }
    }

    raw.into_iter()
        .map(|(category, buckets)| {
            let total: u64 = buckets.iter().sum();
            let percentages = if total == 0 {
                [0.0; 3]
            } else {
                buckets.map(|count| round1(count as f64 / total as f64 * 100.0))
            };
            (category, percentages)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use mtl_crime_models::{Incident, TimeOfDay};

    use super::*;

    fn incident(date: &str, category: Category, time_of_day: TimeOfDay) -> Incident {
        Incident {
            category,
            date: date.parse().unwrap(),
            time_of_day,
            precinct: 1,
            latitude: 45.5,
            longitude: -73.6,
        }
    }

    #[test]
    fn counts_group_by_category() {
        let table = IncidentTable::new(vec![
            incident("2024-01-01", Category::Mischief, TimeOfDay::Day),
            incident("2024-01-02", Category::Mischief, TimeOfDay::Day),
            incident("2024-01-03", Category::FatalCrime, TimeOfDay::Night),
        ]);
        let counts = category_counts(&table);
        assert_eq!(counts.get(Category::Mischief), 2);
        assert_eq!(counts.get(Category::FatalCrime), 1);
        assert_eq!(counts.get(Category::ArmedRobbery), 0);
    }

    #[test]
    fn daily_average_uses_distinct_days() {
        // 4 mischief incidents over 2 distinct days -> 2.0/day
        let table = IncidentTable::new(vec![
            incident("2024-01-01", Category::Mischief, TimeOfDay::Day),
            incident("2024-01-01", Category::Mischief, TimeOfDay::Day),
            incident("2024-01-02", Category::Mischief, TimeOfDay::Day),
            incident("2024-01-02", Category::Mischief, TimeOfDay::Day),
        ]);
        let avg = daily_average(&table);
        assert!((avg[&Category::Mischief] - 2.0).abs() < f64::EPSILON);
        assert!((avg[&Category::FatalCrime]).abs() < f64::EPSILON);
    }

    #[test]
    fn period_average_counts_empty_buckets_in_divisor() {
        // Jan and Mar have data, Feb is empty: 3 monthly buckets spanned.
        let table = IncidentTable::new(vec![
            incident("2024-01-10", Category::Mischief, TimeOfDay::Day),
            incident("2024-03-10", Category::Mischief, TimeOfDay::Day),
            incident("2024-03-11", Category::Mischief, TimeOfDay::Day),
        ]);
        let avg = period_average(&table, Period::Month);
        assert!((avg[&Category::Mischief] - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn distribution_percentages_sum_to_100() {
        let table = IncidentTable::new(vec![
            incident("2024-01-01", Category::Mischief, TimeOfDay::Day),
            incident("2024-01-02", Category::Mischief, TimeOfDay::Day),
            incident("2024-01-03", Category::Mischief, TimeOfDay::Evening),
            incident("2024-01-04", Category::Mischief, TimeOfDay::Night),
        ]);
        let dist = time_of_day_distribution(&table);
        let split = dist[&Category::Mischief];
        assert!((split[0] - 50.0).abs() < f64::EPSILON);
        assert!((split[1] - 25.0).abs() < f64::EPSILON);
        assert!((split[2] - 25.0).abs() < f64::EPSILON);
        assert!((split.iter().sum::<f64>() - 100.0).abs() < 0.2);
        // Empty category degrades to zeros, not NaN.
        assert_eq!(dist[&Category::FatalCrime], [0.0; 3]);
    }

    #[test]
    fn category_maps_iterate_in_canonical_order() {
        let table = IncidentTable::new(vec![incident(
            "2024-01-01",
            Category::Mischief,
            TimeOfDay::Day,
        )]);
        let keys: Vec<Category> = daily_average(&table).into_keys().collect();
        assert_eq!(keys.as_slice(), Category::ALL);
    }
}
