//! Year-over-year comparison windows.
//!
//! The current window covers the last N months of data, anchored at a
//! month begin; the baseline window is the same span exactly one year
//! earlier. Only incidents passing the location sanity check participate,
//! since both windows feed the spatial change join.

use chrono::{Datelike, Months, NaiveDate};
use mtl_crime_models::IncidentTable;

/// Default width of the comparison window, in months.
pub const DEFAULT_WINDOW_MONTHS: u32 = 3;

/// Rolls `date` back to a month begin, `n` times.
///
/// A date mid-month first snaps to the 1st of its own month; a date
/// already on the 1st moves to the previous month's 1st. Applied `n`
/// times this anchors "the last N months" at a calendar month boundary.
#[must_use]
pub fn rollback_month_begins(date: NaiveDate, n: u32) -> NaiveDate {
    let mut current = date;
    for _ in 0..n {
        current = if current.day() == 1 {
            current - Months::new(1)
        } else {
            // Snapping mid-month to the 1st counts as one rollback.
            NaiveDate::from_ymd_opt(current.year(), current.month(), 1).unwrap_or(current)
        };
    }
    current
}

/// A pair of year-over-year comparison windows.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonWindows {
    /// The same span one year before `current`.
    pub baseline: IncidentTable,
    /// The last `months` months of data, through the latest date.
    pub current: IncidentTable,
}

/// Slices the table into current and baseline windows of `months` width.
///
/// Returns `None` if the table is empty. Both windows are restricted to
/// incidents with valid locations.
#[must_use]
pub fn comparison_windows(table: &IncidentTable, months: u32) -> Option<ComparisonWindows> {
    let located = table.with_valid_locations();
    let latest = located.latest_date()?;

    let start = rollback_month_begins(latest, months);
    let current = located.between(start, latest);

    let baseline_start = start - Months::new(12);
    let baseline_end = baseline_start + Months::new(months);
    let baseline = located.between(baseline_start, baseline_end);

    Some(ComparisonWindows { baseline, current })
}

#[cfg(test)]
mod tests {
    use mtl_crime_models::{Category, Incident, TimeOfDay};

    use super::*;

    fn incident(date: &str) -> Incident {
        Incident {
            category: Category::Mischief,
            date: date.parse().unwrap(),
            time_of_day: TimeOfDay::Day,
            precinct: 1,
            latitude: 45.5,
            longitude: -73.6,
        }
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn rollback_from_mid_month_snaps_first() {
        assert_eq!(rollback_month_begins(date("2024-03-15"), 3), date("2024-01-01"));
    }

    #[test]
    fn rollback_from_month_begin_steps_back() {
        assert_eq!(rollback_month_begins(date("2024-03-01"), 3), date("2023-12-01"));
    }

    #[test]
    fn windows_are_one_year_apart() {
        let table = IncidentTable::new(vec![
            incident("2023-01-15"), // baseline window
            incident("2023-02-20"), // baseline window
            incident("2023-06-01"), // in neither window
            incident("2024-01-10"), // current window
            incident("2024-03-15"), // current window (latest)
        ]);
        let windows = comparison_windows(&table, 3).unwrap();

        // Current: 2024-01-01 ..= 2024-03-15.
        assert_eq!(windows.current.len(), 2);
        assert_eq!(windows.current.earliest_date(), Some(date("2024-01-10")));

        // Baseline: 2023-01-01 ..= 2023-04-01.
        assert_eq!(windows.baseline.len(), 2);
        assert_eq!(windows.baseline.latest_date(), Some(date("2023-02-20")));
    }

    #[test]
    fn invalid_locations_excluded_from_windows() {
        let mut offshore = incident("2024-03-15");
        offshore.latitude = 0.0;
        let table = IncidentTable::new(vec![incident("2024-03-10"), offshore]);
        let windows = comparison_windows(&table, 3).unwrap();
        assert_eq!(windows.current.len(), 1);
    }

    #[test]
    fn empty_table_has_no_windows() {
        assert!(comparison_windows(&IncidentTable::default(), 3).is_none());
    }
}
