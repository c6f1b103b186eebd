//! Calendar-bucket resampler.
//!
//! Buckets are fixed calendar periods, never rolling windows: weeks end on
//! Sunday, months end on the last calendar day. A bucket is labelled by the
//! `%Y-%m-%d` date of its end, matching the axis labels the charts expect.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate};
use mtl_crime_models::{Category, IncidentTable};
use thiserror::Error;

/// Error for period tokens outside the two recognized values.
///
/// String inputs (CLI flags, config) must resolve through
/// [`Period::from_str`], which fails fast here instead of silently
/// defaulting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid resampling period {token:?}: expected \"week\" or \"month\"")]
pub struct InvalidPeriodError {
    /// The rejected token.
    pub token: String,
}

/// Resampling period for time-bucketed aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    /// Calendar weeks ending on Sunday.
    Week,
    /// Calendar months.
    Month,
}

impl FromStr for Period {
    type Err = InvalidPeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "week" | "w" => Ok(Self::Week),
            "month" | "m" => Ok(Self::Month),
            _ => Err(InvalidPeriodError {
                token: s.to_string(),
            }),
        }
    }
}

impl Period {
    /// End date of the bucket containing `date`.
    #[must_use]
    pub fn bucket_end(self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Week => week_ending(date),
            Self::Month => month_ending(date),
        }
    }

    /// End date of the bucket after the one ending at `end`.
    #[must_use]
    pub fn next_bucket(self, end: NaiveDate) -> NaiveDate {
        match self {
            Self::Week => end + Days::new(7),
            Self::Month => month_ending(end + Days::new(1)),
        }
    }

    /// Number of contiguous buckets spanned by `first..=last`, empty
    /// buckets included.
    #[must_use]
    pub fn buckets_spanned(self, first: NaiveDate, last: NaiveDate) -> usize {
        if last < first {
            return 0;
        }
        let (start, end) = (self.bucket_end(first), self.bucket_end(last));
        match self {
            Self::Week => usize::try_from((end - start).num_days() / 7 + 1).unwrap_or(0),
            Self::Month => {
                let months = (i64::from(end.year()) * 12 + i64::from(end.month0()))
                    - (i64::from(start.year()) * 12 + i64::from(start.month0()));
                usize::try_from(months + 1).unwrap_or(0)
            }
        }
    }
}

/// The Sunday on or after `date`.
#[must_use]
pub fn week_ending(date: NaiveDate) -> NaiveDate {
    let days_until_sunday = (7 - date.weekday().num_days_from_sunday()) % 7;
    date + Days::new(u64::from(days_until_sunday))
}

/// The last calendar day of `date`'s month.
#[must_use]
pub fn month_ending(date: NaiveDate) -> NaiveDate {
    first_of_month(date) + Months::new(1) - Days::new(1)
}

/// The first calendar day of `date`'s month.
#[must_use]
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

/// Resampled time series: ordered bucket labels plus one aligned count
/// sequence per category, in canonical category order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSeries {
    /// `%Y-%m-%d` bucket-end labels, ascending.
    pub labels: Vec<String>,
    /// Per-category counts aligned with `labels`; gaps are zero-filled.
    pub counts: BTreeMap<Category, Vec<u64>>,
}

impl TimeSeries {
    fn empty() -> Self {
        Self {
            labels: Vec::new(),
            counts: Category::ALL
                .iter()
                .map(|&category| (category, Vec::new()))
                .collect(),
        }
    }
}

/// Resamples incidents into fixed calendar buckets.
///
/// Buckets run contiguously from the first populated bucket to the last;
/// a bucket with no incidents for a category reports 0. For
/// [`Period::Month`], the series is truncated to the most recent
/// *completed* month: a trailing partial month must never show up in
/// month-over-month comparisons, so if the latest date is not a month-end
/// that whole month is dropped.
#[must_use]
pub fn time_series(table: &IncidentTable, period: Period) -> TimeSeries {
    let (Some(first), Some(latest)) = (table.earliest_date(), table.latest_date()) else {
        return TimeSeries::empty();
    };

    let cutoff = match period {
        Period::Week => latest,
        Period::Month => {
            if latest == month_ending(latest) {
                latest
            } else {
                // Drop the partial trailing month.
                first_of_month(latest) - Days::new(1)
            }
        }
    };

    if cutoff < first {
        return TimeSeries::empty();
    }

    // Contiguous bucket axis with an index per bucket end.
    let mut bucket_index: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    let last_bucket = period.bucket_end(cutoff);
    let mut bucket = period.bucket_end(first);
    while bucket <= last_bucket {
        bucket_index.insert(bucket, bucket_index.len());
        bucket = period.next_bucket(bucket);
    }

    let mut counts: BTreeMap<Category, Vec<u64>> = Category::ALL
        .iter()
        .map(|&category| (category, vec![0; bucket_index.len()]))
        .collect();

    for incident in table {
        if incident.date > cutoff {
            continue;
        }
        let index = bucket_index[&period.bucket_end(incident.date)];
        if let Some(row) = counts.get_mut(&incident.category) {
            row[index] += 1;
        }
    }

    TimeSeries {
        labels: bucket_index
            .keys()
            .map(|date| date.format("%Y-%m-%d").to_string())
            .collect(),
        counts,
    }
}

#[cfg(test)]
mod tests {
    use mtl_crime_models::{Incident, TimeOfDay};

    use super::*;

    fn incident(date: &str, category: Category) -> Incident {
        Incident {
            category,
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
    fn period_parses_recognized_tokens_only() {
        assert_eq!("week".parse::<Period>().unwrap(), Period::Week);
        assert_eq!("W".parse::<Period>().unwrap(), Period::Week);
        assert_eq!("Month".parse::<Period>().unwrap(), Period::Month);
        assert_eq!("m".parse::<Period>().unwrap(), Period::Month);
        assert!("day".parse::<Period>().is_err());
        assert!("quarter".parse::<Period>().is_err());
        assert!("".parse::<Period>().is_err());
    }

    #[test]
    fn week_ends_on_sunday() {
        // 2024-03-11 is a Monday; its week ends Sunday 2024-03-17.
        assert_eq!(week_ending(date("2024-03-11")), date("2024-03-17"));
        // A Sunday is its own week end.
        assert_eq!(week_ending(date("2024-03-17")), date("2024-03-17"));
    }

    #[test]
    fn month_ending_handles_leap_february() {
        assert_eq!(month_ending(date("2024-02-10")), date("2024-02-29"));
        assert_eq!(month_ending(date("2023-02-10")), date("2023-02-28"));
        assert_eq!(month_ending(date("2024-12-31")), date("2024-12-31"));
    }

    #[test]
    fn buckets_spanned_includes_empty_buckets() {
        assert_eq!(
            Period::Month.buckets_spanned(date("2023-11-15"), date("2024-02-10")),
            4
        );
        assert_eq!(
            Period::Week.buckets_spanned(date("2024-03-11"), date("2024-03-18")),
            2
        );
        assert_eq!(
            Period::Week.buckets_spanned(date("2024-03-11"), date("2024-03-11")),
            1
        );
    }

    #[test]
    fn monthly_series_truncates_partial_trailing_month() {
        // Data through mid-March: January and February are complete
        // buckets, March must be dropped entirely.
        let table = IncidentTable::new(vec![
            incident("2024-01-05", Category::Mischief),
            incident("2024-02-10", Category::Mischief),
            incident("2024-03-15", Category::Mischief),
        ]);
        let series = time_series(&table, Period::Month);
        assert_eq!(series.labels, vec!["2024-01-31", "2024-02-29"]);
        assert_eq!(series.counts[&Category::Mischief], vec![1, 1]);
    }

    #[test]
    fn monthly_series_keeps_complete_trailing_month() {
        let table = IncidentTable::new(vec![
            incident("2024-01-05", Category::Mischief),
            incident("2024-02-29", Category::Mischief),
        ]);
        let series = time_series(&table, Period::Month);
        assert_eq!(series.labels, vec!["2024-01-31", "2024-02-29"]);
    }

    #[test]
    fn gaps_are_zero_filled_for_every_category() {
        // No February data: the bucket still appears with zeros.
        let table = IncidentTable::new(vec![
            incident("2024-01-05", Category::Mischief),
            incident("2024-03-31", Category::ArmedRobbery),
        ]);
        let series = time_series(&table, Period::Month);
        assert_eq!(series.labels.len(), 3);
        assert_eq!(series.counts[&Category::Mischief], vec![1, 0, 0]);
        assert_eq!(series.counts[&Category::ArmedRobbery], vec![0, 0, 1]);
        assert_eq!(series.counts[&Category::FatalCrime], vec![0, 0, 0]);
    }

    #[test]
    fn weekly_series_is_not_truncated() {
        let table = IncidentTable::new(vec![
            incident("2024-03-11", Category::Mischief),
            incident("2024-03-20", Category::Mischief),
        ]);
        let series = time_series(&table, Period::Week);
        assert_eq!(series.labels, vec!["2024-03-17", "2024-03-24"]);
    }

    #[test]
    fn all_data_in_partial_month_yields_empty_series() {
        let table = IncidentTable::new(vec![incident("2024-03-15", Category::Mischief)]);
        let series = time_series(&table, Period::Month);
        assert!(series.labels.is_empty());
    }
}
