//! Pure, per-call date localization.
//!
//! The language is an explicit parameter — no process-wide locale state,
//! which is neither thread-safe nor order-independent. Month-name tables
//! live here rather than behind a system locale so the output is identical
//! on every host.

use chrono::{Datelike, NaiveDate};
use mtl_crime_models::Lang;

const MONTHS_FR: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];

const MONTHS_EN: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Formats a date the way the dashboard header displays it.
///
/// French uses day-first ordering ("15 mars 2024"), English month-first
/// ("March 15, 2024").
#[must_use]
pub fn localized_date(date: NaiveDate, lang: Lang) -> String {
    let month = (date.month0() as usize).min(11);
    match lang {
        Lang::Fr => format!("{} {} {}", date.day(), MONTHS_FR[month], date.year()),
        Lang::En => format!("{} {}, {}", MONTHS_EN[month], date.day(), date.year()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn french_is_day_first_with_accents() {
        assert_eq!(localized_date(date("2024-02-15"), Lang::Fr), "15 février 2024");
        assert_eq!(localized_date(date("2024-08-01"), Lang::Fr), "1 août 2024");
    }

    #[test]
    fn english_is_month_first() {
        assert_eq!(localized_date(date("2024-02-15"), Lang::En), "February 15, 2024");
        assert_eq!(localized_date(date("2024-12-31"), Lang::En), "December 31, 2024");
    }
}
