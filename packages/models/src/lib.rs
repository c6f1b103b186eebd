#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident taxonomy and core domain types.
//!
//! This crate defines the canonical incident category taxonomy used across
//! the entire dashboard pipeline, the time-of-day buckets reported by the
//! SPVM open-data portal, and the in-memory incident table every stage
//! consumes.
//!
//! The declaration order of [`Category`] variants is the canonical display
//! order published to the charts. The derived `Ord` follows declaration
//! order, so ordered maps keyed by [`Category`] iterate in chart order.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Incidents south of this latitude fail the location sanity check.
pub const MIN_LATITUDE: f64 = 45.0;

/// Incidents east of this longitude fail the location sanity check.
pub const MAX_LONGITUDE: f64 = -70.0;

/// The six incident categories reported by the open-data portal.
///
/// Variants are declared in canonical display order. This ordering is a
/// published contract: the line charts, pie charts, and supporting data all
/// emit categories in exactly this sequence.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    /// "Vol de véhicule à moteur"
    MotorVehicleTheft,
    /// "Vol dans / sur véhicule à moteur"
    TheftFromVehicle,
    /// "Introduction" (breaking and entering)
    BreakingAndEntering,
    /// "Méfait"
    Mischief,
    /// "Vols qualifiés"
    ArmedRobbery,
    /// "Infractions entrainant la mort"
    FatalCrime,
}

impl Category {
    /// Number of categories in the taxonomy.
    pub const COUNT: usize = 6;

    /// All categories in canonical display order.
    pub const ALL: &[Self] = &[
        Self::MotorVehicleTheft,
        Self::TheftFromVehicle,
        Self::BreakingAndEntering,
        Self::Mischief,
        Self::ArmedRobbery,
        Self::FatalCrime,
    ];

    /// Position of this category in the canonical display order.
    #[must_use]
    pub const fn ordinal(self) -> usize {
        self as usize
    }

    /// Maps the raw `CATEGORIE` label from the source CSV to a variant.
    ///
    /// Returns `None` for labels outside the known taxonomy — the loader
    /// treats those as a schema-drift alert, not a parse failure.
    #[must_use]
    pub fn from_csv_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Vol de véhicule à moteur" => Some(Self::MotorVehicleTheft),
            "Vol dans / sur véhicule à moteur" => Some(Self::TheftFromVehicle),
            "Introduction" => Some(Self::BreakingAndEntering),
            "Méfait" => Some(Self::Mischief),
            "Vols qualifiés" => Some(Self::ArmedRobbery),
            "Infractions entrainant la mort" => Some(Self::FatalCrime),
            _ => None,
        }
    }

    /// Localized display label for this category.
    #[must_use]
    pub const fn label(self, lang: Lang) -> &'static str {
        match lang {
            Lang::Fr => match self {
                Self::MotorVehicleTheft => "Vol de véhicule à moteur",
                Self::TheftFromVehicle => "Vol dans / sur véhicule à moteur",
                Self::BreakingAndEntering => "Introduction",
                Self::Mischief => "Méfait",
                Self::ArmedRobbery => "Vols qualifiés",
                Self::FatalCrime => "Infractions entrainant la mort",
            },
            Lang::En => match self {
                Self::MotorVehicleTheft => "Car theft",
                Self::TheftFromVehicle => "Theft from a vehicle",
                Self::BreakingAndEntering => "Breaking and entering",
                Self::Mischief => "Mischief",
                Self::ArmedRobbery => "Armed robbery",
                Self::FatalCrime => "Fatal crimes",
            },
        }
    }
}

/// Time-of-day bucket (`QUART` column) for an incident.
///
/// Emission order is always day, evening, night.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeOfDay {
    /// "jour"
    Day,
    /// "soir"
    Evening,
    /// "nuit"
    Night,
}

impl TimeOfDay {
    /// Number of time-of-day buckets.
    pub const COUNT: usize = 3;

    /// All buckets in emission order.
    pub const ALL: &[Self] = &[Self::Day, Self::Evening, Self::Night];

    /// Position of this bucket in the emission order.
    #[must_use]
    pub const fn ordinal(self) -> usize {
        self as usize
    }

    /// Maps the raw `QUART` label from the source CSV to a variant.
    #[must_use]
    pub fn from_csv_label(label: &str) -> Option<Self> {
        match label.trim() {
            "jour" => Some(Self::Day),
            "soir" => Some(Self::Evening),
            "nuit" => Some(Self::Night),
            _ => None,
        }
    }

    /// Localized display label for this bucket.
    #[must_use]
    pub const fn label(self, lang: Lang) -> &'static str {
        match lang {
            Lang::Fr => match self {
                Self::Day => "jour",
                Self::Evening => "soir",
                Self::Night => "nuit",
            },
            Lang::En => match self {
                Self::Day => "day",
                Self::Evening => "evening",
                Self::Night => "night",
            },
        }
    }
}

/// Output language for the published artifacts.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Lang {
    /// French (source language of the portal data).
    Fr,
    /// English.
    En,
}

impl Lang {
    /// Both supported languages, French first.
    pub const ALL: &[Self] = &[Self::Fr, Self::En];

    /// Two-letter language code used in output paths.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Fr => "fr",
            Self::En => "en",
        }
    }
}

/// One citizen-reported incident, immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// Incident category.
    pub category: Category,
    /// Calendar date the incident was reported.
    pub date: NaiveDate,
    /// Time-of-day bucket.
    pub time_of_day: TimeOfDay,
    /// Police precinct (`PDQ`) number.
    pub precinct: u32,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
}

impl Incident {
    /// Whether the coordinates pass the island bounding-box sanity check.
    ///
    /// The portal occasionally ships placeholder coordinates far outside
    /// the study area; those records are kept for temporal aggregation but
    /// excluded from every spatial operation.
    #[must_use]
    pub fn has_valid_location(&self) -> bool {
        self.latitude > MIN_LATITUDE && self.longitude < MAX_LONGITUDE
    }
}

/// Per-category count vector, indexed in canonical display order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts([u64; Category::COUNT]);

impl CategoryCounts {
    /// A vector of all zeros.
    #[must_use]
    pub const fn zero() -> Self {
        Self([0; Category::COUNT])
    }

    /// Increments the count for `category`.
    pub const fn incr(&mut self, category: Category) {
        self.0[category.ordinal()] += 1;
    }

    /// Count for `category`.
    #[must_use]
    pub const fn get(self, category: Category) -> u64 {
        self.0[category.ordinal()]
    }

    /// Sum over all categories.
    #[must_use]
    pub fn total(self) -> u64 {
        self.0.iter().sum()
    }

    /// `(category, count)` pairs in canonical display order.
    pub fn iter(self) -> impl Iterator<Item = (Category, u64)> {
        Category::ALL.iter().map(move |&cat| (cat, self.get(cat)))
    }
}

/// Ordered incident table, sorted ascending by date.
///
/// The sort is a constructor post-condition that all downstream windowing
/// relies on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncidentTable {
    incidents: Vec<Incident>,
}

impl IncidentTable {
    /// Builds a table from unordered records, sorting ascending by date.
    #[must_use]
    pub fn new(mut incidents: Vec<Incident>) -> Self {
        incidents.sort_by_key(|incident| incident.date);
        Self { incidents }
    }

    /// Number of incidents.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.incidents.len()
    }

    /// Whether the table holds no incidents.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }

    /// Iterates incidents in date order.
    pub fn iter(&self) -> std::slice::Iter<'_, Incident> {
        self.incidents.iter()
    }

    /// Date of the earliest incident.
    #[must_use]
    pub fn earliest_date(&self) -> Option<NaiveDate> {
        self.incidents.first().map(|incident| incident.date)
    }

    /// Date of the most recent incident.
    #[must_use]
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.incidents.last().map(|incident| incident.date)
    }

    /// New table restricted to `start..=end` (dates inclusive).
    ///
    /// The input is already sorted, so the slice boundaries are found by
    /// binary search and order is preserved.
    #[must_use]
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Self {
        let from = self.incidents.partition_point(|i| i.date < start);
        let to = self.incidents.partition_point(|i| i.date <= end);
        Self {
            incidents: self.incidents[from..to].to_vec(),
        }
    }

    /// New table keeping only incidents that pass the location sanity check.
    #[must_use]
    pub fn with_valid_locations(&self) -> Self {
        Self {
            incidents: self
                .incidents
                .iter()
                .filter(|incident| incident.has_valid_location())
                .cloned()
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a IncidentTable {
    type Item = &'a Incident;
    type IntoIter = std::slice::Iter<'a, Incident>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
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

    #[test]
    fn canonical_order_matches_declaration() {
        for (i, cat) in Category::ALL.iter().enumerate() {
            assert_eq!(cat.ordinal(), i);
        }
        let mut sorted = Category::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted.as_slice(), Category::ALL);
    }

    #[test]
    fn csv_label_roundtrip() {
        for &cat in Category::ALL {
            assert_eq!(Category::from_csv_label(cat.label(Lang::Fr)), Some(cat));
        }
        assert_eq!(Category::from_csv_label("Cambriolage"), None);
    }

    #[test]
    fn every_category_has_both_labels() {
        for &cat in Category::ALL {
            assert!(!cat.label(Lang::Fr).is_empty());
            assert!(!cat.label(Lang::En).is_empty());
            assert_ne!(cat.label(Lang::Fr), "");
        }
    }

    #[test]
    fn time_of_day_labels() {
        assert_eq!(TimeOfDay::from_csv_label("soir"), Some(TimeOfDay::Evening));
        assert_eq!(TimeOfDay::Evening.label(Lang::En), "evening");
        assert_eq!(TimeOfDay::from_csv_label("matin"), None);
    }

    #[test]
    fn location_sanity_check() {
        let mut inc = incident("2024-01-01", Category::Mischief);
        assert!(inc.has_valid_location());
        inc.latitude = 0.0;
        assert!(!inc.has_valid_location());
        inc.latitude = 45.5;
        inc.longitude = 0.0;
        assert!(!inc.has_valid_location());
    }

    #[test]
    fn table_sorts_ascending_by_date() {
        let table = IncidentTable::new(vec![
            incident("2024-03-01", Category::Mischief),
            incident("2024-01-15", Category::ArmedRobbery),
            incident("2024-02-20", Category::FatalCrime),
        ]);
        let dates: Vec<NaiveDate> = table.iter().map(|i| i.date).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted);
        assert_eq!(table.earliest_date(), Some("2024-01-15".parse().unwrap()));
        assert_eq!(table.latest_date(), Some("2024-03-01".parse().unwrap()));
    }

    #[test]
    fn between_is_inclusive() {
        let table = IncidentTable::new(vec![
            incident("2024-01-01", Category::Mischief),
            incident("2024-01-15", Category::Mischief),
            incident("2024-02-01", Category::Mischief),
        ]);
        let window = table.between("2024-01-01".parse().unwrap(), "2024-01-15".parse().unwrap());
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn category_counts_iterate_in_canonical_order() {
        let mut counts = CategoryCounts::zero();
        counts.incr(Category::FatalCrime);
        counts.incr(Category::MotorVehicleTheft);
        counts.incr(Category::MotorVehicleTheft);
        let pairs: Vec<(Category, u64)> = counts.iter().collect();
        assert_eq!(pairs[0], (Category::MotorVehicleTheft, 2));
        assert_eq!(pairs[5], (Category::FatalCrime, 1));
        assert_eq!(counts.total(), 3);
    }
}
