//! Latin-1 decoding and CSV parsing for the portal dataset.
//!
//! The portal serves ISO-8859-1, not UTF-8; decoding byte-by-byte keeps the
//! accented category labels ("Méfait", "Vol de véhicule à moteur") intact.
//! Unknown category labels are a schema-drift alert: they are logged loudly
//! and their rows excluded, but the run continues.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use mtl_crime_models::{Category, Incident, IncidentTable, TimeOfDay};

use crate::SourceError;

/// Required columns in the source CSV header.
const REQUIRED_COLUMNS: &[&str] = &["CATEGORIE", "DATE", "QUART", "PDQ", "LAT", "LONG"];

/// Decodes ISO-8859-1 bytes to a `String`.
///
/// Latin-1 maps each byte directly to the Unicode code point of the same
/// value, so the conversion is total and lossless.
#[must_use]
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Column indices resolved from the CSV header.
struct ColumnMap {
    category: usize,
    date: usize,
    quart: usize,
    pdq: usize,
    lat: usize,
    long: usize,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, SourceError> {
        let find = |name: &str| -> Result<usize, SourceError> {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| SourceError::MissingColumn {
                    name: name.to_string(),
                })
        };

        // Surface the first missing column by required order.
        for &name in REQUIRED_COLUMNS {
            find(name)?;
        }

        Ok(Self {
            category: find("CATEGORIE")?,
            date: find("DATE")?,
            quart: find("QUART")?,
            pdq: find("PDQ")?,
            lat: find("LAT")?,
            long: find("LONG")?,
        })
    }
}

/// Parses the decoded CSV text into a sorted [`IncidentTable`].
///
/// Rows with an unknown `CATEGORIE` label are excluded and reported once
/// per distinct label via `log::warn!`. Rows with malformed dates or
/// numeric fields are likewise counted, warned about, and skipped.
///
/// # Errors
///
/// Returns [`SourceError::MissingColumn`] if a required header is absent,
/// [`SourceError::Csv`] on reader failures, or [`SourceError::Empty`] if no
/// row parsed.
pub fn parse_table(text: &str, delimiter: u8) -> Result<IncidentTable, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns = ColumnMap::from_headers(reader.headers()?)?;

    let mut incidents = Vec::new();
    let mut unknown_categories: BTreeMap<String, u64> = BTreeMap::new();
    let mut malformed: u64 = 0;

    for record in reader.records() {
        let record = record?;

        let Some(label) = record.get(columns.category) else {
            malformed += 1;
            continue;
        };

        let Some(category) = Category::from_csv_label(label) else {
            *unknown_categories.entry(label.trim().to_string()).or_default() += 1;
            continue;
        };

        match parse_row(&record, &columns, category) {
            Some(incident) => incidents.push(incident),
            None => malformed += 1,
        }
    }

    // Schema-drift alert: a new category means the taxonomy (and its
    // translation table) needs updating before those rows can be published.
    for (label, count) in &unknown_categories {
        log::warn!("ALERT: unseen incident category {label:?} ({count} rows excluded)");
    }
    if malformed > 0 {
        log::warn!("Skipped {malformed} rows with malformed date or numeric fields");
    }

    if incidents.is_empty() {
        return Err(SourceError::Empty);
    }

    Ok(IncidentTable::new(incidents))
}

fn parse_row(
    record: &csv::StringRecord,
    columns: &ColumnMap,
    category: Category,
) -> Option<Incident> {
    let date = NaiveDate::parse_from_str(record.get(columns.date)?.trim(), "%Y-%m-%d").ok()?;
    let time_of_day = TimeOfDay::from_csv_label(record.get(columns.quart)?)?;
    // PDQ occasionally arrives as "7.0"; accept a float representation.
    let precinct = parse_precinct(record.get(columns.pdq)?)?;
    let latitude = record.get(columns.lat)?.trim().parse::<f64>().ok()?;
    let longitude = record.get(columns.long)?.trim().parse::<f64>().ok()?;

    Some(Incident {
        category,
        date,
        time_of_day,
        precinct,
        latitude,
        longitude,
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_precinct(field: &str) -> Option<u32> {
    let field = field.trim();
    if let Ok(n) = field.parse::<u32>() {
        return Some(n);
    }
    let f = field.parse::<f64>().ok()?;
    if f.fract() == 0.0 && f >= 0.0 {
        Some(f as u32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use mtl_crime_models::Lang;

    use super::*;

    const HEADER: &str = "CATEGORIE,DATE,QUART,PDQ,LAT,LONG";

    #[test]
    fn decodes_latin1_accents() {
        // "Méfait" in ISO-8859-1: é = 0xE9
        let bytes = [b'M', 0xE9, b'f', b'a', b'i', b't'];
        assert_eq!(decode_latin1(&bytes), "Méfait");
    }

    #[test]
    fn parses_and_sorts_rows() {
        let csv = format!(
            "{HEADER}\n\
             Méfait,2024-02-01,jour,7,45.52,-73.57\n\
             Introduction,2024-01-15,nuit,12,45.50,-73.60\n"
        );
        let table = parse_table(&csv, b',').unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.iter().next().unwrap().category,
            Category::BreakingAndEntering
        );
        assert_eq!(table.latest_date(), Some("2024-02-01".parse().unwrap()));
    }

    #[test]
    fn supports_semicolon_delimiter() {
        let csv = "CATEGORIE;DATE;QUART;PDQ;LAT;LONG\n\
                   Vols qualifiés;2024-01-01;soir;20;45.51;-73.58\n";
        let table = parse_table(csv, b';').unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.iter().next().unwrap().category, Category::ArmedRobbery);
    }

    #[test]
    fn missing_column_is_fatal() {
        let csv = "CATEGORIE,DATE,QUART,PDQ,LAT\n\
                   Méfait,2024-01-01,jour,7,45.52\n";
        let err = parse_table(csv, b',').unwrap_err();
        assert!(matches!(err, SourceError::MissingColumn { name } if name == "LONG"));
    }

    #[test]
    fn unknown_category_excluded_not_fatal() {
        let csv = format!(
            "{HEADER}\n\
             Méfait,2024-01-01,jour,7,45.52,-73.57\n\
             Nouvelle catégorie,2024-01-02,jour,7,45.52,-73.57\n"
        );
        let table = parse_table(&csv, b',').unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn malformed_row_skipped() {
        let csv = format!(
            "{HEADER}\n\
             Méfait,not-a-date,jour,7,45.52,-73.57\n\
             Méfait,2024-01-01,jour,7,45.52,-73.57\n"
        );
        let table = parse_table(&csv, b',').unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn all_rows_unparseable_is_empty() {
        let csv = format!("{HEADER}\nMystère,2024-01-01,jour,7,45.52,-73.57\n");
        assert!(matches!(parse_table(&csv, b','), Err(SourceError::Empty)));
    }

    #[test]
    fn accented_labels_survive_decode_then_parse() {
        let utf8 = format!("{HEADER}\nMéfait,2024-01-01,jour,7,45.52,-73.57\n");
        // Re-encode to Latin-1 bytes the way the portal serves it.
        let latin1: Vec<u8> = utf8
            .chars()
            .map(|c| u8::try_from(u32::from(c)).unwrap())
            .collect();
        let decoded = decode_latin1(&latin1);
        let table = parse_table(&decoded, b',').unwrap();
        let incident = table.iter().next().unwrap();
        assert_eq!(incident.category.label(Lang::Fr), "Méfait");
    }

    #[test]
    fn float_precinct_accepted() {
        let csv = format!("{HEADER}\nMéfait,2024-01-01,jour,7.0,45.52,-73.57\n");
        let table = parse_table(&csv, b',').unwrap();
        assert_eq!(table.iter().next().unwrap().precinct, 7);
    }
}
