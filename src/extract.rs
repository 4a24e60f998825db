//! Report table extraction and reshaping.
//!
//! A yearly report is an HTML page whose tables, after a leading navigation
//! table, come in pairs: a location-detail table describing one monitoring
//! point followed by the measurement table of that point. This module parses
//! the tables, classifies and pairs them, and reshapes each pair into one
//! `LocationRecord` plus the point's measurement rows.

use crate::constants::{labels, report_headers};
use crate::error::{BalneabilityError, Result};
use crate::models::{
    LocationRecord, RawDocument, RawMeasurement, ReportFragment, TableFragment, Year,
    YearExtraction,
};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::debug;

static TABLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").expect("valid table selector"));
static ROW_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("valid row selector"));
static CELL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("th, td").expect("valid cell selector"));
static POINT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^{}\s*{}\s*(\d+)",
        regex::escape(labels::POINT),
        regex::escape(labels::POINT_WORD)
    ))
    .expect("valid point pattern")
});

/// Parse every `<table>` of a document, in document order
pub fn parse_fragments(body: &str) -> Vec<TableFragment> {
    let html = Html::parse_document(body);
    html.select(&TABLE_SELECTOR)
        .enumerate()
        .map(|(position, table)| TableFragment {
            position,
            rows: table_rows(table),
        })
        .collect()
}

fn table_rows(table: ElementRef<'_>) -> Vec<Vec<String>> {
    table
        .select(&ROW_SELECTOR)
        .map(|row| {
            row.select(&CELL_SELECTOR)
                .map(|cell| normalize_whitespace(&cell.text().collect::<String>()))
                .collect()
        })
        .collect()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn looks_like_detail(fragment: &TableFragment) -> bool {
    fragment
        .cell(0, 0)
        .is_some_and(|cell| cell.to_lowercase().starts_with(labels::MUNICIPALITY))
}

fn looks_like_measurement(fragment: &TableFragment) -> bool {
    fragment.rows.first().is_some_and(|header| {
        header
            .iter()
            .any(|cell| cell.eq_ignore_ascii_case(report_headers::DATE))
    })
}

/// Drop the navigation table and classify the rest as detail/measurement
///
/// Detail tables sit at even positions of the trimmed sequence and
/// measurement tables at odd ones; each is checked against its expected
/// content so a shifted layout fails here instead of producing mixed-up rows.
pub fn classify_fragments(
    year: Year,
    fragments: Vec<TableFragment>,
) -> Result<Vec<ReportFragment>> {
    let mut fragments = fragments.into_iter();
    if fragments.next().is_none() {
        return Err(BalneabilityError::malformed(year, "document contains no tables"));
    }

    let trimmed: Vec<TableFragment> = fragments.collect();
    if trimmed.is_empty() {
        return Err(BalneabilityError::malformed(year, "no data tables after the header table"));
    }
    if trimmed.len() % 2 != 0 {
        return Err(BalneabilityError::malformed(
            year,
            format!(
                "{} data tables, expected detail/measurement pairs",
                trimmed.len()
            ),
        ));
    }

    trimmed
        .into_iter()
        .enumerate()
        .map(|(index, fragment)| {
            if index % 2 == 0 {
                if looks_like_detail(&fragment) {
                    Ok(ReportFragment::LocationDetail(fragment))
                } else {
                    Err(BalneabilityError::malformed(
                        year,
                        format!("table {} is not a location-detail table", fragment.position),
                    ))
                }
            } else if looks_like_measurement(&fragment) {
                Ok(ReportFragment::Measurement(fragment))
            } else {
                Err(BalneabilityError::malformed(
                    year,
                    format!("table {} is not a measurement table", fragment.position),
                ))
            }
        })
        .collect()
}

/// Pair each detail fragment with the measurement fragment following it
pub fn pair_fragments(
    year: Year,
    fragments: Vec<ReportFragment>,
) -> Result<Vec<(TableFragment, TableFragment)>> {
    let mut pairs = Vec::with_capacity(fragments.len() / 2);
    let mut iter = fragments.into_iter();
    while let Some(first) = iter.next() {
        match (first, iter.next()) {
            (
                ReportFragment::LocationDetail(detail),
                Some(ReportFragment::Measurement(measurement)),
            ) => {
                pairs.push((detail, measurement));
            }
            (ReportFragment::LocationDetail(detail), _) => {
                return Err(BalneabilityError::malformed(
                    year,
                    format!("detail table {} has no measurement table", detail.position),
                ));
            }
            (ReportFragment::Measurement(measurement), _) => {
                return Err(BalneabilityError::malformed(
                    year,
                    format!(
                        "measurement table {} has no detail table",
                        measurement.position
                    ),
                ));
            }
        }
    }
    Ok(pairs)
}

/// Lower-case a labelled cell and strip its label prefix
fn clean_labelled(
    year: Year,
    fragment: &TableFragment,
    row: usize,
    col: usize,
    label: &str,
) -> Result<String> {
    let cell = fragment.cell(row, col).ok_or_else(|| {
        BalneabilityError::malformed(
            year,
            format!(
                "detail table {} has no cell ({}, {})",
                fragment.position, row, col
            ),
        )
    })?;
    let lowered = cell.trim().to_lowercase();
    lowered
        .strip_prefix(label)
        .map(|value| value.trim().to_string())
        .ok_or_else(|| {
            BalneabilityError::malformed(
                year,
                format!("cell '{}' does not start with '{}'", cell, label),
            )
        })
}

/// Point number of a detail fragment ("Ponto de Coleta: Ponto 12" -> 12)
pub fn extract_point_id(year: Year, detail: &TableFragment) -> Result<i64> {
    let cell = detail.cell(1, 0).ok_or_else(|| {
        BalneabilityError::malformed(
            year,
            format!("detail table {} has no point cell", detail.position),
        )
    })?;
    let lowered = cell.trim().to_lowercase();
    POINT_PATTERN
        .captures(&lowered)
        .and_then(|captures| captures.get(1))
        .and_then(|number| number.as_str().parse::<i64>().ok())
        .ok_or_else(|| {
            BalneabilityError::malformed(year, format!("unparsable point label '{}'", cell))
        })
}

/// Location record described by a detail fragment
pub fn extract_location(year: Year, detail: &TableFragment) -> Result<LocationRecord> {
    Ok(LocationRecord {
        municipality: clean_labelled(year, detail, 0, 0, labels::MUNICIPALITY)?,
        beach_name: clean_labelled(year, detail, 0, 1, labels::BEACH)?,
        point_id: extract_point_id(year, detail)?,
        location_description: clean_labelled(year, detail, 1, 1, labels::LOCATION)?,
    })
}

/// Column positions of a measurement table header
struct MeasurementColumns {
    date: usize,
    time: usize,
    wind: usize,
    tide: usize,
    rain: usize,
    water_temp: usize,
    air_temp: usize,
    e_coli: usize,
    condition: usize,
}

impl MeasurementColumns {
    fn from_header(year: Year, fragment: &TableFragment) -> Result<Self> {
        let header = fragment.rows.first().ok_or_else(|| {
            BalneabilityError::malformed(
                year,
                format!("measurement table {} is empty", fragment.position),
            )
        })?;
        let find = |name: &str| {
            header
                .iter()
                .position(|cell| cell.trim() == name)
                .ok_or_else(|| {
                    BalneabilityError::malformed(
                        year,
                        format!(
                            "measurement table {} has no '{}' column",
                            fragment.position, name
                        ),
                    )
                })
        };

        Ok(Self {
            date: find(report_headers::DATE)?,
            time: find(report_headers::TIME)?,
            wind: find(report_headers::WIND)?,
            tide: find(report_headers::TIDE)?,
            rain: find(report_headers::RAIN)?,
            water_temp: find(report_headers::WATER_TEMP)?,
            air_temp: find(report_headers::AIR_TEMP)?,
            e_coli: find(report_headers::E_COLI)?,
            condition: find(report_headers::CONDITION)?,
        })
    }
}

/// Measurement rows of a measurement fragment, tagged with `point_id`
pub fn extract_measurements(
    year: Year,
    point_id: i64,
    fragment: &TableFragment,
) -> Result<Vec<RawMeasurement>> {
    let columns = MeasurementColumns::from_header(year, fragment)?;

    let measurements = fragment
        .rows
        .iter()
        .skip(1)
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .map(|row| {
            let cell = |index: usize| {
                row.get(index)
                    .map(|c| c.trim().to_string())
                    .unwrap_or_default()
            };
            RawMeasurement {
                point_id,
                date: cell(columns.date),
                time: cell(columns.time),
                wind: cell(columns.wind),
                tide: cell(columns.tide),
                rain: cell(columns.rain),
                water_temp: cell(columns.water_temp),
                air_temp: cell(columns.air_temp),
                e_coli: cell(columns.e_coli),
                condition: cell(columns.condition),
            }
        })
        .collect();

    Ok(measurements)
}

/// Reshape one yearly report into its location and measurement tables
pub fn extract_year(document: &RawDocument) -> Result<YearExtraction> {
    let year = document.year;
    let fragments = parse_fragments(&document.body);
    debug!("Year {}: {} tables in report", year, fragments.len());

    let classified = classify_fragments(year, fragments)?;
    let pairs = pair_fragments(year, classified)?;

    let mut extraction = YearExtraction {
        year,
        ..Default::default()
    };
    for (detail, measurement) in &pairs {
        let location = extract_location(year, detail)?;
        let rows = extract_measurements(year, location.point_id, measurement)?;
        extraction.measurements.extend(rows);
        extraction.locations.push(location);
    }

    debug!(
        "Year {}: {} points, {} measurements",
        year,
        extraction.locations.len(),
        extraction.measurements.len()
    );
    Ok(extraction)
}
