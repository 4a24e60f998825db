//! Normalization and typing of the unioned report tables.
//!
//! Turns the text rows extracted from every yearly report into typed
//! measurement records: timestamps are assembled from the separate date and
//! time cells (with the default sampling hour filling gaps), temperatures
//! lose their unit suffix, and the result is joined with the curated point
//! features into the fixed output schema.

use crate::config::RowPolicy;
use crate::constants::{CORRUPT_TIME_LITERAL, DATE_FORMATS, TEMPERATURE_UNIT, TIME_FORMATS, columns};
use crate::error::{BalneabilityError, Result};
use crate::models::{
    LocationRecord, MeasurementRecord, PointFeature, RawMeasurement, UnionedTables, YearExtraction,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::*;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Union per-year extractions, oldest year first
///
/// Extractions may arrive in any order (fetches complete concurrently); the
/// union is always built in ascending year order so output is reproducible.
pub fn reduce_years(mut extractions: Vec<YearExtraction>) -> UnionedTables {
    extractions.sort_by_key(|extraction| extraction.year);

    let mut tables = UnionedTables::default();
    for extraction in extractions {
        tables.years.push(extraction.year);
        tables.locations.extend(extraction.locations);
        tables.measurements.extend(extraction.measurements);
    }
    tables
}

/// Keep the first location record seen for each point
pub fn dedupe_locations(locations: Vec<LocationRecord>) -> Vec<LocationRecord> {
    let mut seen = HashSet::new();
    locations
        .into_iter()
        .filter(|location| seen.insert(location.point_id))
        .collect()
}

fn parse_date(date: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date, format).ok())
}

fn parse_time(time: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(time, format).ok())
}

/// Combine the date and time cells of a measurement row
///
/// An empty time, or the corrupt literal the service is known to publish,
/// resolves to `default_time`. Any other unparsable value is rejected.
pub fn build_timestamp(date: &str, time: &str, default_time: &str) -> Result<NaiveDateTime> {
    let invalid = || BalneabilityError::InvalidTimestamp {
        date: date.to_string(),
        time: time.to_string(),
    };

    let trimmed = time.trim();
    let effective_time = if trimmed.is_empty() || trimmed == CORRUPT_TIME_LITERAL {
        default_time
    } else {
        trimmed
    };

    let date = parse_date(date.trim()).ok_or_else(invalid)?;
    let time = parse_time(effective_time).ok_or_else(invalid)?;
    Ok(NaiveDateTime::new(date, time))
}

/// Strip the unit suffix of a temperature cell and parse it
///
/// Empty or whitespace-only values are missing (`None`).
pub fn clean_temperature(column: &str, value: &str) -> Result<Option<f64>> {
    let trimmed = value.trim();
    let number = trimmed
        .strip_suffix(TEMPERATURE_UNIT)
        .unwrap_or(trimmed)
        .trim();

    if number.is_empty() {
        return Ok(None);
    }

    number
        .parse::<f64>()
        .map(Some)
        .map_err(|_| BalneabilityError::InvalidNumericField {
            column: column.to_string(),
            value: value.to_string(),
        })
}

/// Parse the e. coli count of a measurement row
pub fn parse_e_coli(value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| BalneabilityError::InvalidNumericField {
            column: columns::E_COLI.to_string(),
            value: value.to_string(),
        })
}

/// Type one extracted measurement row
pub fn normalize_measurement(
    raw: &RawMeasurement,
    default_time: &str,
) -> Result<MeasurementRecord> {
    Ok(MeasurementRecord {
        timestamp: build_timestamp(&raw.date, &raw.time, default_time)?,
        point_id: raw.point_id,
        wind: raw.wind.trim().to_string(),
        tide: raw.tide.trim().to_string(),
        rain: raw.rain.trim().to_string(),
        water_temp_c: clean_temperature(columns::WATER_TEMP, &raw.water_temp)?,
        air_temp_c: clean_temperature(columns::AIR_TEMP, &raw.air_temp)?,
        e_coli_count: parse_e_coli(&raw.e_coli)?,
        condition: raw.condition.trim().to_string(),
    })
}

/// Type every row, applying the row policy to row-level failures
///
/// Returns the typed records and the number of rows skipped.
pub fn normalize_measurements(
    raws: &[RawMeasurement],
    default_time: &str,
    policy: RowPolicy,
) -> Result<(Vec<MeasurementRecord>, usize)> {
    let mut records = Vec::with_capacity(raws.len());
    let mut skipped = 0;

    for raw in raws {
        match normalize_measurement(raw, default_time) {
            Ok(record) => records.push(record),
            Err(e) if policy == RowPolicy::Skip && e.is_row_level() => {
                warn!("Skipping row of point {}: {}", raw.point_id, e);
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    debug!("Normalized {} rows, skipped {}", records.len(), skipped);
    Ok((records, skipped))
}

/// Inner join of measurements with point features on the point id
///
/// Measurements of points without a feature row are dropped. Measurement
/// order is preserved.
pub fn join_features<'a>(
    records: &'a [MeasurementRecord],
    features: &'a [PointFeature],
) -> Vec<(&'a MeasurementRecord, &'a PointFeature)> {
    let mut by_point: HashMap<i64, &PointFeature> = HashMap::with_capacity(features.len());
    for feature in features {
        by_point.entry(feature.point_id).or_insert(feature);
    }

    records
        .iter()
        .filter_map(|record| {
            by_point
                .get(&record.point_id)
                .map(|feature| (record, *feature))
        })
        .collect()
}

/// Build the output table in the fixed column order
pub fn build_output_frame(rows: &[(&MeasurementRecord, &PointFeature)]) -> Result<DataFrame> {
    let timestamps: Vec<NaiveDateTime> = rows.iter().map(|(m, _)| m.timestamp).collect();
    let point_ids: Vec<i64> = rows.iter().map(|(m, _)| m.point_id).collect();
    let winds: Vec<&str> = rows.iter().map(|(m, _)| m.wind.as_str()).collect();
    let tides: Vec<&str> = rows.iter().map(|(m, _)| m.tide.as_str()).collect();
    let rains: Vec<&str> = rows.iter().map(|(m, _)| m.rain.as_str()).collect();
    let water: Vec<Option<f64>> = rows.iter().map(|(m, _)| m.water_temp_c).collect();
    let air: Vec<Option<f64>> = rows.iter().map(|(m, _)| m.air_temp_c).collect();
    let e_coli: Vec<f64> = rows.iter().map(|(m, _)| m.e_coli_count).collect();
    let conditions: Vec<&str> = rows.iter().map(|(m, _)| m.condition.as_str()).collect();

    let lats: Vec<f64> = rows.iter().map(|(_, f)| f.lat).collect();
    let longs: Vec<f64> = rows.iter().map(|(_, f)| f.long).collect();
    let balnearies: Vec<&str> = rows.iter().map(|(_, f)| f.balneary.as_str()).collect();
    let references: Vec<&str> = rows.iter().map(|(_, f)| f.reference.as_str()).collect();
    let locations: Vec<&str> = rows.iter().map(|(_, f)| f.location.as_str()).collect();
    let fresh: Vec<bool> = rows.iter().map(|(_, f)| f.fresh_water).collect();
    let drenage_beach: Vec<bool> = rows.iter().map(|(_, f)| f.drenage_beach).collect();
    let drenage_point: Vec<bool> = rows.iter().map(|(_, f)| f.drenage_point).collect();

    let df = DataFrame::new(vec![
        Column::new(columns::TIMESTAMP.into(), timestamps),
        Column::new(columns::POINT_ID.into(), point_ids),
        Column::new(columns::WIND.into(), winds),
        Column::new(columns::TIDE.into(), tides),
        Column::new(columns::RAIN.into(), rains),
        Column::new(columns::WATER_TEMP.into(), water),
        Column::new(columns::AIR_TEMP.into(), air),
        Column::new(columns::E_COLI.into(), e_coli),
        Column::new(columns::CONDITION.into(), conditions),
        Column::new(columns::LAT.into(), lats),
        Column::new(columns::LONG.into(), longs),
        Column::new(columns::BALNEARY.into(), balnearies),
        Column::new(columns::REFERENCE.into(), references),
        Column::new(columns::LOCATION.into(), locations),
        Column::new(columns::FRESH_WATER.into(), fresh),
        Column::new(columns::DRENAGE_BEACH.into(), drenage_beach),
        Column::new(columns::DRENAGE_POINT.into(), drenage_point),
    ])?;

    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_SAMPLE_TIME;

    fn raw(point_id: i64, date: &str, time: &str, e_coli: &str) -> RawMeasurement {
        RawMeasurement {
            point_id,
            date: date.to_string(),
            time: time.to_string(),
            wind: "NE".to_string(),
            tide: "Enchente".to_string(),
            rain: "Ausente".to_string(),
            water_temp: "21 Cº".to_string(),
            air_temp: "24Cº".to_string(),
            e_coli: e_coli.to_string(),
            condition: "PRÓPRIA".to_string(),
        }
    }

    fn location(point_id: i64, beach: &str) -> LocationRecord {
        LocationRecord {
            municipality: "florianópolis".to_string(),
            beach_name: beach.to_string(),
            point_id,
            location_description: "rua 1".to_string(),
        }
    }

    fn feature(point_id: i64) -> PointFeature {
        PointFeature {
            point_id,
            lat: -27.6,
            long: -48.5,
            balneary: "jurerê".to_string(),
            reference: "ref".to_string(),
            location: "loc".to_string(),
            fresh_water: false,
            drenage_beach: true,
            drenage_point: false,
        }
    }

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{} {}", date, time), "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_missing_time_defaults_to_sampling_hour() {
        let ts = build_timestamp("2020-01-10", "", DEFAULT_SAMPLE_TIME).unwrap();
        assert_eq!(ts, at("2020-01-10", "09:30:00"));
    }

    #[test]
    fn test_corrupt_time_defaults_to_sampling_hour() {
        let ts = build_timestamp("2020-01-10", "92:07:00", DEFAULT_SAMPLE_TIME).unwrap();
        assert_eq!(ts, at("2020-01-10", "09:30:00"));
    }

    #[test]
    fn test_valid_time_is_kept() {
        let ts = build_timestamp("2020-01-10", "08:15:42", DEFAULT_SAMPLE_TIME).unwrap();
        assert_eq!(ts, at("2020-01-10", "08:15:42"));
        let short = build_timestamp("10/01/2020", "08:15", DEFAULT_SAMPLE_TIME).unwrap();
        assert_eq!(short, at("2020-01-10", "08:15:00"));
    }

    #[test]
    fn test_other_bad_times_are_rejected() {
        for time in ["25:00:00", "noon", "93:07:00"] {
            let result = build_timestamp("2020-01-10", time, DEFAULT_SAMPLE_TIME);
            assert!(
                matches!(result, Err(BalneabilityError::InvalidTimestamp { .. })),
                "{} should be rejected",
                time
            );
        }
        assert!(build_timestamp("2020-13-40", "08:00:00", DEFAULT_SAMPLE_TIME).is_err());
    }

    #[test]
    fn test_temperature_cleaning() {
        assert_eq!(clean_temperature("t", "18 Cº").unwrap(), Some(18.0));
        assert_eq!(clean_temperature("t", "18Cº").unwrap(), Some(18.0));
        assert_eq!(clean_temperature("t", "  ").unwrap(), None);
        assert_eq!(clean_temperature("t", "").unwrap(), None);
        assert_eq!(clean_temperature("t", "18.5").unwrap(), Some(18.5));
    }

    #[test]
    fn test_temperature_cleaning_is_idempotent() {
        let once = clean_temperature("t", "22.5 Cº").unwrap().unwrap();
        let twice = clean_temperature("t", &once.to_string()).unwrap();
        assert_eq!(twice, Some(once));
    }

    #[test]
    fn test_non_numeric_temperature_rejected() {
        let result = clean_temperature("water_temp_c", "warm Cº");
        let Err(BalneabilityError::InvalidNumericField { column, .. }) = result else {
            panic!("expected an invalid numeric field");
        };
        assert_eq!(column, "water_temp_c");
    }

    #[test]
    fn test_dedupe_keeps_first_and_is_idempotent() {
        let locations = vec![
            location(1, "first"),
            location(2, "other"),
            location(1, "second"),
        ];
        let once = dedupe_locations(locations);
        assert_eq!(once.len(), 2);
        assert_eq!(once[0].beach_name, "first");
        let twice = dedupe_locations(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_reduce_years_sorts_by_year() {
        let later = YearExtraction {
            year: 2021,
            locations: vec![location(2, "b")],
            measurements: vec![raw(2, "2021-01-01", "", "1")],
        };
        let earlier = YearExtraction {
            year: 2019,
            locations: vec![location(1, "a")],
            measurements: vec![raw(1, "2019-01-01", "", "2")],
        };
        let tables = reduce_years(vec![later, earlier]);
        assert_eq!(tables.years, vec![2019, 2021]);
        assert_eq!(tables.locations[0].point_id, 1);
        assert_eq!(tables.measurements[0].date, "2019-01-01");
        assert_eq!(tables.measurements[1].date, "2021-01-01");
    }

    #[test]
    fn test_normalize_measurement_types_fields() {
        let record =
            normalize_measurement(&raw(4, "2020-01-10", "", "52"), DEFAULT_SAMPLE_TIME).unwrap();
        assert_eq!(record.timestamp, at("2020-01-10", "09:30:00"));
        assert_eq!(record.point_id, 4);
        assert_eq!(record.water_temp_c, Some(21.0));
        assert_eq!(record.air_temp_c, Some(24.0));
        assert_eq!(record.e_coli_count, 52.0);
        assert_eq!(record.condition, "PRÓPRIA");
    }

    #[test]
    fn test_strict_policy_fails_on_bad_row() {
        let raws = vec![raw(1, "2020-01-10", "", "5"), raw(1, "2020-01-11", "", "lots")];
        let result = normalize_measurements(&raws, DEFAULT_SAMPLE_TIME, RowPolicy::Strict);
        assert!(matches!(result, Err(BalneabilityError::InvalidNumericField { .. })));
    }

    #[test]
    fn test_skip_policy_drops_bad_rows() {
        let raws = vec![
            raw(1, "2020-01-10", "", "5"),
            raw(1, "2020-01-11", "25:61:00", "5"),
            raw(1, "2020-01-12", "", "lots"),
        ];
        let (records, skipped) =
            normalize_measurements(&raws, DEFAULT_SAMPLE_TIME, RowPolicy::Skip).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(skipped, 2);
    }

    #[test]
    fn test_join_drops_points_without_features() {
        let raws = vec![
            raw(1, "2020-01-10", "", "5"),
            raw(2, "2020-01-10", "", "6"),
            raw(1, "2020-01-11", "", "7"),
        ];
        let (records, _) =
            normalize_measurements(&raws, DEFAULT_SAMPLE_TIME, RowPolicy::Strict).unwrap();
        let features = vec![feature(1), feature(3)];
        let joined = join_features(&records, &features);
        assert_eq!(joined.len(), 2);
        for (measurement, feature) in &joined {
            assert_eq!(measurement.point_id, 1);
            assert_eq!(feature.point_id, 1);
        }
        assert_eq!(joined[1].0.e_coli_count, 7.0);
    }

    #[test]
    fn test_output_frame_schema() {
        let raws = vec![raw(1, "2020-01-10", "", "5")];
        let (records, _) =
            normalize_measurements(&raws, DEFAULT_SAMPLE_TIME, RowPolicy::Strict).unwrap();
        let features = vec![feature(1)];
        let joined = join_features(&records, &features);
        let df = build_output_frame(&joined).unwrap();

        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        let expected: Vec<String> = columns::output_columns()
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, expected);
        assert_eq!(df.height(), 1);
    }

    #[test]
    fn test_output_frame_empty() {
        let df = build_output_frame(&[]).unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), 17);
    }
}
