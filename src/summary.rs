//! Summary statistics over the written balneability table.
//!
//! Data layer of the exploratory dashboard: reads the output file back and
//! computes the aggregate tables and per-point chart data the dashboard
//! renders. Every function here is pure over the loaded table, so separate
//! dashboard sessions never share mutable state.

use crate::constants::{
    CONDITION_TOTAL_LABEL, HISTOGRAM_BINS, HISTOGRAM_MAX, OUTPUT_DATETIME_FORMAT, OUTPUT_SEPARATOR,
};
use crate::constants::{columns, conditions};
use crate::error::{BalneabilityError, Result};
use crate::models::Year;

use chrono::{Datelike, NaiveDateTime};
use polars::prelude::*;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Calendar columns derived from the timestamp when the table is loaded
pub const YEAR: &str = "year";
pub const MONTH: &str = "month";

const NUMERIC_COLUMNS: [&str; 3] = [columns::WATER_TEMP, columns::AIR_TEMP, columns::E_COLI];

fn output_schema() -> Schema {
    Schema::from_iter([
        Field::new(columns::TIMESTAMP.into(), DataType::String),
        Field::new(columns::POINT_ID.into(), DataType::Int64),
        Field::new(columns::WIND.into(), DataType::String),
        Field::new(columns::TIDE.into(), DataType::String),
        Field::new(columns::RAIN.into(), DataType::String),
        Field::new(columns::WATER_TEMP.into(), DataType::Float64),
        Field::new(columns::AIR_TEMP.into(), DataType::Float64),
        Field::new(columns::E_COLI.into(), DataType::Float64),
        Field::new(columns::CONDITION.into(), DataType::String),
        Field::new(columns::LAT.into(), DataType::Float64),
        Field::new(columns::LONG.into(), DataType::Float64),
        Field::new(columns::BALNEARY.into(), DataType::String),
        Field::new(columns::REFERENCE.into(), DataType::String),
        Field::new(columns::LOCATION.into(), DataType::String),
        Field::new(columns::FRESH_WATER.into(), DataType::Boolean),
        Field::new(columns::DRENAGE_BEACH.into(), DataType::Boolean),
        Field::new(columns::DRENAGE_POINT.into(), DataType::Boolean),
    ])
}

fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, OUTPUT_DATETIME_FORMAT).map_err(|_| {
        BalneabilityError::InvalidTimestamp {
            date: value.to_string(),
            time: String::new(),
        }
    })
}

/// Read a written output file back into a table
///
/// The leading row index is dropped and `year`/`month` columns are added
/// from the timestamp.
pub fn load_output(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_schema_overwrite(Some(Arc::new(output_schema())))
        .with_parse_options(CsvParseOptions::default().with_separator(OUTPUT_SEPARATOR))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let mut df = df.select(columns::output_columns())?;
    add_calendar_columns(&mut df)?;
    debug!("Loaded {} rows from {}", df.height(), path.display());
    Ok(df)
}

/// Add `year` and `month` columns parsed from the text timestamp
pub fn add_calendar_columns(df: &mut DataFrame) -> Result<()> {
    let timestamps = df.column(columns::TIMESTAMP)?.str()?;
    let mut years = Vec::with_capacity(timestamps.len());
    let mut months = Vec::with_capacity(timestamps.len());

    for value in timestamps.into_iter() {
        let timestamp = parse_timestamp(value.unwrap_or(""))?;
        years.push(timestamp.year());
        months.push(timestamp.month() as i32);
    }

    df.with_column(Column::new(YEAR.into(), years))?;
    df.with_column(Column::new(MONTH.into(), months))?;
    Ok(())
}

/// count, mean, median, var and std of the e. coli count per group
fn e_coli_stats(df: &DataFrame, keys: &[&str]) -> Result<DataFrame> {
    let key_exprs: Vec<Expr> = keys.iter().map(|key| col(*key)).collect();
    let e_coli = col(columns::E_COLI);

    let stats = df
        .clone()
        .lazy()
        .group_by(key_exprs.clone())
        .agg([
            e_coli.clone().count().alias("count"),
            e_coli.clone().mean().alias("mean"),
            e_coli.clone().median().alias("median"),
            e_coli.clone().var(1).alias("var"),
            e_coli.std(1).alias("std"),
        ])
        .sort_by_exprs(key_exprs, SortMultipleOptions::default())
        .collect()?;
    Ok(stats)
}

pub fn per_point(df: &DataFrame) -> Result<DataFrame> {
    e_coli_stats(df, &[columns::POINT_ID])
}

pub fn per_rain(df: &DataFrame) -> Result<DataFrame> {
    e_coli_stats(df, &[columns::RAIN])
}

/// Grouped by the three drainage flags together
pub fn per_drainage(df: &DataFrame) -> Result<DataFrame> {
    e_coli_stats(
        df,
        &[columns::FRESH_WATER, columns::DRENAGE_BEACH, columns::DRENAGE_POINT],
    )
}

pub fn per_year(df: &DataFrame) -> Result<DataFrame> {
    e_coli_stats(df, &[YEAR])
}

pub fn per_month(df: &DataFrame) -> Result<DataFrame> {
    e_coli_stats(df, &[MONTH])
}

/// Condition counts per point, with each condition's share of the samples
///
/// A last row labelled `CONDITION_TOTAL_LABEL` totals every point, so the
/// point column is text here.
pub fn condition_per_point(df: &DataFrame) -> Result<DataFrame> {
    let condition = col(columns::CONDITION);
    let tally = |value: &str, name: &str| condition.clone().eq(lit(value)).sum().alias(name);
    let tallies = [
        tally(conditions::PROPER, "proper"),
        tally(conditions::IMPROPER, "improper"),
        tally(conditions::INDETERMINATE, "indeterminate"),
        condition.clone().count().alias("total"),
    ];
    let share = |name: &str| {
        (col(name).cast(DataType::Float64) / col("total").cast(DataType::Float64) * lit(100.0))
            .alias(format!("{}_pct", name))
    };

    let per_point = df
        .clone()
        .lazy()
        .group_by([col(columns::POINT_ID)])
        .agg(tallies.clone())
        .sort_by_exprs([col(columns::POINT_ID)], SortMultipleOptions::default())
        .with_column(col(columns::POINT_ID).cast(DataType::String));

    let mut total_exprs = vec![lit(CONDITION_TOTAL_LABEL).alias(columns::POINT_ID)];
    total_exprs.extend(tallies);
    let totals = df.clone().lazy().select(total_exprs);

    let counts = concat([per_point, totals], UnionArgs::default())?
        .with_columns([share("proper"), share("improper"), share("indeterminate")])
        .collect()?;
    Ok(counts)
}

/// count, mean, std, min and max of the numeric measurement columns
pub fn describe(df: &DataFrame) -> Result<DataFrame> {
    let mut stats = vec![Column::new(
        "statistic".into(),
        ["count", "mean", "std", "min", "max"],
    )];

    for name in NUMERIC_COLUMNS {
        let values = df.column(name)?.f64()?;
        let count = (values.len() - values.null_count()) as f64;
        stats.push(Column::new(
            name.into(),
            [
                Some(count),
                values.mean(),
                values.std(1),
                values.min(),
                values.max(),
            ],
        ));
    }

    Ok(DataFrame::new(stats)?)
}

/// Aggregate tables offered by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryTable {
    Point,
    Rain,
    Drainage,
    Year,
    Month,
    Condition,
    Describe,
}

impl SummaryTable {
    pub const ALL: [SummaryTable; 7] = [
        SummaryTable::Point,
        SummaryTable::Rain,
        SummaryTable::Drainage,
        SummaryTable::Year,
        SummaryTable::Month,
        SummaryTable::Condition,
        SummaryTable::Describe,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SummaryTable::Point => "point",
            SummaryTable::Rain => "rain",
            SummaryTable::Drainage => "drainage",
            SummaryTable::Year => "year",
            SummaryTable::Month => "month",
            SummaryTable::Condition => "condition",
            SummaryTable::Describe => "describe",
        }
    }

    pub fn compute(&self, df: &DataFrame) -> Result<DataFrame> {
        match self {
            SummaryTable::Point => per_point(df),
            SummaryTable::Rain => per_rain(df),
            SummaryTable::Drainage => per_drainage(df),
            SummaryTable::Year => per_year(df),
            SummaryTable::Month => per_month(df),
            SummaryTable::Condition => condition_per_point(df),
            SummaryTable::Describe => describe(df),
        }
    }
}

impl fmt::Display for SummaryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SummaryTable {
    type Err = BalneabilityError;

    fn from_str(s: &str) -> Result<Self> {
        SummaryTable::ALL
            .into_iter()
            .find(|table| table.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| BalneabilityError::Configuration {
                message: format!(
                    "Unknown summary table '{}', expected one of: {}",
                    s,
                    SummaryTable::ALL.map(|t| t.name()).join(", ")
                ),
            })
    }
}

/// Year selection of the chart view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum YearFilter {
    #[default]
    All,
    Only(Year),
}

impl YearFilter {
    fn matches(&self, year: Year) -> bool {
        match self {
            YearFilter::All => true,
            YearFilter::Only(selected) => *selected == year,
        }
    }
}

impl From<Option<Year>> for YearFilter {
    fn from(year: Option<Year>) -> Self {
        year.map_or(YearFilter::All, YearFilter::Only)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub timestamp: NaiveDateTime,
    pub e_coli_count: f64,
}

/// Histogram bin covering `[start, end)`; the last bin also takes
/// everything above the range
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxPlot {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// Everything the chart view draws for one point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub point_id: i64,
    pub year: YearFilter,
    pub series: Vec<SeriesPoint>,
    pub histogram: Vec<HistogramBin>,
    pub box_plot: Option<BoxPlot>,
}

/// Chart data of one point, optionally limited to one year
pub fn chart_data(df: &DataFrame, point_id: i64, year: YearFilter) -> Result<ChartData> {
    let points = df.column(columns::POINT_ID)?.i64()?;
    let timestamps = df.column(columns::TIMESTAMP)?.str()?;
    let counts = df.column(columns::E_COLI)?.f64()?;

    let mut series = Vec::new();
    for ((point, timestamp), count) in points
        .into_iter()
        .zip(timestamps.into_iter())
        .zip(counts.into_iter())
    {
        let (Some(point), Some(timestamp), Some(count)) = (point, timestamp, count) else {
            continue;
        };
        if point != point_id {
            continue;
        }
        let timestamp = parse_timestamp(timestamp)?;
        if year.matches(timestamp.year()) {
            series.push(SeriesPoint {
                timestamp,
                e_coli_count: count,
            });
        }
    }
    series.sort_by_key(|point| point.timestamp);

    let values: Vec<f64> = series.iter().map(|point| point.e_coli_count).collect();
    Ok(ChartData {
        point_id,
        year,
        histogram: histogram(&values, HISTOGRAM_BINS, HISTOGRAM_MAX),
        box_plot: box_plot(&values),
        series,
    })
}

/// Percentage histogram of equal-width bins over `[0, max]`
pub fn histogram(values: &[f64], bins: usize, max: f64) -> Vec<HistogramBin> {
    let bins = bins.max(1);
    let width = max / bins as f64;
    let mut counts = vec![0usize; bins];

    for value in values {
        let index = (value / width).floor();
        let index = if index.is_nan() || index < 0.0 {
            0
        } else {
            (index as usize).min(bins - 1)
        };
        counts[index] += 1;
    }

    let total = values.len();
    counts
        .into_iter()
        .enumerate()
        .map(|(index, count)| HistogramBin {
            start: index as f64 * width,
            end: (index + 1) as f64 * width,
            percent: if total == 0 {
                0.0
            } else {
                count as f64 * 100.0 / total as f64
            },
        })
        .collect()
}

// Linear interpolation between closest ranks
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (position - lower as f64)
}

/// Quartiles of the values, `None` when there are none
pub fn box_plot(values: &[f64]) -> Option<BoxPlot> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    Some(BoxPlot {
        min: sorted[0],
        q1: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q3: quantile(&sorted, 0.75),
        max: sorted[sorted.len() - 1],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::conditions::{IMPROPER, INDETERMINATE, PROPER};
    use crate::models::{MeasurementRecord, PointFeature};
    use crate::normalize::build_output_frame;
    use crate::writer::CsvOutputWriter;
    use tempfile::TempDir;

    fn record(
        point_id: i64,
        timestamp: &str,
        e_coli: f64,
        rain: &str,
        condition: &str,
    ) -> MeasurementRecord {
        MeasurementRecord {
            timestamp: NaiveDateTime::parse_from_str(timestamp, OUTPUT_DATETIME_FORMAT).unwrap(),
            point_id,
            wind: "NE".to_string(),
            tide: "Enchente".to_string(),
            rain: rain.to_string(),
            water_temp_c: Some(20.0 + point_id as f64),
            air_temp_c: None,
            e_coli_count: e_coli,
            condition: condition.to_string(),
        }
    }

    fn feature(point_id: i64, drenage_beach: bool) -> PointFeature {
        PointFeature {
            point_id,
            lat: -27.4,
            long: -48.5,
            balneary: "jurerê".to_string(),
            reference: "ref".to_string(),
            location: "loc".to_string(),
            fresh_water: false,
            drenage_beach,
            drenage_point: false,
        }
    }

    /// Write a small output file and load it back the way the dashboard does
    fn sample_table() -> DataFrame {
        let records = vec![
            record(1, "2020-01-10 09:30:00", 100.0, "Ausente", PROPER),
            record(1, "2020-02-10 09:30:00", 300.0, "Fraca", PROPER),
            record(1, "2021-01-05 08:00:00", 200.0, "Ausente", IMPROPER),
            record(2, "2021-03-01 10:00:00", 1000.0, "Forte", INDETERMINATE),
        ];
        let features = vec![feature(1, false), feature(2, true)];
        let rows: Vec<_> = records
            .iter()
            .map(|r| (r, &features[(r.point_id - 1) as usize]))
            .collect();
        let frame = build_output_frame(&rows).unwrap();

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("balneability.csv");
        CsvOutputWriter::new(&path).write(&frame).unwrap();
        load_output(&path).unwrap()
    }

    fn f64_at(df: &DataFrame, column: &str, row: usize) -> Option<f64> {
        df.column(column).unwrap().f64().unwrap().get(row)
    }

    #[test]
    fn test_load_output_schema() {
        let df = sample_table();
        assert_eq!(df.height(), 4);
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();
        assert_eq!(names[0], columns::TIMESTAMP);
        assert!(names.contains(&YEAR.to_string()));
        assert!(names.contains(&MONTH.to_string()));
        let dtype = |name: &str| df.column(name).unwrap().dtype().clone();
        assert_eq!(dtype(columns::POINT_ID), DataType::Int64);
        assert_eq!(dtype(columns::DRENAGE_BEACH), DataType::Boolean);
    }

    #[test]
    fn test_per_point_stats() {
        let stats = per_point(&sample_table()).unwrap();
        assert_eq!(stats.height(), 2);
        assert_eq!(f64_at(&stats, "mean", 0), Some(200.0));
        assert_eq!(f64_at(&stats, "median", 0), Some(200.0));
        assert_eq!(f64_at(&stats, "var", 0), Some(10000.0));
        assert_eq!(f64_at(&stats, "std", 0), Some(100.0));
        // A single sample has no sample variance
        assert_eq!(f64_at(&stats, "var", 1), None);
    }

    #[test]
    fn test_per_year_and_month() {
        let table = sample_table();
        let by_year = per_year(&table).unwrap();
        assert_eq!(by_year.height(), 2);
        assert_eq!(f64_at(&by_year, "mean", 0), Some(200.0));
        assert_eq!(f64_at(&by_year, "mean", 1), Some(600.0));

        let by_month = per_month(&table).unwrap();
        assert_eq!(by_month.height(), 3);
    }

    #[test]
    fn test_per_rain_and_drainage_groups() {
        let table = sample_table();
        assert_eq!(per_rain(&table).unwrap().height(), 3);
        assert_eq!(per_drainage(&table).unwrap().height(), 2);
    }

    #[test]
    fn test_condition_shares() {
        let counts = condition_per_point(&sample_table()).unwrap();
        assert_eq!(counts.height(), 3);
        let pct = f64_at(&counts, "proper_pct", 0).unwrap();
        assert!((pct - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(f64_at(&counts, "indeterminate_pct", 1), Some(100.0));
    }

    #[test]
    fn test_condition_totals_row() {
        let counts = condition_per_point(&sample_table()).unwrap();
        let points: Vec<_> = counts
            .column(columns::POINT_ID)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(points, [Some("1"), Some("2"), Some(CONDITION_TOTAL_LABEL)]);

        let count_at = |name: &str| {
            let column = counts.column(name).unwrap().cast(&DataType::Int64).unwrap();
            column.i64().unwrap().get(2)
        };
        assert_eq!(count_at("proper"), Some(2));
        assert_eq!(count_at("improper"), Some(1));
        assert_eq!(count_at("indeterminate"), Some(1));
        assert_eq!(count_at("total"), Some(4));
        assert_eq!(f64_at(&counts, "proper_pct", 2), Some(50.0));
        assert_eq!(f64_at(&counts, "indeterminate_pct", 2), Some(25.0));
    }

    #[test]
    fn test_describe_numeric_columns() {
        let summary = describe(&sample_table()).unwrap();
        assert_eq!(summary.height(), 5);
        assert_eq!(f64_at(&summary, columns::E_COLI, 0), Some(4.0));
        assert_eq!(f64_at(&summary, columns::E_COLI, 3), Some(100.0));
        assert_eq!(f64_at(&summary, columns::E_COLI, 4), Some(1000.0));
        assert_eq!(f64_at(&summary, columns::AIR_TEMP, 0), Some(0.0));
    }

    #[test]
    fn test_chart_data_for_point_and_year() {
        let table = sample_table();

        let all = chart_data(&table, 1, YearFilter::All).unwrap();
        assert_eq!(all.series.len(), 3);
        let series = &all.series;
        assert!(series.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(all.histogram.len(), HISTOGRAM_BINS);
        let total: f64 = all.histogram.iter().map(|bin| bin.percent).sum();
        assert!((total - 100.0).abs() < 1e-9);

        let only_2021 = chart_data(&table, 1, YearFilter::Only(2021)).unwrap();
        assert_eq!(only_2021.series.len(), 1);
        assert_eq!(only_2021.series[0].e_coli_count, 200.0);

        let unknown = chart_data(&table, 42, YearFilter::All).unwrap();
        assert!(unknown.series.is_empty());
        assert!(unknown.box_plot.is_none());
    }

    #[test]
    fn test_histogram_clamps_out_of_range() {
        let bins = histogram(&[0.0, 999.0, 1000.0, 30000.0], 25, 25000.0);
        assert_eq!(bins[0].percent, 50.0);
        assert_eq!(bins[1].percent, 25.0);
        assert_eq!(bins[24].percent, 25.0);
        assert_eq!(bins[24].end, 25000.0);
    }

    #[test]
    fn test_box_plot_quartiles() {
        let plot = box_plot(&[4.0, 1.0, 3.0, 2.0, 5.0]).unwrap();
        assert_eq!(plot.min, 1.0);
        assert_eq!(plot.q1, 2.0);
        assert_eq!(plot.median, 3.0);
        assert_eq!(plot.q3, 4.0);
        assert_eq!(plot.max, 5.0);
    }

    #[test]
    fn test_summary_table_names() {
        let parsed: SummaryTable = "Drainage".parse().unwrap();
        assert_eq!(parsed, SummaryTable::Drainage);
        assert!("weekly".parse::<SummaryTable>().is_err());
        assert_eq!(YearFilter::from(Some(2020)), YearFilter::Only(2020));
        assert_eq!(YearFilter::from(None), YearFilter::All);
    }
}
