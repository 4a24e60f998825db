//! Core data structures and types for balneability processing.
//!
//! Defines the raw payloads returned by the monitoring service, the
//! intermediate fragments and records of the reshaping stage, the curated
//! point features and the processing statistics reported to the user.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Monitoring year as published by the service
pub type Year = i32;

/// Raw report document for one monitoring year
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub year: Year,
    pub body: String,
}

/// Outcome of one per-year report request
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Success(RawDocument),
    Failure { reason: String },
}

/// Per-year fetch result, success or a recorded failure
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub year: Year,
    pub outcome: FetchOutcome,
}

impl FetchResult {
    pub fn success(document: RawDocument) -> Self {
        Self {
            year: document.year,
            outcome: FetchOutcome::Success(document),
        }
    }

    pub fn failure(year: Year, reason: impl Into<String>) -> Self {
        Self {
            year,
            outcome: FetchOutcome::Failure {
                reason: reason.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, FetchOutcome::Success(_))
    }
}

/// One `<table>` block of a report, as a grid of trimmed cell texts
#[derive(Debug, Clone, PartialEq)]
pub struct TableFragment {
    pub position: usize,
    pub rows: Vec<Vec<String>>,
}

impl TableFragment {
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .map(String::as_str)
    }
}

/// Classified report fragment
#[derive(Debug, Clone, PartialEq)]
pub enum ReportFragment {
    LocationDetail(TableFragment),
    Measurement(TableFragment),
}

/// Location of a monitoring point, as described in one yearly report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub municipality: String,
    pub beach_name: String,
    pub point_id: i64,
    pub location_description: String,
}

/// Measurement row as text, tagged with the point it belongs to
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawMeasurement {
    pub point_id: i64,
    pub date: String,
    pub time: String,
    pub wind: String,
    pub tide: String,
    pub rain: String,
    pub water_temp: String,
    pub air_temp: String,
    pub e_coli: String,
    pub condition: String,
}

/// Typed measurement record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub timestamp: NaiveDateTime,
    pub point_id: i64,
    pub wind: String,
    pub tide: String,
    pub rain: String,
    pub water_temp_c: Option<f64>,
    pub air_temp_c: Option<f64>,
    pub e_coli_count: f64,
    pub condition: String,
}

/// Curated features of a monitoring point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointFeature {
    pub point_id: i64,
    pub lat: f64,
    pub long: f64,
    pub balneary: String,
    pub reference: String,
    pub location: String,
    pub fresh_water: bool,
    pub drenage_beach: bool,
    pub drenage_point: bool,
}

/// Tables extracted from one yearly report
#[derive(Debug, Clone, Default)]
pub struct YearExtraction {
    pub year: Year,
    pub locations: Vec<LocationRecord>,
    pub measurements: Vec<RawMeasurement>,
}

/// All years unioned into two flat tables
#[derive(Debug, Clone, Default)]
pub struct UnionedTables {
    pub years: Vec<Year>,
    pub locations: Vec<LocationRecord>,
    pub measurements: Vec<RawMeasurement>,
}

/// Processing statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub years_requested: usize,
    pub years_fetched: usize,
    pub years_failed: usize,
    pub years_malformed: usize,
    /// Per-year fetch success, in year order
    pub fetch_status: Vec<(Year, bool)>,
    pub locations: usize,
    pub measurements: usize,
    pub rows_skipped: usize,
    pub rows_without_features: usize,
    pub total_rows: usize,
    pub output_path: PathBuf,
    pub fetch_time_ms: u128,
    pub reshape_time_ms: u128,
    pub processing_time_ms: u128,
}
