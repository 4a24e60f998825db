//! Error handling for balneability pipeline operations.
//!
//! Distinguishes run-fatal failures (years endpoint unreachable, output not
//! writable) from per-year failures (fetch status, malformed report) and
//! row-level normalization failures.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BalneabilityError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote endpoint unavailable: {endpoint} - {reason}")]
    RemoteUnavailable { endpoint: String, reason: String },

    #[error("Fetch failed for year {year}: {reason}")]
    FetchFailed { year: i32, reason: String },

    #[error("Malformed report for year {year}: {reason}")]
    MalformedReport { year: i32, reason: String },

    #[error("Invalid timestamp: date '{date}', time '{time}'")]
    InvalidTimestamp { date: String, time: String },

    #[error("Invalid numeric value in column {column}: '{value}'")]
    InvalidNumericField { column: String, value: String },

    #[error("Invalid feature file {path}: {reason}")]
    FeatureFile { path: PathBuf, reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Failed to write output file {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Processing interrupted: {reason}")]
    Interrupted { reason: String },
}

impl BalneabilityError {
    /// Row-level failures that a lenient row policy may skip
    pub fn is_row_level(&self) -> bool {
        matches!(
            self,
            BalneabilityError::InvalidTimestamp { .. }
                | BalneabilityError::InvalidNumericField { .. }
        )
    }

    pub fn malformed(year: i32, reason: impl Into<String>) -> Self {
        BalneabilityError::MalformedReport {
            year,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BalneabilityError>;
