//! Configuration management and validation.
//!
//! Provides the pipeline configuration: which service and municipality to
//! query, how many report requests may be in flight, request timeout and
//! retry policy, how row-level normalization failures are handled, and where
//! the curated feature file and the output file live.

use crate::constants::{ALL_POINTS, DEFAULT_BASE_URL, DEFAULT_CITY_ID, DEFAULT_SAMPLE_TIME};
use crate::error::{BalneabilityError, Result};
use crate::models::Year;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// What to do with a measurement row whose timestamp or numeric fields do
/// not parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RowPolicy {
    /// Abort the run on the first invalid row
    #[default]
    Strict,
    /// Drop the row, log it and count it in the statistics
    Skip,
}

impl std::str::FromStr for RowPolicy {
    type Err = BalneabilityError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "strict" => Ok(RowPolicy::Strict),
            "skip" => Ok(RowPolicy::Skip),
            other => Err(BalneabilityError::Configuration {
                message: format!("Unknown row policy '{}', expected strict or skip", other),
            }),
        }
    }
}

/// Global configuration for a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Base URL of the monitoring service
    pub base_url: String,

    /// Municipality whose reports are fetched
    pub city_id: u32,

    /// Location filter sent with report requests (0 = all points)
    pub point_filter: u32,

    /// Explicit years to fetch instead of asking the service
    pub years: Option<Vec<Year>>,

    /// Maximum concurrent report requests
    pub max_concurrent_fetches: usize,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Additional attempts after a failed report request
    pub max_retries: u32,

    /// Delay before the first retry, doubled on each further attempt
    pub initial_backoff_ms: u64,

    /// Row-level failure handling
    pub row_policy: RowPolicy,

    /// Sampling time substituted for empty or corrupt report times
    pub default_sample_time: String,

    /// Curated point feature file
    pub features_path: PathBuf,

    /// Field delimiter of a delimited-text feature file
    pub features_delimiter: u8,

    /// Output file, overwritten on every run
    pub output_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            city_id: DEFAULT_CITY_ID,
            point_filter: ALL_POINTS,
            years: None,
            max_concurrent_fetches: num_cpus::get().clamp(1, 8),
            request_timeout_secs: 30,
            max_retries: 3,
            initial_backoff_ms: 500,
            row_policy: RowPolicy::Strict,
            default_sample_time: DEFAULT_SAMPLE_TIME.to_string(),
            features_path: PathBuf::from("features_points.xlsx"),
            features_delimiter: b',',
            output_path: PathBuf::from("balneability.csv"),
        }
    }
}

impl PipelineConfig {
    /// Use a different service base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Query a different municipality
    pub fn with_city_id(mut self, city_id: u32) -> Self {
        self.city_id = city_id;
        self
    }

    /// Fetch exactly these years
    pub fn with_years(mut self, years: Vec<Year>) -> Self {
        self.years = Some(years);
        self
    }

    /// Set maximum concurrent report requests
    pub fn with_max_concurrent_fetches(mut self, max: usize) -> Self {
        self.max_concurrent_fetches = max;
        self
    }

    /// Set per-request timeout
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Set retry policy for report requests
    pub fn with_retries(mut self, max_retries: u32, initial_backoff_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.initial_backoff_ms = initial_backoff_ms;
        self
    }

    /// Set row-level failure handling
    pub fn with_row_policy(mut self, policy: RowPolicy) -> Self {
        self.row_policy = policy;
        self
    }

    /// Set feature file location and delimiter
    pub fn with_features(mut self, path: impl Into<PathBuf>, delimiter: u8) -> Self {
        self.features_path = path.into();
        self.features_delimiter = delimiter;
        self
    }

    /// Set output file location
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Backoff before retry number `attempt` (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.initial_backoff_ms.saturating_mul(factor))
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(BalneabilityError::Configuration {
                message: "Base URL must not be empty".to_string(),
            });
        }
        if self.max_concurrent_fetches == 0 {
            return Err(BalneabilityError::Configuration {
                message: "At least one concurrent fetch is required".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(BalneabilityError::Configuration {
                message: "Request timeout must be greater than zero".to_string(),
            });
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(BalneabilityError::Configuration {
                message: "Output path must not be empty".to_string(),
            });
        }
        if chrono::NaiveTime::parse_from_str(&self.default_sample_time, "%H:%M:%S").is_err() {
            return Err(BalneabilityError::Configuration {
                message: format!(
                    "Default sample time '{}' is not HH:MM:SS",
                    self.default_sample_time
                ),
            });
        }
        if matches!(&self.years, Some(years) if years.is_empty()) {
            return Err(BalneabilityError::Configuration {
                message: "Explicit year list must not be empty".to_string(),
            });
        }

        debug!(
            "Configuration valid: city {}, {} concurrent fetches, {}s timeout, {} retries",
            self.city_id, self.max_concurrent_fetches, self.request_timeout_secs, self.max_retries
        );
        Ok(())
    }
}
