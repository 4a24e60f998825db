//! Command-line argument definitions for the balneability tool
//!
//! Every pipeline setting has a flag and a `BALNEABILITY_` environment
//! variable fallback.

use crate::config::{PipelineConfig, RowPolicy};
use crate::constants::{ALL_POINTS, DEFAULT_BASE_URL, DEFAULT_CITY_ID, DEFAULT_SAMPLE_TIME};
use crate::error::{BalneabilityError, Result};
use crate::models::Year;
use crate::summary::SummaryTable;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CLI arguments for the balneability tool
///
/// Fetches the yearly beach water-quality reports of the state monitoring
/// service, reshapes them into one flat table joined with curated
/// monitoring-point features, and summarizes the result.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "balneability",
    version,
    about = "Fetch beach balneability reports and build a flat monitoring table",
    long_about = "Fetches the yearly historical balneability reports published by the \
                  monitoring service, reshapes their HTML tables into one measurement table, \
                  joins the curated monitoring-point features and writes a semicolon-delimited \
                  file. The summary and chart commands compute the aggregate tables and chart \
                  data of the dashboard."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable debug logging
    #[arg(short = 'v', long = "verbose", global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only show warnings and errors
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,
}

impl Args {
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Fetch every yearly report and write the joined table (main command)
    Fetch(FetchArgs),
    /// List the years that have analyses
    Years(ServiceArgs),
    /// List the municipalities known to the service
    Cities(ServiceArgs),
    /// List the monitoring locations of one municipality
    Locations(LocationsArgs),
    /// Print one aggregate table of a written output file
    Summary(SummaryArgs),
    /// Print the chart data of one monitoring point as JSON
    Chart(ChartArgs),
}

/// Connection settings shared by every command that talks to the service
#[derive(Debug, Clone, Parser)]
pub struct ServiceArgs {
    /// Base URL of the monitoring service
    #[arg(
        long = "base-url",
        value_name = "URL",
        env = "BALNEABILITY_BASE_URL",
        default_value = DEFAULT_BASE_URL
    )]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[arg(
        long = "timeout",
        value_name = "SECONDS",
        env = "BALNEABILITY_TIMEOUT",
        default_value_t = 30
    )]
    pub timeout_secs: u64,
}

impl ServiceArgs {
    pub fn to_config(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_base_url(self.base_url.clone())
            .with_request_timeout_secs(self.timeout_secs)
    }
}

/// Arguments for the fetch command
#[derive(Debug, Clone, Parser)]
pub struct FetchArgs {
    #[command(flatten)]
    pub service: ServiceArgs,

    /// Municipality id (2 = Florianópolis)
    #[arg(
        long = "city",
        value_name = "ID",
        env = "BALNEABILITY_CITY",
        default_value_t = DEFAULT_CITY_ID
    )]
    pub city_id: u32,

    /// Location filter sent with report requests (0 = all points)
    #[arg(
        long = "point-filter",
        value_name = "ID",
        env = "BALNEABILITY_POINT_FILTER",
        default_value_t = ALL_POINTS
    )]
    pub point_filter: u32,

    /// Years to fetch instead of every analyzed year (comma-separated)
    #[arg(
        long = "years",
        value_name = "LIST",
        value_delimiter = ',',
        env = "BALNEABILITY_YEARS"
    )]
    pub years: Vec<Year>,

    /// Maximum concurrent report requests
    #[arg(short = 'j', long = "workers", value_name = "COUNT", env = "BALNEABILITY_WORKERS")]
    pub workers: Option<usize>,

    /// Retries of a failed report request
    #[arg(
        long = "retries",
        value_name = "COUNT",
        env = "BALNEABILITY_RETRIES",
        default_value_t = 3
    )]
    pub retries: u32,

    /// Delay before the first retry in milliseconds, doubled on each retry
    #[arg(
        long = "backoff-ms",
        value_name = "MS",
        env = "BALNEABILITY_BACKOFF_MS",
        default_value_t = 500
    )]
    pub backoff_ms: u64,

    /// What to do with rows whose date, time or numbers do not parse (strict, skip)
    #[arg(
        long = "row-policy",
        value_name = "POLICY",
        env = "BALNEABILITY_ROW_POLICY",
        default_value = "strict"
    )]
    pub row_policy: RowPolicy,

    /// Sampling time used when a report row has no usable time
    #[arg(
        long = "default-time",
        value_name = "HH:MM:SS",
        env = "BALNEABILITY_DEFAULT_TIME",
        default_value = DEFAULT_SAMPLE_TIME
    )]
    pub default_time: String,

    /// Curated point feature file: a workbook (.xlsx, .ods, ...) or delimited text
    #[arg(
        short = 'f',
        long = "features",
        value_name = "FILE",
        env = "BALNEABILITY_FEATURES",
        default_value = "features_points.xlsx"
    )]
    pub features_path: PathBuf,
    /// Field delimiter of a delimited-text feature file
    /// Field delimiter of the feature file
    #[arg(
        long = "features-delimiter",
        value_name = "CHAR",
        env = "BALNEABILITY_FEATURES_DELIMITER",
        default_value_t = ','
    )]
    pub features_delimiter: char,

    /// Output file, replaced on every run
    #[arg(
        short = 'o',
        long = "output",
        value_name = "FILE",
        env = "BALNEABILITY_OUTPUT",
        default_value = "balneability.csv"
    )]
    pub output_path: PathBuf,
}

impl FetchArgs {
    /// Build and validate the pipeline configuration
    pub fn to_config(&self) -> Result<PipelineConfig> {
        if !self.features_delimiter.is_ascii() {
            return Err(BalneabilityError::Configuration {
                message: format!(
                    "Feature file delimiter '{}' must be a single ASCII character",
                    self.features_delimiter
                ),
            });
        }

        let mut config = self
            .service
            .to_config()
            .with_city_id(self.city_id)
            .with_retries(self.retries, self.backoff_ms)
            .with_row_policy(self.row_policy)
            .with_features(self.features_path.clone(), self.features_delimiter as u8)
            .with_output_path(self.output_path.clone());
        config.point_filter = self.point_filter;
        config.default_sample_time = self.default_time.clone();
        if !self.years.is_empty() {
            config = config.with_years(self.years.clone());
        }
        if let Some(workers) = self.workers {
            config = config.with_max_concurrent_fetches(workers);
        }

        config.validate()?;
        Ok(config)
    }
}

/// Arguments for the locations command
#[derive(Debug, Clone, Parser)]
pub struct LocationsArgs {
    #[command(flatten)]
    pub service: ServiceArgs,

    /// Municipality id
    #[arg(
        long = "city",
        value_name = "ID",
        env = "BALNEABILITY_CITY",
        default_value_t = DEFAULT_CITY_ID
    )]
    pub city_id: u32,
}

/// Output format of tabular results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Human,
    /// Semicolon-delimited text
    Csv,
}

/// Arguments for the summary command
#[derive(Debug, Clone, Parser)]
pub struct SummaryArgs {
    /// Output file written by the fetch command
    #[arg(
        short = 'i',
        long = "input",
        value_name = "FILE",
        env = "BALNEABILITY_OUTPUT",
        default_value = "balneability.csv"
    )]
    pub input: PathBuf,

    /// Aggregate table (point, rain, drainage, year, month, condition, describe)
    #[arg(short = 't', long = "table", value_name = "KIND", default_value = "point")]
    pub table: SummaryTable,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for the chart command
#[derive(Debug, Clone, Parser)]
pub struct ChartArgs {
    /// Output file written by the fetch command
    #[arg(
        short = 'i',
        long = "input",
        value_name = "FILE",
        env = "BALNEABILITY_OUTPUT",
        default_value = "balneability.csv"
    )]
    pub input: PathBuf,

    /// Monitoring point id
    #[arg(short = 'p', long = "point", value_name = "ID")]
    pub point_id: i64,

    /// Limit the chart to one year
    #[arg(short = 'y', long = "year", value_name = "YEAR")]
    pub year: Option<Year>,
}
