//! Balneability Library
//!
//! Fetches the yearly beach water-quality reports published by the state
//! monitoring service and turns them into one flat, typed table.
//!
//! This library provides tools for:
//! - Requesting analyzed years, municipalities, locations and yearly reports
//! - Reshaping the paired location/measurement HTML tables of each report
//! - Normalizing timestamps, temperatures and counts into typed records
//! - Joining curated monitoring-point features and writing the output file
//! - Computing the aggregate tables and chart data of the dashboard

pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod extract;
pub mod features;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod summary;
pub mod writer;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use client::{ImaClient, ReportSource};
pub use config::{PipelineConfig, RowPolicy};
pub use error::{BalneabilityError, Result};
pub use features::{
    CsvFeatureFile, FeatureFile, InMemoryFeatures, PointFeatureSource, SpreadsheetFeatureFile,
};
pub use models::{
    FetchResult, LocationRecord, MeasurementRecord, PointFeature, ProcessingStats, RawDocument,
    Year,
};
pub use pipeline::BalneabilityPipeline;
pub use summary::{ChartData, SummaryTable, YearFilter, chart_data, load_output};
pub use writer::CsvOutputWriter;
