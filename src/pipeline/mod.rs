//! Pipeline orchestration.
//!
//! Runs one complete balneability refresh: resolve the years to request,
//! fetch every report concurrently, reshape the well-formed years in year
//! order, normalize and type the rows, join the curated point features and
//! write the output file. Nothing is written unless every stage succeeds.

pub mod fetch;
pub mod reduce;

#[cfg(test)]
pub mod tests;

use self::fetch::{ReportFetcher, fetch_status};
use self::reduce::process_fetch_results;

use crate::client::ReportSource;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::features::PointFeatureSource;
use crate::models::{ProcessingStats, Year};
use crate::normalize::{
    build_output_frame, dedupe_locations, join_features, normalize_measurements, reduce_years,
};
use crate::writer::CsvOutputWriter;

use colored::*;
use std::time::Instant;
use tracing::{debug, info};

/// Balneability pipeline over a report source and a feature repository
#[derive(Debug)]
pub struct BalneabilityPipeline<S, F> {
    source: S,
    features: F,
    config: PipelineConfig,
    fetcher: ReportFetcher,
    writer: CsvOutputWriter,
    show_progress: bool,
}

impl<S: ReportSource, F: PointFeatureSource> BalneabilityPipeline<S, F> {
    /// Create a pipeline, rejecting an unusable configuration
    pub fn new(source: S, features: F, config: PipelineConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            fetcher: ReportFetcher::new(
                config.city_id,
                config.point_filter,
                config.max_concurrent_fetches,
            ),
            writer: CsvOutputWriter::new(config.output_path.clone()),
            source,
            features,
            config,
            show_progress: true,
        })
    }

    /// Toggle progress bars and the printed run report
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self.fetcher = self.fetcher.with_progress(show_progress);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Years to request: the configured list, or whatever the service reports
    pub async fn resolve_years(&self) -> Result<Vec<Year>> {
        let mut years = match &self.config.years {
            Some(years) => years.clone(),
            None => self.source.list_years().await?,
        };
        years.sort_unstable();
        years.dedup();
        Ok(years)
    }

    /// Main processing entry point
    pub async fn process(&self) -> Result<ProcessingStats> {
        let start_time = Instant::now();
        self.report_start();

        // Features are read wholesale before any request goes out
        let features = self.features.load()?;
        debug!("{} point features available", features.len());

        // Step 1: Resolve years and fetch reports
        let fetch_start = Instant::now();
        let years = self.resolve_years().await?;
        self.phase(&format!("Fetching {} yearly reports...", years.len()));
        let results = self.fetcher.fetch_all(&self.source, &years).await;
        let status = fetch_status(&results);
        let fetch_time_ms = fetch_start.elapsed().as_millis();
        self.report_fetch(&status, fetch_time_ms);

        // Step 2: Reshape and normalize
        let reshape_start = Instant::now();
        self.phase("Reshaping reports...");
        let reduction = process_fetch_results(results)?;
        let years_malformed = reduction.malformed.len();
        let tables = reduce_years(reduction.extractions);
        let locations = dedupe_locations(tables.locations);
        let (records, rows_skipped) = normalize_measurements(
            &tables.measurements,
            &self.config.default_sample_time,
            self.config.row_policy,
        )?;

        // Step 3: Join point features
        let joined = join_features(&records, &features);
        let rows_without_features = records.len() - joined.len();
        if rows_without_features > 0 {
            info!(
                rows = rows_without_features,
                "Measurements dropped for points without features"
            );
        }
        let frame = build_output_frame(&joined)?;
        let reshape_time_ms = reshape_start.elapsed().as_millis();

        // Step 4: Write output
        let total_rows = self.writer.write(&frame)?;

        let stats = ProcessingStats {
            years_requested: years.len(),
            years_fetched: status.iter().filter(|(_, ok)| *ok).count(),
            years_failed: status.iter().filter(|(_, ok)| !*ok).count(),
            years_malformed,
            fetch_status: status,
            locations: locations.len(),
            measurements: records.len(),
            rows_skipped,
            rows_without_features,
            total_rows,
            output_path: self.writer.output_path().to_path_buf(),
            fetch_time_ms,
            reshape_time_ms,
            processing_time_ms: start_time.elapsed().as_millis(),
        };
        self.report_summary(&stats);
        Ok(stats)
    }

    fn report_start(&self) {
        if !self.show_progress {
            return;
        }
        println!("{}", "Starting balneability refresh".bright_green().bold());
        println!("  {} {}", "Source:".bright_cyan(), self.config.base_url);
        println!("  {} {}", "City:".bright_cyan(), self.config.city_id);
        println!(
            "  {} {}",
            "Output:".bright_cyan(),
            self.writer.output_path().display()
        );
    }

    fn phase(&self, message: &str) {
        if self.show_progress {
            println!("\n{}", message.bright_yellow());
        }
    }

    fn report_fetch(&self, status: &[(Year, bool)], fetch_time_ms: u128) {
        if !self.show_progress {
            return;
        }
        let flags: Vec<String> = status
            .iter()
            .map(|(year, ok)| {
                let flag = format!("{}:{}", year, ok);
                if *ok {
                    flag.bright_green().to_string()
                } else {
                    flag.bright_red().to_string()
                }
            })
            .collect();
        println!("  {} [{}]", "Status:".bright_cyan(), flags.join(", "));
        println!(
            "  {} {}ms",
            "Fetch time:".bright_cyan(),
            fetch_time_ms.to_string().bright_white()
        );
    }

    fn report_summary(&self, stats: &ProcessingStats) {
        if !self.show_progress {
            return;
        }
        println!("\n{}", "Processing Summary".bright_green().bold());
        println!(
            "  {} {}ms",
            "Reshape time:".bright_cyan(),
            stats.reshape_time_ms.to_string().bright_white()
        );
        println!(
            "  {} {}ms",
            "Time elapsed:".bright_cyan(),
            stats.processing_time_ms.to_string().bright_white()
        );
        println!(
            "  {} {}/{}",
            "Years fetched:".bright_cyan(),
            stats.years_fetched.to_string().bright_white(),
            stats.years_requested
        );
        if stats.years_failed > 0 {
            println!(
                "  {} {}",
                "Years failed:".bright_red(),
                stats.years_failed.to_string().bright_red().bold()
            );
        }
        if stats.years_malformed > 0 {
            println!(
                "  {} {}",
                "Years malformed:".bright_red(),
                stats.years_malformed.to_string().bright_red().bold()
            );
        }
        if stats.rows_skipped > 0 {
            println!(
                "  {} {}",
                "Rows skipped:".bright_yellow(),
                stats.rows_skipped.to_string().bright_yellow()
            );
        }
        println!(
            "  {} {}",
            "Monitoring points:".bright_cyan(),
            stats.locations.to_string().bright_white()
        );
        println!(
            "  {} {}",
            "Total rows:".bright_cyan(),
            stats.total_rows.to_string().bright_white().bold()
        );
    }
}
