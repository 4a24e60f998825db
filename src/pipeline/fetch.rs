//! Concurrent fetch stage
//!
//! Requests every year's report through a `ReportSource` with a bounded
//! number of requests in flight. Failed years come back as recorded
//! failures; nothing here aborts the run.

use crate::client::ReportSource;
use crate::models::{FetchOutcome, FetchResult, Year};

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}";

/// Fetcher for the yearly reports of one city
#[derive(Debug, Clone)]
pub struct ReportFetcher {
    city_id: u32,
    point_filter: u32,
    max_concurrent: usize,
    show_progress: bool,
}

impl ReportFetcher {
    pub fn new(city_id: u32, point_filter: u32, max_concurrent: usize) -> Self {
        Self {
            city_id,
            point_filter,
            max_concurrent: max_concurrent.max(1),
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar().template(PROGRESS_TEMPLATE) {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message("Fetching reports");
        pb
    }

    /// Fetch every year; results are returned in completion order
    pub async fn fetch_all<S: ReportSource>(&self, source: &S, years: &[Year]) -> Vec<FetchResult> {
        let pb = self.progress_bar(years.len());

        let results = stream::iter(years.iter().copied())
            .map(|year| {
                let pb = &pb;
                async move {
                    let result = source
                        .fetch_year_report(self.city_id, self.point_filter, year)
                        .await;
                    match &result.outcome {
                        FetchOutcome::Success(document) => {
                            info!(year, bytes = document.body.len(), "Report fetched");
                        }
                        FetchOutcome::Failure { reason } => {
                            warn!(year, %reason, "Report fetch failed, year skipped");
                        }
                    }
                    pb.inc(1);
                    result
                }
            })
            .buffer_unordered(self.max_concurrent)
            .collect::<Vec<_>>()
            .await;

        pb.finish_with_message("All reports requested");
        results
    }
}

/// Per-year success flags, oldest year first
pub fn fetch_status(results: &[FetchResult]) -> Vec<(Year, bool)> {
    let mut status: Vec<(Year, bool)> = results
        .iter()
        .map(|result| (result.year, result.is_success()))
        .collect();
    status.sort_by_key(|(year, _)| *year);
    status
}
