//! Reduction of fetch results into per-year extractions
//!
//! Pure function over the settled fetch results: successful documents are
//! reshaped, fetch failures and malformed reports are recorded separately so
//! diagnostics can tell them apart.

use crate::error::{BalneabilityError, Result};
use crate::extract::extract_year;
use crate::models::{FetchOutcome, FetchResult, Year, YearExtraction};

use tracing::warn;

/// Outcome of reshaping every fetched year
#[derive(Debug, Default)]
pub struct YearReduction {
    /// Extractions of the well-formed years, oldest first
    pub extractions: Vec<YearExtraction>,
    pub failed: Vec<(Year, String)>,
    pub malformed: Vec<(Year, String)>,
}

impl YearReduction {
    pub fn years_extracted(&self) -> Vec<Year> {
        self.extractions.iter().map(|e| e.year).collect()
    }
}

/// Reshape every successful document; skip failed and malformed years
pub fn process_fetch_results(mut results: Vec<FetchResult>) -> Result<YearReduction> {
    results.sort_by_key(|result| result.year);

    let mut reduction = YearReduction::default();
    for result in results {
        let year = result.year;
        match result.outcome {
            FetchOutcome::Failure { reason } => reduction.failed.push((year, reason)),
            FetchOutcome::Success(document) => match extract_year(&document) {
                Ok(extraction) => reduction.extractions.push(extraction),
                Err(BalneabilityError::MalformedReport { reason, .. }) => {
                    warn!(year, %reason, "Malformed report, year skipped");
                    reduction.malformed.push((year, reason));
                }
                Err(e) => return Err(e),
            },
        }
    }

    Ok(reduction)
}
