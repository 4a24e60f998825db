//! Remote source client for the balneability monitoring service.
//!
//! Issues the requests the pipeline needs (analyzed years, cities, locations
//! and the yearly historical report) and hands back raw payloads. Report
//! requests are retried with exponential backoff; a report that still fails
//! becomes a recorded per-year failure rather than an error.

use crate::config::PipelineConfig;
use crate::constants::{CITIES_PATH, LOCATIONS_PATH, REPORT_PATH, YEARS_PATH, YEAR_FIELD};
use crate::error::{BalneabilityError, Result};
use crate::models::{FetchResult, RawDocument, Year};
use reqwest::Client as HTTPClient;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

/// Source of yearly reports
///
/// The pipeline only talks to the service through this trait, so runs can
/// be driven from canned documents. Implementations are awaited on the
/// current task, so no `Send` bound is placed on the returned futures.
#[allow(async_fn_in_trait)]
pub trait ReportSource {
    /// Years that have analyses, ascending
    async fn list_years(&self) -> Result<Vec<Year>>;

    /// Report of one year, or the recorded reason it could not be fetched
    async fn fetch_year_report(&self, city_id: u32, point_filter: u32, year: Year) -> FetchResult;
}

/// HTTP client for the monitoring service
#[derive(Debug, Clone)]
pub struct ImaClient {
    http: HTTPClient,
    base_url: String,
    config: PipelineConfig,
}

impl ImaClient {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let http = HTTPClient::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config: config.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Municipalities known to the service
    pub async fn list_cities(&self) -> Result<Vec<Value>> {
        self.get_json_array(&self.url(CITIES_PATH)).await
    }

    /// Monitoring locations of one municipality
    pub async fn list_locations(&self, city_id: u32) -> Result<Vec<Value>> {
        let url = self.url(LOCATIONS_PATH);
        let response = self
            .http
            .post(&url)
            .form(&[("municipioID", city_id.to_string())])
            .send()
            .await
            .map_err(|e| unavailable(&url, e))?;
        read_json_array(&url, response).await
    }

    async fn get_json_array(&self, url: &str) -> Result<Vec<Value>> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| unavailable(url, e))?;
        read_json_array(url, response).await
    }

    /// One attempt at the report endpoint
    async fn request_report(&self, city_id: u32, point_filter: u32, year: Year) -> Result<String> {
        let url = self.url(REPORT_PATH);
        let response = self
            .http
            .post(&url)
            .form(&[
                ("municipioID", city_id.to_string()),
                ("localID", point_filter.to_string()),
                ("ano", year.to_string()),
                ("redirect", "true".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BalneabilityError::FetchFailed {
                year,
                reason: format!("status {}", status),
            });
        }

        Ok(response.text().await?)
    }
}

impl ReportSource for ImaClient {
    #[instrument(skip(self))]
    async fn list_years(&self) -> Result<Vec<Year>> {
        let url = self.url(YEARS_PATH);
        let entries = self.get_json_array(&url).await?;
        let years = parse_years(&entries).ok_or_else(|| BalneabilityError::RemoteUnavailable {
            endpoint: url.clone(),
            reason: format!("unexpected payload, expected objects with '{}'", YEAR_FIELD),
        })?;
        debug!("Service reports {} analyzed years", years.len());
        Ok(years)
    }

    #[instrument(skip(self))]
    async fn fetch_year_report(&self, city_id: u32, point_filter: u32, year: Year) -> FetchResult {
        let mut attempt = 0;
        loop {
            match self.request_report(city_id, point_filter, year).await {
                Ok(body) => {
                    debug!("Fetched report for {} ({} bytes)", year, body.len());
                    return FetchResult::success(RawDocument { year, body });
                }
                Err(e) if attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = self.config.backoff_for(attempt);
                    warn!(
                        "Report request for {} failed ({}), retry {}/{} in {:?}",
                        year, e, attempt, self.config.max_retries, delay
                    );
                    sleep(delay).await;
                }
                Err(e) => {
                    warn!("Giving up on report for {}: {}", year, e);
                    return FetchResult::failure(year, e.to_string());
                }
            }
        }
    }
}

fn unavailable(endpoint: &str, error: impl std::fmt::Display) -> BalneabilityError {
    BalneabilityError::RemoteUnavailable {
        endpoint: endpoint.to_string(),
        reason: error.to_string(),
    }
}

async fn read_json_array(url: &str, response: reqwest::Response) -> Result<Vec<Value>> {
    let status = response.status();
    if !status.is_success() {
        return Err(unavailable(url, format!("status {}", status)));
    }
    let body = response.text().await.map_err(|e| unavailable(url, e))?;
    let value: Value = serde_json::from_str(&body).map_err(|e| unavailable(url, e))?;
    match value {
        Value::Array(entries) => Ok(entries),
        _ => Err(unavailable(url, "expected a JSON array")),
    }
}

/// Extract the sorted, de-duplicated years from the years endpoint payload
///
/// The year may be published as a number or a numeric string.
pub fn parse_years(entries: &[Value]) -> Option<Vec<Year>> {
    let mut years = entries
        .iter()
        .map(|entry| match entry.get(YEAR_FIELD)? {
            Value::Number(n) => n.as_i64().and_then(|y| Year::try_from(y).ok()),
            Value::String(s) => s.trim().parse::<Year>().ok(),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    years.sort_unstable();
    years.dedup();
    Some(years)
}
