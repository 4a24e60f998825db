//! Scenario tests for the pipeline module
//!
//! Runs the whole pipeline against an in-memory report source and in-memory
//! point features, writing into a scratch directory.

pub mod join_and_schema;

use crate::client::ReportSource;
use crate::config::PipelineConfig;
use crate::error::{BalneabilityError, Result};
use crate::features::InMemoryFeatures;
use crate::models::{FetchResult, PointFeature, RawDocument, Year};
use crate::pipeline::BalneabilityPipeline;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

pub const NAVIGATION: &str =
    "<table><tr><td>Relatório histórico de balneabilidade</td></tr></table>";

/// Canned report source
#[derive(Debug, Default)]
pub struct FakeSource {
    years: Option<Vec<Year>>,
    reports: HashMap<Year, std::result::Result<String, String>>,
    /// Later years answer faster, so completion order is reversed
    reverse_completion: bool,
    requested: Mutex<Vec<Year>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self {
            years: Some(Vec::new()),
            ..Default::default()
        }
    }

    /// Source whose years endpoint is down
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn with_report(mut self, year: Year, body: String) -> Self {
        self.add_year(year);
        self.reports.insert(year, Ok(body));
        self
    }

    pub fn with_failure(mut self, year: Year, reason: &str) -> Self {
        self.add_year(year);
        self.reports.insert(year, Err(reason.to_string()));
        self
    }

    pub fn with_reverse_completion(mut self) -> Self {
        self.reverse_completion = true;
        self
    }

    fn add_year(&mut self, year: Year) {
        if let Some(years) = self.years.as_mut() {
            years.push(year);
        }
    }

    pub fn requested(&self) -> Vec<Year> {
        let mut requested = self.requested.lock().unwrap().clone();
        requested.sort_unstable();
        requested
    }
}

impl ReportSource for FakeSource {
    async fn list_years(&self) -> Result<Vec<Year>> {
        self.years
            .clone()
            .ok_or_else(|| BalneabilityError::RemoteUnavailable {
                endpoint: "fake://years".to_string(),
                reason: "connection refused".to_string(),
            })
    }

    async fn fetch_year_report(
        &self,
        _city_id: u32,
        _point_filter: u32,
        year: Year,
    ) -> FetchResult {
        self.requested.lock().unwrap().push(year);
        if self.reverse_completion {
            let delay = (2100 - year).max(0) as u64 * 5;
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        match self.reports.get(&year) {
            Some(Ok(body)) => FetchResult::success(RawDocument {
                year,
                body: body.clone(),
            }),
            Some(Err(reason)) => FetchResult::failure(year, reason.clone()),
            None => FetchResult::failure(year, "status 404"),
        }
    }
}

pub fn detail_table(point: i64, beach: &str) -> String {
    format!(
        "<table>\
         <tr><td>Município: FLORIANÓPOLIS</td><td>Balneário: {}</td></tr>\
         <tr><td>Ponto de Coleta: Ponto {}</td><td>Localização: Em frente ao acesso {}</td></tr>\
         </table>",
        beach, point, point
    )
}

/// Measurement table; each row is `|`-separated cells in report column order
pub fn measurement_table(rows: &[&str]) -> String {
    let mut html = String::from(
        "<table><tr><th>Data</th><th>Hora</th><th>Vento</th><th>Maré</th><th>Chuva</th>\
         <th>Agua (Cº)</th><th>Ar (Cº)</th><th>E.Coli NMP*/100ml</th><th>Condição</th></tr>",
    );
    for row in rows {
        html.push_str("<tr>");
        for cell in row.split('|') {
            html.push_str(&format!("<td>{}</td>", cell));
        }
        html.push_str("</tr>");
    }
    html.push_str("</table>");
    html
}

/// Full yearly report for the given points and their rows
pub fn report(points: &[(i64, Vec<String>)]) -> String {
    let mut body = format!("<html><body>{}", NAVIGATION);
    for (point, rows) in points {
        let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
        body.push_str(&detail_table(*point, "JURERÊ"));
        body.push_str(&measurement_table(&rows));
    }
    body.push_str("</body></html>");
    body
}

/// `count` well-formed rows sampled on consecutive days of January
pub fn rows(year: Year, count: usize) -> Vec<String> {
    (1..=count)
        .map(|day| {
            format!(
                "{}-01-{:02}|08:15:00|NE|Enchente|Ausente|21 Cº|24Cº|{}|PRÓPRIA",
                year,
                day,
                day * 100
            )
        })
        .collect()
}

pub fn feature(point_id: i64) -> PointFeature {
    PointFeature {
        point_id,
        lat: -27.43 - point_id as f64 / 100.0,
        long: -48.50,
        balneary: "jurerê".to_string(),
        reference: format!("acesso {}", point_id),
        location: "praia".to_string(),
        fresh_water: false,
        drenage_beach: point_id % 2 == 0,
        drenage_point: false,
    }
}

pub fn features(point_ids: &[i64]) -> InMemoryFeatures {
    InMemoryFeatures::new(point_ids.iter().copied().map(feature).collect())
}

pub fn output_path(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("balneability.csv")
}

pub fn test_config(temp_dir: &TempDir) -> PipelineConfig {
    PipelineConfig::default()
        .with_base_url("http://fake")
        .with_output_path(output_path(temp_dir))
        .with_max_concurrent_fetches(4)
        .with_retries(0, 1)
}

pub fn pipeline(
    source: FakeSource,
    features: InMemoryFeatures,
    config: PipelineConfig,
) -> BalneabilityPipeline<FakeSource, InMemoryFeatures> {
    BalneabilityPipeline::new(source, features, config)
        .unwrap()
        .with_progress(false)
}

/// Data lines of a written output file, split into fields
pub fn read_rows(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let content = std::fs::read_to_string(path).unwrap();
    let mut lines = content.lines();
    let header = lines
        .next()
        .unwrap()
        .split(';')
        .map(|field| field.trim_matches('"').to_string())
        .collect();
    let rows = lines
        .map(|line| line.split(';').map(str::to_string).collect())
        .collect();
    (header, rows)
}
