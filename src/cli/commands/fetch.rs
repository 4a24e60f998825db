//! Fetch command: run the whole pipeline against the live service

use crate::cli::args::FetchArgs;
use crate::client::ImaClient;
use crate::features::FeatureFile;
use crate::models::ProcessingStats;
use crate::pipeline::BalneabilityPipeline;

use anyhow::{Context, Result};
use colored::*;
use tracing::info;

pub async fn run_fetch(args: FetchArgs, quiet: bool) -> Result<ProcessingStats> {
    let config = args.to_config().context("Invalid fetch settings")?;
    info!(
        city = config.city_id,
        workers = config.max_concurrent_fetches,
        "Starting fetch"
    );

    let client = ImaClient::new(&config).context("Failed to build HTTP client")?;
    let features = FeatureFile::open(config.features_path.clone(), config.features_delimiter);
    let pipeline = BalneabilityPipeline::new(client, features, config)?.with_progress(!quiet);

    let stats = pipeline.process().await?;

    if !quiet {
        println!(
            "\n{} {}",
            "Output written to".bright_green(),
            stats.output_path.display().to_string().bright_white().bold()
        );
    }
    Ok(stats)
}
