//! Command implementations for the balneability CLI
//!
//! Each command lives in its own module; `run` dispatches on the parsed
//! arguments.

pub mod catalog;
pub mod fetch;
pub mod shared;
pub mod summary;

use crate::cli::args::{Args, Commands};
use anyhow::Result;

/// Main command runner
pub async fn run(args: Args) -> Result<()> {
    shared::setup_logging(&args)?;

    let Some(command) = args.command else {
        return Ok(());
    };
    let quiet = args.quiet;

    match command {
        Commands::Fetch(fetch_args) => fetch::run_fetch(fetch_args, quiet).await.map(|_| ()),
        Commands::Years(service) => catalog::run_years(service).await,
        Commands::Cities(service) => catalog::run_cities(service).await,
        Commands::Locations(locations) => catalog::run_locations(locations).await,
        Commands::Summary(summary_args) => summary::run_summary(summary_args),
        Commands::Chart(chart_args) => summary::run_chart(chart_args),
    }
}
