//! Service catalog commands: analyzed years, cities and locations

use crate::cli::args::{LocationsArgs, ServiceArgs};
use crate::client::{ImaClient, ReportSource};

use anyhow::Result;
use serde_json::Value;

fn print_json(entries: &[Value]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(entries)?);
    Ok(())
}

pub async fn run_years(args: ServiceArgs) -> Result<()> {
    let client = ImaClient::new(&args.to_config())?;
    for year in client.list_years().await? {
        println!("{}", year);
    }
    Ok(())
}

pub async fn run_cities(args: ServiceArgs) -> Result<()> {
    let client = ImaClient::new(&args.to_config())?;
    print_json(&client.list_cities().await?)
}

pub async fn run_locations(args: LocationsArgs) -> Result<()> {
    let client = ImaClient::new(&args.service.to_config())?;
    print_json(&client.list_locations(args.city_id).await?)
}
