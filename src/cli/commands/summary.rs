//! Summary and chart commands over a written output file

use crate::cli::args::{ChartArgs, OutputFormat, SummaryArgs};
use crate::constants::OUTPUT_SEPARATOR;
use crate::summary::{chart_data, load_output};

use anyhow::{Context, Result};
use polars::prelude::{CsvWriter, SerWriter};

pub fn run_summary(args: SummaryArgs) -> Result<()> {
    let table = load_output(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let mut summary = args.table.compute(&table)?;

    match args.format {
        OutputFormat::Human => println!("{}", summary),
        OutputFormat::Csv => {
            CsvWriter::new(std::io::stdout())
                .include_header(true)
                .with_separator(OUTPUT_SEPARATOR)
                .finish(&mut summary)?;
        }
    }
    Ok(())
}

pub fn run_chart(args: ChartArgs) -> Result<()> {
    let table = load_output(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let chart = chart_data(&table, args.point_id, args.year.into())?;
    println!("{}", serde_json::to_string_pretty(&chart)?);
    Ok(())
}
