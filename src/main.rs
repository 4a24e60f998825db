use balneability::BalneabilityError;
use balneability::cli::{args::Args, commands};
use clap::{CommandFactory, Parser};
use std::process;

fn main() {
    let args = Args::parse();

    // Without a subcommand, show help instead of doing anything
    if args.command.is_none() {
        if let Err(e) = Args::command().print_help() {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
        println!();
        process::exit(0);
    }

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.block_on(async {
        tokio::select! {
            result = commands::run(args) => result,
            signal = tokio::signal::ctrl_c() => {
                eprintln!("\nReceived CTRL+C, shutting down...");
                let reason = match signal {
                    Ok(()) => "interrupted by user".to_string(),
                    Err(e) => format!("signal handler failed: {}", e),
                };
                Err(BalneabilityError::Interrupted { reason }.into())
            }
        }
    });

    if let Err(error) = result {
        eprintln!("Error: {:#}", error);
        process::exit(1);
    }
}
