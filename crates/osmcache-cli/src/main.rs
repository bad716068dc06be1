//! osmcache CLI - Command-line interface
//!
//! Drives a project's OSM cache through download, validation, queries and
//! export from a terminal.

mod cli;
mod commands;
mod config_loader;
mod errors;
mod interactive;
mod output;
mod output_types;
mod progress;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use errors::CliError;

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Create async runtime
    let runtime = tokio::runtime::Runtime::new()?;

    // Execute the command
    let result = runtime.block_on(async { commands::execute(cli).await });

    if let Err(error) = result {
        match error.downcast_ref::<CliError>() {
            Some(cli_error) => {
                cli_error.display();
                std::process::exit(1);
            }
            None => return Err(error),
        }
    }

    Ok(())
}
