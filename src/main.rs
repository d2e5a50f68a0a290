use caduceus::cli::{Cli, Commands};
use clap::Parser;
use colored::*;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // CADUCEUS_LOG overrides the default level; -v/-vv override both
    let log_level = match cli.verbose {
        0 => std::env::var("CADUCEUS_LOG").unwrap_or_else(|_| "info".to_string()),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);

        let exit_code = match e.downcast_ref::<caduceus::CaduceusError>() {
            Some(caduceus::CaduceusError::Config(_)) => 2,
            Some(caduceus::CaduceusError::Io(_)) => 3,
            Some(caduceus::CaduceusError::Format(_))
            | Some(caduceus::CaduceusError::HeaderFormat { .. }) => 4,
            Some(caduceus::CaduceusError::Schema { .. })
            | Some(caduceus::CaduceusError::MissingLineage { .. }) => 5,
            Some(caduceus::CaduceusError::Alignment(_)) => 6,
            _ => 1,
        };
        process::exit(exit_code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => caduceus::cli::commands::run::run(args),
        Commands::Validate(args) => caduceus::cli::commands::validate::run(args),
    }
}
