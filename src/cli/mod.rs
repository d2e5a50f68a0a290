pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "caduceus",
    version,
    about = "Viral genome ingestion and lineage feature extraction",
    long_about = "Caduceus converts raw viral genome archives into validated, aligned, \
                  lineage-partitioned feature sets ready for phylogenetic tree building: \
                  streaming FASTA ingestion, metadata and lineage validation, batched \
                  minimap2 alignment, molecular-clock outlier filtering, and per-lineage \
                  partitioning."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full ingestion and feature-extraction pipeline
    Run(commands::run::RunArgs),

    /// Validate side inputs without invoking the aligner
    Validate(commands::validate::ValidateArgs),
}
