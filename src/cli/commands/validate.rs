use anyhow::Context;
use clap::Args;
use colored::*;
use std::path::PathBuf;

use crate::bio::fasta::load_reference;
use crate::bio::vcf::ProblematicSites;
use crate::core::lineage::LineageTable;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Lineage assignment CSV produced by the classifier
    #[arg(value_name = "LINEAGES")]
    pub lineages: PathBuf,

    /// Reference genome FASTA
    #[arg(long = "ref", value_name = "FILE")]
    pub reference: PathBuf,

    /// VCF of problematic genome sites
    #[arg(long, value_name = "FILE")]
    pub vcf: Option<PathBuf>,
}

/// Parse every side input up front, without touching the aligner or the
/// archive. Catches a wrong or stale lineage file before a multi-hour run.
pub fn run(args: ValidateArgs) -> anyhow::Result<()> {
    let lineages = LineageTable::from_csv(&args.lineages)
        .with_context(|| format!("Failed to load lineage table {}", args.lineages.display()))?;
    println!(
        "{} lineage table: {} assignments",
        "ok".green().bold(),
        lineages.len()
    );

    let (name, sequence) = load_reference(&args.reference)
        .with_context(|| format!("Failed to load reference {}", args.reference.display()))?;
    println!(
        "{} reference genome: {} ({} nt)",
        "ok".green().bold(),
        name,
        sequence.len()
    );

    if let Some(path) = &args.vcf {
        let sites = ProblematicSites::from_vcf(path)
            .with_context(|| format!("Failed to load problematic sites {}", path.display()))?;
        println!(
            "{} problematic sites: {} masked positions",
            "ok".green().bold(),
            sites.len()
        );
    }

    Ok(())
}
