use anyhow::Context;
use chrono::NaiveDate;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::bio::fasta::load_reference;
use crate::bio::vcf::ProblematicSites;
use crate::core::config::{load_config, PipelineConfig};
use crate::core::lineage::LineageTable;
use crate::pipeline::Pipeline;
use crate::report;
use crate::tools::minimap2::Minimap2Aligner;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Genome archive: FASTA with name|accession|date headers, optionally gzipped
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Lineage assignment CSV produced by the classifier
    #[arg(value_name = "LINEAGES")]
    pub lineages: PathBuf,

    /// Reference genome FASTA
    #[arg(long = "ref", value_name = "FILE")]
    pub reference: PathBuf,

    /// VCF of problematic genome sites to mask from divergence counts
    #[arg(long, value_name = "FILE")]
    pub vcf: Option<PathBuf>,

    /// Minimum genome length (nt)
    #[arg(long)]
    pub minlen: Option<usize>,

    /// Earliest plausible sample collection date (ISO format)
    #[arg(long)]
    pub mindate: Option<NaiveDate>,

    /// Maximum tolerated number of missing bases per genome
    #[arg(long)]
    pub misstol: Option<usize>,

    /// Upper-tail significance for the Poisson outlier cutoff
    #[arg(long)]
    pub poisson_cutoff: Option<f64>,

    /// Molecular clock rate, substitutions per site per year
    #[arg(long)]
    pub clock: Option<f64>,

    /// Records per aligner invocation
    #[arg(long)]
    pub batchsize: Option<usize>,

    /// Path to the minimap2 binary
    #[arg(long)]
    pub mm_bin: Option<String>,

    /// minimap2 worker threads (0 = all available)
    #[arg(long)]
    pub mm_threads: Option<usize>,

    /// Output path for features grouped by lineage
    #[arg(short = 'o', long, default_value = "by_lineage.json")]
    pub by_lineage: PathBuf,

    /// Output path for the run-stats JSON
    #[arg(long)]
    pub stats: Option<PathBuf>,

    /// TOML config file; command-line flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl RunArgs {
    /// Precedence: built-in defaults, then config file, then flags.
    fn resolve_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        if let Some(minlen) = self.minlen {
            config.filters.min_length = minlen;
        }
        if let Some(mindate) = self.mindate {
            config.filters.min_date = mindate;
        }
        if let Some(misstol) = self.misstol {
            config.filters.max_missing = misstol;
        }
        if let Some(cutoff) = self.poisson_cutoff {
            config.clock.cutoff = cutoff;
        }
        if let Some(rate) = self.clock {
            config.clock.rate = rate;
        }
        if let Some(batchsize) = self.batchsize {
            config.alignment.batch_size = batchsize;
        }
        if let Some(binary) = &self.mm_bin {
            config.alignment.binary = binary.clone();
        }
        if let Some(threads) = self.mm_threads {
            config.alignment.threads = threads;
        }

        if config.alignment.batch_size == 0 {
            anyhow::bail!("batch size must be positive");
        }
        if !(0.0..1.0).contains(&config.clock.cutoff) {
            anyhow::bail!("poisson cutoff must be in [0, 1)");
        }
        Ok(config)
    }
}

pub fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = args.resolve_config()?;

    let lineages = LineageTable::from_csv(&args.lineages)
        .with_context(|| format!("Failed to load lineage table {}", args.lineages.display()))?;
    info!(assignments = lineages.len(), "lineage table loaded");

    let (ref_name, ref_seq) = load_reference(&args.reference)
        .with_context(|| format!("Failed to load reference {}", args.reference.display()))?;
    info!(name = %ref_name, length = ref_seq.len(), "reference genome loaded");

    let sites = match &args.vcf {
        Some(path) => {
            let sites = ProblematicSites::from_vcf(path)
                .with_context(|| format!("Failed to load problematic sites {}", path.display()))?;
            info!(sites = sites.len(), "problematic sites loaded");
            sites
        }
        None => ProblematicSites::empty(),
    };

    let aligner = Minimap2Aligner::new(
        config.alignment.binary.as_str(),
        &args.reference,
        config.alignment.threads,
    )?;

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}").expect("valid progress template"),
    );
    progress.enable_steady_tick(Duration::from_millis(120));
    progress.set_message("Aligning batches...");

    let pipeline = Pipeline::new(&config, &lineages, &aligner, ref_seq.len(), sites)
        .with_progress(|batches, kept| {
            progress.set_message(format!("Batch {}: {} records kept", batches, kept));
        });

    let (partition, stats) = pipeline.run(&args.archive)?;
    progress.finish_and_clear();

    report::write_by_lineage(&args.by_lineage, &partition)
        .with_context(|| format!("Failed to write {}", args.by_lineage.display()))?;
    info!(path = %args.by_lineage.display(), "by-lineage features written");

    if let Some(stats_path) = &args.stats {
        report::write_stats(stats_path, &stats)
            .with_context(|| format!("Failed to write {}", stats_path.display()))?;
    }

    report::print_summary(&stats);
    Ok(())
}
