pub mod batch;
pub mod extract;
pub mod filter;
pub mod normalize;
pub mod partition;

pub use extract::{AlignedRow, Aligner, FeatureExtractor};
pub use filter::OutlierFilter;
pub use normalize::{Normalized, Normalizer};
pub use partition::{LineagePartition, LineagePartitioner};

use std::path::Path;

use serde::Serialize;

use crate::bio::fasta::FastaReader;
use crate::bio::vcf::ProblematicSites;
use crate::core::config::PipelineConfig;
use crate::core::lineage::LineageTable;
use crate::core::record::{CanonicalRecord, RawSequenceRecord};
use crate::pipeline::batch::batched;
use crate::Result;

/// Why a record was dropped. Skips are expected, high-frequency noise in
/// raw feeds; they are counted per reason, not logged per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    TooShort,
    IncompleteDate,
    DateOutOfRange,
    ExcessMissing,
    Outlier,
}

/// Per-run drop accounting, reported to the operator at end of run and
/// serialized alongside the by-lineage output.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub records_read: u64,
    pub too_short: u64,
    pub incomplete_date: u64,
    pub date_out_of_range: u64,
    pub excess_missing: u64,
    pub outliers: u64,
    pub retained: u64,
    pub lineages: u64,
}

impl RunStats {
    pub fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::TooShort => self.too_short += 1,
            SkipReason::IncompleteDate => self.incomplete_date += 1,
            SkipReason::DateOutOfRange => self.date_out_of_range += 1,
            SkipReason::ExcessMissing => self.excess_missing += 1,
            SkipReason::Outlier => self.outliers += 1,
        }
    }

    pub fn skipped_total(&self) -> u64 {
        self.too_short
            + self.incomplete_date
            + self.date_out_of_range
            + self.excess_missing
            + self.outliers
    }
}

/// The staged ingestion pipeline: read, normalize, batch, align and
/// extract, filter, partition. Single-threaded and single-pass; memory is
/// bounded by one batch plus the lineage table and the accumulating
/// partition.
pub struct Pipeline<'a, A: Aligner> {
    config: &'a PipelineConfig,
    lineages: &'a LineageTable,
    aligner: &'a A,
    ref_len: usize,
    filter: OutlierFilter,
    progress: Option<Box<dyn Fn(u64, usize) + 'a>>,
}

impl<'a, A: Aligner> Pipeline<'a, A> {
    pub fn new(
        config: &'a PipelineConfig,
        lineages: &'a LineageTable,
        aligner: &'a A,
        ref_len: usize,
        sites: ProblematicSites,
    ) -> Self {
        let filter = OutlierFilter::new(
            config.filters.min_date,
            config.clock.rate,
            ref_len,
            config.clock.cutoff,
            sites,
        );
        Self {
            config,
            lineages,
            aligner,
            ref_len,
            filter,
            progress: None,
        }
    }

    /// Called after each processed batch with (batches done, records kept).
    pub fn with_progress<F: Fn(u64, usize) + 'a>(mut self, callback: F) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Run the full pipeline over a genome archive on disk.
    pub fn run<P: AsRef<Path>>(&self, archive: P) -> Result<(LineagePartition, RunStats)> {
        let reader = FastaReader::from_path(archive)?;
        self.process(reader)
    }

    /// Drive the staged pipeline over a raw record stream. Fatal errors
    /// abort immediately; skip-level rejections are counted in the
    /// returned stats.
    pub fn process<I>(&self, records: I) -> Result<(LineagePartition, RunStats)>
    where
        I: Iterator<Item = Result<RawSequenceRecord>>,
    {
        let normalizer = Normalizer::new(
            self.lineages,
            self.config.filters.min_length,
            self.config.filters.min_date,
        );
        let extractor =
            FeatureExtractor::new(self.aligner, self.ref_len, self.config.filters.max_missing);

        let mut stats = RunStats::default();
        let mut partitioner = LineagePartitioner::new();
        let mut excess_missing = 0u64;
        let mut outliers = 0u64;
        let mut batches_done = 0u64;

        {
            let stats = &mut stats;
            let canonical = records.filter_map(|raw| match raw {
                Err(e) => Some(Err(e)),
                Ok(raw) => {
                    stats.records_read += 1;
                    match normalizer.normalize(raw) {
                        Err(e) => Some(Err(e)),
                        Ok(Normalized::Record(record)) => Some(Ok(record)),
                        Ok(Normalized::Skipped(reason)) => {
                            stats.record_skip(reason);
                            None
                        }
                    }
                }
            });

            for batch in batched(canonical, self.config.alignment.batch_size) {
                let batch: Vec<CanonicalRecord> = batch.into_iter().collect::<Result<_>>()?;
                let (features, dropped) = extractor.extract(batch)?;
                excess_missing += dropped;

                let (survivors, rejected) = self.filter.apply(features);
                outliers += rejected;
                partitioner.extend(survivors);

                batches_done += 1;
                if let Some(callback) = &self.progress {
                    callback(batches_done, partitioner.record_count());
                }
            }
        }

        stats.excess_missing = excess_missing;
        stats.outliers = outliers;
        stats.retained = partitioner.record_count() as u64;
        stats.lineages = partitioner.lineage_count() as u64;

        tracing::info!(
            read = stats.records_read,
            skipped = stats.skipped_total(),
            retained = stats.retained,
            lineages = stats.lineages,
            "pipeline complete"
        );

        Ok((partitioner.finish(), stats))
    }
}
