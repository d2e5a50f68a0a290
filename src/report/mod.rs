use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use colored::*;
use serde::Serialize;

use crate::pipeline::{LineagePartition, RunStats};
use crate::CaduceusError;

/// Summary written alongside the by-lineage export so downstream
/// dashboards can report dataset freshness and size.
#[derive(Debug, Serialize)]
struct DatasetStats<'a> {
    lastupdate: String,
    noseqs: u64,
    #[serde(flatten)]
    run: &'a RunStats,
}

/// Serialize the terminal partition as lineage label to record list.
/// Each record exposes accession, name, date, divergence, and coverage.
pub fn write_by_lineage<P: AsRef<Path>>(
    path: P,
    partition: &LineagePartition,
) -> crate::Result<()> {
    let writer = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer(writer, partition)
        .map_err(|e| CaduceusError::Format(format!("Failed to write by-lineage JSON: {}", e)))
}

pub fn write_stats<P: AsRef<Path>>(path: P, stats: &RunStats) -> crate::Result<()> {
    let payload = DatasetStats {
        lastupdate: crate::utils::today().format("%Y-%m-%d").to_string(),
        noseqs: stats.retained,
        run: stats,
    };
    let writer = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer_pretty(writer, &payload)
        .map_err(|e| CaduceusError::Format(format!("Failed to write stats JSON: {}", e)))
}

/// Operator-facing end-of-run summary.
pub fn render_summary(stats: &RunStats) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    writeln!(out, "Records read:        {}", stats.records_read).unwrap();
    writeln!(out, "  too short:         {}", stats.too_short).unwrap();
    writeln!(out, "  incomplete date:   {}", stats.incomplete_date).unwrap();
    writeln!(out, "  date out of range: {}", stats.date_out_of_range).unwrap();
    writeln!(out, "  excess missing:    {}", stats.excess_missing).unwrap();
    writeln!(out, "  clock outliers:    {}", stats.outliers).unwrap();
    writeln!(out, "Skipped total:       {}", stats.skipped_total()).unwrap();
    writeln!(out, "Retained:            {}", stats.retained).unwrap();
    writeln!(out, "Lineages:            {}", stats.lineages).unwrap();
    out
}

pub fn print_summary(stats: &RunStats) {
    println!();
    println!("{}", "Pipeline summary".bold());
    print!("{}", render_summary(stats));
    if stats.skipped_total() > 0 {
        println!(
            "{}",
            format!(
                "{} of {} records dropped by quality screens",
                stats.skipped_total(),
                stats.records_read
            )
            .yellow()
        );
    }
}
