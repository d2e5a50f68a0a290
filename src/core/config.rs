use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub filters: FilterConfig,
    pub clock: ClockConfig,
    pub alignment: AlignmentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Minimum genome length (nt)
    pub min_length: usize,
    /// Earliest plausible sample collection date
    pub min_date: NaiveDate,
    /// Maximum tolerated number of missing bases per genome
    pub max_missing: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Molecular clock rate, substitutions per site per year
    pub rate: f64,
    /// Upper-tail significance level for the Poisson outlier cutoff
    pub cutoff: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentConfig {
    /// Path or name of the external aligner binary
    pub binary: String,
    /// Worker threads passed to the aligner (0 = all available)
    pub threads: usize,
    /// Records per aligner invocation
    pub batch_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            filters: FilterConfig {
                min_length: 29000,
                min_date: NaiveDate::from_ymd_opt(2019, 12, 1).unwrap(),
                max_missing: 300,
            },
            clock: ClockConfig {
                rate: 8e-4,
                cutoff: 0.001,
            },
            alignment: AlignmentConfig {
                binary: "minimap2".to_string(),
                threads: 8,
                batch_size: 500,
            },
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig, crate::CaduceusError> {
    let contents = std::fs::read_to_string(path)?;
    let config: PipelineConfig = toml::from_str(&contents)
        .map_err(|e| crate::CaduceusError::Config(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}
