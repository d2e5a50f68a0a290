pub mod bio;
pub mod cli;
pub mod core;
pub mod pipeline;
pub mod report;
pub mod tools;
pub mod utils;

pub use crate::core::lineage::LineageTable;
pub use crate::pipeline::{Pipeline, RunStats};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaduceusError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Malformed record header '{header}': expected 3 pipe-delimited fields, found {fields}")]
    HeaderFormat { header: String, fields: usize },

    #[error("Lineage file schema mismatch in {path}: expected columns [{expected}], found [{found}]")]
    Schema {
        path: String,
        expected: String,
        found: String,
    },

    #[error("No lineage assignment for record '{header}'")]
    MissingLineage { header: String },

    #[error("Alignment error: {0}")]
    Alignment(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CaduceusError>;
