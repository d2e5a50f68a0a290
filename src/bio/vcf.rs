use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::CaduceusError;

/// Genome positions with known systematic sequencing or alignment
/// artifacts, loaded from a variant-call list. Edits at these positions
/// are masked out before divergence counting.
#[derive(Debug, Clone, Default)]
pub struct ProblematicSites {
    positions: HashSet<usize>,
}

impl ProblematicSites {
    /// Parse a VCF file. Header lines (starting with '#') are skipped;
    /// the POS column is 1-based and stored as 0-based reference
    /// coordinates to match alignment output.
    pub fn from_vcf<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let mut positions = HashSet::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split('\t');
            let _chrom = fields.next();
            let pos: usize = fields
                .next()
                .and_then(|p| p.parse().ok())
                .ok_or_else(|| {
                    CaduceusError::Format(format!(
                        "Bad POS field at line {} of {}",
                        line_no + 1,
                        path.display()
                    ))
                })?;
            if pos == 0 {
                return Err(CaduceusError::Format(format!(
                    "POS 0 at line {} of {} (VCF positions are 1-based)",
                    line_no + 1,
                    path.display()
                )));
            }
            positions.insert(pos - 1);
        }

        Ok(Self { positions })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn from_positions<I: IntoIterator<Item = usize>>(positions: I) -> Self {
        Self {
            positions: positions.into_iter().collect(),
        }
    }

    /// Whether a 0-based reference position is masked.
    pub fn contains(&self, pos: usize) -> bool {
        self.positions.contains(&pos)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
