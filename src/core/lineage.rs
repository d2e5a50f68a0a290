use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::{CaduceusError, Result};

/// Exact column schema the lineage side-input must carry. Anything else
/// almost certainly means the wrong file was paired with this run, so the
/// loader aborts instead of guessing.
pub const EXPECTED_COLUMNS: [&str; 6] = [
    "taxon",
    "lineage",
    "probability",
    "pangoLEARN_version",
    "status",
    "note",
];

#[derive(Debug, Deserialize)]
struct LineageRow {
    taxon: String,
    lineage: String,
    #[allow(dead_code)]
    probability: String,
    #[allow(dead_code)]
    #[serde(rename = "pangoLEARN_version")]
    pangolearn_version: String,
    #[allow(dead_code)]
    status: String,
    #[allow(dead_code)]
    note: String,
}

/// Immutable mapping from sequence identifier to lineage label, built once
/// from the classifier's CSV output.
///
/// Keys are the full, unparsed FASTA headers exactly as they appear in the
/// archive (the classifier is run on the same archive, so its `taxon`
/// column carries the same strings). Duplicate taxa are resolved last
/// write wins. Empty lineage labels are retained as empty strings.
#[derive(Debug, Clone, Default)]
pub struct LineageTable {
    map: HashMap<String, String>,
}

impl LineageTable {
    /// Load and validate the lineage CSV. Fails with a schema error before
    /// reading any data row if the header does not match
    /// [`EXPECTED_COLUMNS`] exactly.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)
            .map_err(|e| CaduceusError::Format(format!("Failed to open lineage CSV: {}", e)))?;

        let headers = reader
            .headers()
            .map_err(|e| CaduceusError::Format(format!("Failed to read lineage CSV: {}", e)))?;
        if headers.iter().collect::<Vec<_>>() != EXPECTED_COLUMNS {
            return Err(CaduceusError::Schema {
                path: path.display().to_string(),
                expected: EXPECTED_COLUMNS.join(","),
                found: headers.iter().collect::<Vec<_>>().join(","),
            });
        }

        let mut map = HashMap::new();
        for row in reader.deserialize() {
            let row: LineageRow = row.map_err(|e| {
                CaduceusError::Format(format!("Bad row in {}: {}", path.display(), e))
            })?;
            map.insert(row.taxon, row.lineage);
        }

        Ok(Self { map })
    }

    #[cfg(test)]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            map: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Look up the lineage label for a raw header string.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.map.get(header).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
