use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One entry from the raw genome archive, exactly as read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSequenceRecord {
    pub header: String,
    pub sequence: String,
}

/// A validated genome record ready for batching and alignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub virus_name: String,
    pub accession_id: String,
    pub sequence: String,
    pub collection_date: NaiveDate,
    pub lineage: String,
}

/// A single difference relative to the reference genome.
///
/// Positions are 0-based reference coordinates. Insertions are anchored at
/// the reference position immediately following the inserted bases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Edit {
    Sub { pos: usize, alt: String },
    Ins { pos: usize, seq: String },
    Del { pos: usize, len: usize },
}

impl Edit {
    /// Reference coordinate this edit is anchored at.
    pub fn position(&self) -> usize {
        match self {
            Edit::Sub { pos, .. } => *pos,
            Edit::Ins { pos, .. } => *pos,
            Edit::Del { pos, .. } => *pos,
        }
    }
}

/// Compact alignment-derived representation of one genome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub accession_id: String,
    pub virus_name: String,
    pub lineage: String,
    pub collection_date: NaiveDate,
    pub divergence: Vec<Edit>,
    /// Fraction of reference positions covered by unambiguous calls.
    pub coverage: f64,
}

impl FeatureRecord {
    pub fn edit_count(&self) -> usize {
        self.divergence.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_position() {
        assert_eq!(
            Edit::Sub {
                pos: 240,
                alt: "T".into()
            }
            .position(),
            240
        );
        assert_eq!(
            Edit::Ins {
                pos: 11287,
                seq: "GAT".into()
            }
            .position(),
            11287
        );
        assert_eq!(Edit::Del { pos: 21990, len: 3 }.position(), 21990);
    }

    #[test]
    fn test_edit_serializes_tagged() {
        let edit = Edit::Del { pos: 5, len: 2 };
        let json = serde_json::to_string(&edit).unwrap();
        assert_eq!(json, r#"{"type":"del","pos":5,"len":2}"#);
    }
}
