use crate::core::record::{CanonicalRecord, Edit, FeatureRecord};
use crate::{CaduceusError, Result};

/// One query's parsed alignment against the reference.
///
/// `query` is the position of the record within the submitted batch
/// (batches are written with positional query names so aligner output can
/// be joined back regardless of what the raw headers contain).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedRow {
    pub query: usize,
    pub edits: Vec<Edit>,
    /// Uncovered or ambiguous reference intervals, half-open, 0-based
    pub missing: Vec<(usize, usize)>,
}

impl AlignedRow {
    pub fn missing_total(&self) -> usize {
        self.missing.iter().map(|(start, end)| end - start).sum()
    }
}

/// Batch-level alignment capability.
///
/// Implementations take one batch plus the configured reference and return
/// one parsed row per aligned record, or a batch-level failure. A batch
/// with any unalignable or unparseable member fails whole: a partially
/// aligned batch has no valid shared coordinate system.
pub trait Aligner {
    fn align(&self, batch: &[CanonicalRecord]) -> Result<Vec<AlignedRow>>;
}

/// Reduces each aligned batch member to its compact feature form.
pub struct FeatureExtractor<'a, A: Aligner> {
    aligner: &'a A,
    ref_len: usize,
    max_missing: usize,
}

impl<'a, A: Aligner> FeatureExtractor<'a, A> {
    pub fn new(aligner: &'a A, ref_len: usize, max_missing: usize) -> Self {
        Self {
            aligner,
            ref_len,
            max_missing,
        }
    }

    /// Align one batch and convert each member to a [`FeatureRecord`].
    /// Returns the surviving features plus the count of records dropped
    /// for exceeding the missing-data tolerance.
    pub fn extract(&self, batch: Vec<CanonicalRecord>) -> Result<(Vec<FeatureRecord>, u64)> {
        let rows = self.aligner.align(&batch)?;

        let mut by_query: Vec<Option<AlignedRow>> = vec![None; batch.len()];
        for row in rows {
            if row.query >= batch.len() {
                return Err(CaduceusError::Alignment(format!(
                    "Aligner returned unknown query index {} for a batch of {}",
                    row.query,
                    batch.len()
                )));
            }
            // First row per query wins; supplementary alignments are ignored
            let query = row.query;
            if by_query[query].is_none() {
                by_query[query] = Some(row);
            }
        }

        let mut features = Vec::with_capacity(batch.len());
        let mut excess_missing = 0u64;

        for (record, row) in batch.into_iter().zip(by_query.into_iter()) {
            let row = row.ok_or_else(|| {
                CaduceusError::Alignment(format!(
                    "No alignment produced for record '{}'",
                    record.accession_id
                ))
            })?;

            let missing = row.missing_total();
            if missing > self.max_missing {
                excess_missing += 1;
                continue;
            }

            let coverage = 1.0 - missing as f64 / self.ref_len as f64;
            features.push(FeatureRecord {
                accession_id: record.accession_id,
                virus_name: record.virus_name,
                lineage: record.lineage,
                collection_date: record.collection_date,
                divergence: row.edits,
                coverage,
            });
        }

        Ok((features, excess_missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    struct FixedAligner {
        rows: Vec<AlignedRow>,
    }

    impl Aligner for FixedAligner {
        fn align(&self, _batch: &[CanonicalRecord]) -> Result<Vec<AlignedRow>> {
            Ok(self.rows.clone())
        }
    }

    fn record(accession: &str) -> CanonicalRecord {
        CanonicalRecord {
            virus_name: format!("virus/{}", accession),
            accession_id: accession.to_string(),
            sequence: "ACGT".repeat(100),
            collection_date: NaiveDate::from_ymd_opt(2020, 5, 1).unwrap(),
            lineage: "B.1".to_string(),
        }
    }

    #[test]
    fn test_features_carry_metadata_and_coverage() {
        let aligner = FixedAligner {
            rows: vec![AlignedRow {
                query: 0,
                edits: vec![Edit::Sub {
                    pos: 10,
                    alt: "T".into(),
                }],
                missing: vec![(0, 50), (950, 1000)],
            }],
        };
        let extractor = FeatureExtractor::new(&aligner, 1000, 300);
        let (features, dropped) = extractor.extract(vec![record("EPI_ISL_1")]).unwrap();

        assert_eq!(dropped, 0);
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].accession_id, "EPI_ISL_1");
        assert_eq!(features[0].lineage, "B.1");
        assert_eq!(features[0].divergence.len(), 1);
        assert!((features[0].coverage - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_excess_missing_is_dropped_not_fatal() {
        let aligner = FixedAligner {
            rows: vec![
                AlignedRow {
                    query: 0,
                    edits: vec![],
                    missing: vec![(0, 400)],
                },
                AlignedRow {
                    query: 1,
                    edits: vec![],
                    missing: vec![],
                },
            ],
        };
        let extractor = FeatureExtractor::new(&aligner, 1000, 300);
        let (features, dropped) = extractor
            .extract(vec![record("EPI_ISL_1"), record("EPI_ISL_2")])
            .unwrap();

        assert_eq!(dropped, 1);
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].accession_id, "EPI_ISL_2");
    }

    #[test]
    fn test_unaligned_member_fails_the_batch() {
        let aligner = FixedAligner {
            rows: vec![AlignedRow {
                query: 0,
                edits: vec![],
                missing: vec![],
            }],
        };
        let extractor = FeatureExtractor::new(&aligner, 1000, 300);
        let err = extractor
            .extract(vec![record("EPI_ISL_1"), record("EPI_ISL_2")])
            .unwrap_err();
        match err {
            CaduceusError::Alignment(msg) => assert!(msg.contains("EPI_ISL_2")),
            other => panic!("expected alignment error, got {:?}", other),
        }
    }
}
