use chrono::NaiveDate;

use crate::core::lineage::LineageTable;
use crate::core::record::{CanonicalRecord, RawSequenceRecord};
use crate::pipeline::SkipReason;
use crate::{CaduceusError, Result};

/// Outcome of normalizing one raw record: either a validated record or a
/// counted skip. Fatal conditions surface as errors, not skips.
#[derive(Debug)]
pub enum Normalized {
    Record(CanonicalRecord),
    Skipped(SkipReason),
}

/// Fuses a raw (header, sequence) pair with its lineage entry into a
/// canonical record, applying length, date, and lineage validation.
pub struct Normalizer<'a> {
    lineages: &'a LineageTable,
    min_length: usize,
    min_date: NaiveDate,
    today: NaiveDate,
}

impl<'a> Normalizer<'a> {
    pub fn new(lineages: &'a LineageTable, min_length: usize, min_date: NaiveDate) -> Self {
        Self {
            lineages,
            min_length,
            min_date,
            today: crate::utils::today(),
        }
    }

    /// Pin "today" for reproducible date-range tests.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Length and date rejections are expected noise in raw feeds and skip
    /// the record. A malformed header is an error, and a missing lineage
    /// assignment is fatal for the whole run: it means the lineage file
    /// does not belong to this archive.
    pub fn normalize(&self, raw: RawSequenceRecord) -> Result<Normalized> {
        if raw.sequence.len() < self.min_length {
            return Ok(Normalized::Skipped(SkipReason::TooShort));
        }

        let fields: Vec<&str> = raw.header.split('|').collect();
        if fields.len() != 3 {
            return Err(CaduceusError::HeaderFormat {
                header: raw.header.clone(),
                fields: fields.len(),
            });
        }
        let (virus_name, accession_id, coldate) = (fields[0], fields[1], fields[2]);

        // A full calendar date has exactly two internal separators;
        // year-only and year-month dates are useless for clock filtering.
        if coldate.matches('-').count() != 2 {
            return Ok(Normalized::Skipped(SkipReason::IncompleteDate));
        }
        let collection_date = match crate::utils::parse_iso_date(coldate) {
            Some(d) => d,
            None => return Ok(Normalized::Skipped(SkipReason::DateOutOfRange)),
        };
        if collection_date < self.min_date || collection_date > self.today {
            return Ok(Normalized::Skipped(SkipReason::DateOutOfRange));
        }

        // Lookup is keyed by the raw, unparsed header: the lineage
        // classifier is run over the same archive, so its taxon column
        // carries identical strings.
        let lineage = match self.lineages.get(&raw.header) {
            Some(l) => l.to_string(),
            None => {
                return Err(CaduceusError::MissingLineage {
                    header: raw.header.clone(),
                })
            }
        };

        Ok(Normalized::Record(CanonicalRecord {
            virus_name: virus_name.to_string(),
            accession_id: accession_id.to_string(),
            collection_date,
            lineage,
            sequence: raw.sequence,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "hCoV-19/Canada/Qc-L00240569/2020|EPI_ISL_465679|2020-03-27";

    fn table() -> LineageTable {
        LineageTable::from_pairs([(HEADER, "B.1.147")])
    }

    fn normalizer(table: &LineageTable) -> Normalizer<'_> {
        Normalizer::new(table, 8, NaiveDate::from_ymd_opt(2019, 12, 1).unwrap())
            .with_today(NaiveDate::from_ymd_opt(2021, 6, 1).unwrap())
    }

    fn raw(header: &str, sequence: &str) -> RawSequenceRecord {
        RawSequenceRecord {
            header: header.to_string(),
            sequence: sequence.to_string(),
        }
    }

    #[test]
    fn test_valid_record_is_canonicalized() {
        let table = table();
        let result = normalizer(&table)
            .normalize(raw(HEADER, "ACGTACGTACGT"))
            .unwrap();
        match result {
            Normalized::Record(rec) => {
                assert_eq!(rec.virus_name, "hCoV-19/Canada/Qc-L00240569/2020");
                assert_eq!(rec.accession_id, "EPI_ISL_465679");
                assert_eq!(
                    rec.collection_date,
                    NaiveDate::from_ymd_opt(2020, 3, 27).unwrap()
                );
                assert_eq!(rec.lineage, "B.1.147");
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_short_sequence_skipped_before_header_parse() {
        let table = table();
        // Header is malformed, but the length screen fires first
        let result = normalizer(&table).normalize(raw("garbage", "ACGT")).unwrap();
        assert!(matches!(result, Normalized::Skipped(SkipReason::TooShort)));
    }

    #[test]
    fn test_wrong_field_count_is_an_error() {
        let table = table();
        let err = normalizer(&table)
            .normalize(raw("only|two", "ACGTACGTACGT"))
            .unwrap_err();
        assert!(matches!(
            err,
            CaduceusError::HeaderFormat { fields: 2, .. }
        ));
    }

    #[test]
    fn test_two_part_date_skipped() {
        let table = LineageTable::from_pairs([("x|EPI_ISL_1|2020-03", "B.1")]);
        let result = normalizer(&table)
            .normalize(raw("x|EPI_ISL_1|2020-03", "ACGTACGTACGT"))
            .unwrap();
        assert!(matches!(
            result,
            Normalized::Skipped(SkipReason::IncompleteDate)
        ));
    }

    #[test]
    fn test_date_range_boundaries() {
        let cases = [
            ("2019-12-01", true),  // exactly mindate: accepted
            ("2019-11-30", false), // one day before: rejected
            ("2021-06-01", true),  // today: accepted
            ("2021-06-02", false), // future: rejected
        ];
        for (date, accepted) in cases {
            let header = format!("x|EPI_ISL_1|{}", date);
            let table = LineageTable::from_pairs([(header.clone(), "B.1".to_string())]);
            let result = normalizer(&table)
                .normalize(raw(&header, "ACGTACGTACGT"))
                .unwrap();
            match result {
                Normalized::Record(_) => assert!(accepted, "{} should be rejected", date),
                Normalized::Skipped(SkipReason::DateOutOfRange) => {
                    assert!(!accepted, "{} should be accepted", date)
                }
                other => panic!("unexpected outcome for {}: {:?}", date, other),
            }
        }
    }

    #[test]
    fn test_missing_lineage_is_fatal() {
        let table = LineageTable::from_pairs([("other|EPI_ISL_2|2020-01-01", "B.1")]);
        let err = normalizer(&table)
            .normalize(raw(HEADER, "ACGTACGTACGT"))
            .unwrap_err();
        assert!(matches!(err, CaduceusError::MissingLineage { .. }));
    }

    #[test]
    fn test_empty_lineage_is_not_missing() {
        // Empty labels are retained by the table loader and pass through
        let table = LineageTable::from_pairs([(HEADER, "")]);
        let result = normalizer(&table)
            .normalize(raw(HEADER, "ACGTACGTACGT"))
            .unwrap();
        match result {
            Normalized::Record(rec) => assert_eq!(rec.lineage, ""),
            other => panic!("expected record, got {:?}", other),
        }
    }
}
