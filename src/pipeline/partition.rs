use indexmap::IndexMap;

use crate::core::record::FeatureRecord;

/// Terminal pipeline output: lineage label to the ordered records assigned
/// to it. Ownership passes entirely to downstream tree-building stages.
pub type LineagePartition = IndexMap<String, Vec<FeatureRecord>>;

/// Accumulates surviving feature records into per-lineage groups,
/// preserving arrival order within each group and first-seen order of the
/// groups themselves.
#[derive(Debug, Default)]
pub struct LineagePartitioner {
    groups: LineagePartition,
}

impl LineagePartitioner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: FeatureRecord) {
        self.groups
            .entry(record.lineage.clone())
            .or_default()
            .push(record);
    }

    pub fn extend<I: IntoIterator<Item = FeatureRecord>>(&mut self, records: I) {
        for record in records {
            self.push(record);
        }
    }

    pub fn record_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn lineage_count(&self) -> usize {
        self.groups.len()
    }

    pub fn finish(self) -> LineagePartition {
        self.groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::Edit;
    use chrono::NaiveDate;

    fn record(accession: &str, lineage: &str) -> FeatureRecord {
        FeatureRecord {
            accession_id: accession.to_string(),
            virus_name: format!("virus/{}", accession),
            lineage: lineage.to_string(),
            collection_date: NaiveDate::from_ymd_opt(2020, 5, 1).unwrap(),
            divergence: vec![Edit::Del { pos: 1, len: 3 }],
            coverage: 0.99,
        }
    }

    #[test]
    fn test_every_record_lands_in_exactly_one_group() {
        let mut partitioner = LineagePartitioner::new();
        let records = vec![
            record("EPI_ISL_1", "B.1"),
            record("EPI_ISL_2", "B.1.1.7"),
            record("EPI_ISL_3", "B.1"),
            record("EPI_ISL_4", "A.2"),
        ];
        partitioner.extend(records.clone());

        assert_eq!(partitioner.record_count(), records.len());
        let partition = partitioner.finish();
        let total: usize = partition.values().map(Vec::len).sum();
        assert_eq!(total, records.len());

        for rec in &records {
            let groups_holding: usize = partition
                .values()
                .filter(|group| group.iter().any(|r| r.accession_id == rec.accession_id))
                .count();
            assert_eq!(groups_holding, 1, "{} not in exactly one group", rec.accession_id);
        }
    }

    #[test]
    fn test_order_preserved_within_group() {
        let mut partitioner = LineagePartitioner::new();
        partitioner.push(record("EPI_ISL_1", "B.1"));
        partitioner.push(record("EPI_ISL_9", "A.2"));
        partitioner.push(record("EPI_ISL_2", "B.1"));
        partitioner.push(record("EPI_ISL_3", "B.1"));

        let partition = partitioner.finish();
        let ids: Vec<&str> = partition["B.1"]
            .iter()
            .map(|r| r.accession_id.as_str())
            .collect();
        assert_eq!(ids, ["EPI_ISL_1", "EPI_ISL_2", "EPI_ISL_3"]);
    }

    #[test]
    fn test_groups_iterate_in_first_seen_order() {
        let mut partitioner = LineagePartitioner::new();
        partitioner.push(record("EPI_ISL_1", "B.1.1.7"));
        partitioner.push(record("EPI_ISL_2", "A.2"));
        partitioner.push(record("EPI_ISL_3", "B.1.1.7"));

        let partition = partitioner.finish();
        let lineages: Vec<&str> = partition.keys().map(String::as_str).collect();
        assert_eq!(lineages, ["B.1.1.7", "A.2"]);
    }
}
