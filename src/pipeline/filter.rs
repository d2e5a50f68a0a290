use chrono::NaiveDate;

use crate::bio::vcf::ProblematicSites;
use crate::core::record::FeatureRecord;
use crate::utils::stats::poisson_quantile;

/// Molecular-clock outlier filter.
///
/// Masks edits at known-problematic genome sites, then rejects records
/// whose remaining edit count exceeds the upper-tail Poisson cutoff for
/// the expected divergence accumulated since the baseline date. Rejected
/// records are presumed sequencing artifacts or misassigned dates, not
/// analysis errors.
pub struct OutlierFilter {
    origin: NaiveDate,
    sites: ProblematicSites,
    /// Per-day edit-count cutoffs, indexed by days since `origin`
    cutoffs: Vec<u64>,
}

impl OutlierFilter {
    /// `clock_rate` is in substitutions per site per year; the expected
    /// genome-wide count for a record collected `t` days after `origin` is
    /// `clock_rate * ref_len * t / 365.25`. `significance` is the
    /// upper-tail mass beyond the cutoff (0.001 = 99.9% quantile).
    pub fn new(
        origin: NaiveDate,
        clock_rate: f64,
        ref_len: usize,
        significance: f64,
        sites: ProblematicSites,
    ) -> Self {
        let rate_per_day = clock_rate * ref_len as f64 / 365.25;
        let horizon = (crate::utils::today() - origin).num_days().max(0) as usize + 2;
        let quantile = 1.0 - significance;

        let cutoffs = (0..horizon)
            .map(|day| poisson_quantile(rate_per_day * day as f64, quantile))
            .collect();

        Self {
            origin,
            sites,
            cutoffs,
        }
    }

    fn cutoff_for(&self, date: NaiveDate) -> u64 {
        let days = (date - self.origin).num_days().max(0) as usize;
        let idx = days.min(self.cutoffs.len() - 1);
        self.cutoffs[idx]
    }

    /// Remove edits at masked genome positions. Masking can only shrink
    /// the divergence list.
    pub fn mask(&self, record: &mut FeatureRecord) {
        record
            .divergence
            .retain(|edit| !self.sites.contains(edit.position()));
    }

    /// Whether a (already masked) record is within the clock cutoff.
    pub fn is_within_cutoff(&self, record: &FeatureRecord) -> bool {
        record.edit_count() as u64 <= self.cutoff_for(record.collection_date)
    }

    /// Mask and filter a stage's worth of records, preserving order.
    /// Returns the survivors and the number of outliers rejected.
    pub fn apply(&self, features: Vec<FeatureRecord>) -> (Vec<FeatureRecord>, u64) {
        let mut survivors = Vec::with_capacity(features.len());
        let mut outliers = 0u64;

        for mut record in features {
            self.mask(&mut record);
            if self.is_within_cutoff(&record) {
                survivors.push(record);
            } else {
                outliers += 1;
            }
        }

        (survivors, outliers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::Edit;

    fn origin() -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 12, 1).unwrap()
    }

    fn record(date: NaiveDate, positions: &[usize]) -> FeatureRecord {
        FeatureRecord {
            accession_id: "EPI_ISL_1".to_string(),
            virus_name: "virus/1".to_string(),
            lineage: "B.1".to_string(),
            collection_date: date,
            divergence: positions
                .iter()
                .map(|&pos| Edit::Sub {
                    pos,
                    alt: "T".into(),
                })
                .collect(),
            coverage: 1.0,
        }
    }

    fn filter_with_sites(sites: ProblematicSites) -> OutlierFilter {
        // 8e-4 subs/site/year over a 29903 nt genome ~= 0.0655/day
        OutlierFilter::new(origin(), 8e-4, 29903, 0.001, sites)
    }

    #[test]
    fn test_masking_cannot_increase_edit_count() {
        let filter = filter_with_sites(ProblematicSites::from_positions([100, 200]));
        let mut masked = record(origin() + chrono::Days::new(100), &[50, 100, 200, 300]);
        let raw_count = masked.edit_count();
        filter.mask(&mut masked);
        assert!(masked.edit_count() <= raw_count);
        assert_eq!(masked.edit_count(), 2);
        assert!(masked
            .divergence
            .iter()
            .all(|e| e.position() != 100 && e.position() != 200));
    }

    #[test]
    fn test_outlier_is_rejected() {
        let filter = filter_with_sites(ProblematicSites::empty());
        // At ~30 days the expectation is ~2 edits; 40 is far beyond the
        // 99.9% quantile
        let date = origin() + chrono::Days::new(30);
        let positions: Vec<usize> = (0..40).map(|i| i * 10).collect();
        let (survivors, outliers) = filter.apply(vec![record(date, &positions)]);
        assert!(survivors.is_empty());
        assert_eq!(outliers, 1);
    }

    #[test]
    fn test_plausible_record_is_retained() {
        let filter = filter_with_sites(ProblematicSites::empty());
        let date = origin() + chrono::Days::new(365);
        // ~24 expected edits after a year; 20 is well within the cutoff
        let positions: Vec<usize> = (0..20).map(|i| i * 10).collect();
        let (survivors, outliers) = filter.apply(vec![record(date, &positions)]);
        assert_eq!(survivors.len(), 1);
        assert_eq!(outliers, 0);
    }

    #[test]
    fn test_masking_can_rescue_a_record() {
        // All of the apparent divergence sits at known-problematic sites
        let positions: Vec<usize> = (0..40).map(|i| i * 10).collect();
        let filter = filter_with_sites(ProblematicSites::from_positions(
            positions.iter().copied().collect::<Vec<_>>(),
        ));
        let date = origin() + chrono::Days::new(30);
        let (survivors, outliers) = filter.apply(vec![record(date, &positions)]);
        assert_eq!(survivors.len(), 1);
        assert_eq!(outliers, 0);
        assert_eq!(survivors[0].edit_count(), 0);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let filter = filter_with_sites(ProblematicSites::from_positions([100]));
        let date = origin() + chrono::Days::new(200);
        let records = vec![
            record(date, &[50, 100, 150]),
            record(date, &(0..40).map(|i| i * 7).collect::<Vec<_>>()),
            record(date, &[10]),
        ];

        let (first_pass, _) = filter.apply(records);
        let (second_pass, outliers) = filter.apply(first_pass.clone());
        assert_eq!(second_pass, first_pass);
        assert_eq!(outliers, 0);
    }

    #[test]
    fn test_dates_before_origin_use_zero_expectation() {
        let filter = filter_with_sites(ProblematicSites::empty());
        let early = origin() - chrono::Days::new(10);
        // Zero expected edits: any divergence at all is an outlier
        let (survivors, _) = filter.apply(vec![record(early, &[5])]);
        assert!(survivors.is_empty());
        let (survivors, _) = filter.apply(vec![record(early, &[])]);
        assert_eq!(survivors.len(), 1);
    }
}
