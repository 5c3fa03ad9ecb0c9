//! Log view filtering and summary counts

use chrono::NaiveDate;
use wwm_common::model::{ClassificationRecord, RecordStatus, WasteLabel};

/// Criteria for the log view; the default matches everything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogFilter {
    /// Only this label (`None` = all)
    pub label: Option<WasteLabel>,
    /// Minimum confidence, inclusive
    pub min_confidence: f64,
    /// Only this pipeline status (`None` = all)
    pub status: Option<RecordStatus>,
    /// Only records captured on this date
    pub date: Option<NaiveDate>,
    /// Free text matched against label, date, and time strings
    pub search: String,
}

impl LogFilter {
    pub fn with_label(mut self, label: WasteLabel) -> Self {
        self.label = Some(label);
        self
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn with_status(mut self, status: RecordStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    fn matches_search(&self, record: &ClassificationRecord) -> bool {
        let term = self.search.trim();
        if term.is_empty() {
            return true;
        }
        record
            .label
            .as_str()
            .to_lowercase()
            .contains(&term.to_lowercase())
            || record.captured_at.time.contains(term)
            || record.captured_at.date.contains(term)
    }

    /// True when the record passes every criterion
    pub fn matches(&self, record: &ClassificationRecord) -> bool {
        self.matches_search(record)
            && self.label.map_or(true, |label| record.label == label)
            && record.confidence >= self.min_confidence
            && self.status.map_or(true, |status| record.status == status)
            && self
                .date
                .map_or(true, |date| record.captured_at.instant().date() == date)
    }
}

/// Counts over a set of records
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RecordSummary {
    pub total: usize,
    pub organic: usize,
    pub inorganic: usize,
    /// Mean confidence, 0 when there are no records
    pub average_confidence: f64,
}

impl RecordSummary {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a ClassificationRecord>,
    {
        let mut summary = RecordSummary::default();
        let mut confidence_sum = 0.0;
        for record in records {
            summary.total += 1;
            match record.label {
                WasteLabel::Organic => summary.organic += 1,
                WasteLabel::Inorganic => summary.inorganic += 1,
            }
            confidence_sum += record.confidence;
        }
        if summary.total > 0 {
            summary.average_confidence = confidence_sum / summary.total as f64;
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::record_at;
    use crate::store::RecordStore;

    fn store() -> RecordStore {
        let mut store = RecordStore::new();
        // even ids are organic, confidence = 80 + id
        store.upsert_many((1..=6).map(|id| record_at(id, &format!("0{id}:00:00"))));
        let mut warned = record_at(7, "07:30:00");
        warned.status = RecordStatus::Warning;
        store.upsert(warned);
        store
    }

    #[test]
    fn test_default_filter_matches_all() {
        let store = store();
        assert_eq!(store.filtered(&LogFilter::default()).len(), store.len());
    }

    #[test]
    fn test_label_and_confidence_filters() {
        let store = store();
        let filter = LogFilter::default()
            .with_label(WasteLabel::Organic)
            .with_min_confidence(84.0);
        let ids: Vec<_> = store.filtered(&filter).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![6, 4]);
    }

    #[test]
    fn test_status_filter() {
        let store = store();
        let filter = LogFilter::default().with_status(RecordStatus::Warning);
        let ids: Vec<_> = store.filtered(&filter).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![7]);
    }

    #[test]
    fn test_date_filter() {
        let store = store();
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let other = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();
        assert_eq!(store.filtered(&LogFilter::default().with_date(today)).len(), 7);
        assert!(store.filtered(&LogFilter::default().with_date(other)).is_empty());
    }

    #[test]
    fn test_search_matches_label_and_time() {
        let store = store();
        let by_label = LogFilter::default().with_search("ANORG");
        assert!(store
            .filtered(&by_label)
            .iter()
            .all(|r| r.label == WasteLabel::Inorganic));
        let by_time = LogFilter::default().with_search("03:00");
        let ids: Vec<_> = store.filtered(&by_time).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn test_summary_counts() {
        let summary = store().summary();
        assert_eq!(summary.total, 7);
        assert_eq!(summary.organic, 3);
        assert_eq!(summary.inorganic, 4);
        assert!((summary.average_confidence - 84.0).abs() < 1e-9);
    }

    #[test]
    fn test_summary_empty() {
        assert_eq!(RecordStore::new().summary(), RecordSummary::default());
    }
}
