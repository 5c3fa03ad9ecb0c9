//! Aggregate statistics projection
//!
//! Server-provided stats (snapshot or push) are authoritative and replace the
//! active aggregate wholesale. Until the first server payload arrives the
//! projector answers from the records themselves.

use chrono::Datelike;
use wwm_common::model::{AggregateStats, ClassificationRecord, WasteLabel, WeeklyActivity};

use crate::store::RecordStore;

/// Where the active aggregate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsSource {
    Server,
    Records,
}

#[derive(Debug, Default, Clone)]
pub struct StatsProjector {
    server: Option<AggregateStats>,
}

impl StatsProjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active aggregate; returns false if it was identical
    pub fn apply_server_stats(&mut self, stats: AggregateStats) -> bool {
        if self.server.as_ref() == Some(&stats) {
            return false;
        }
        self.server = Some(stats);
        true
    }

    /// Derive an aggregate by counting records
    ///
    /// Each record contributes one unit to its label and to the weekday it
    /// was captured on.
    pub fn recompute_from_records<'a, I>(records: I) -> AggregateStats
    where
        I: IntoIterator<Item = &'a ClassificationRecord>,
    {
        let mut organic = 0.0;
        let mut inorganic = 0.0;
        let mut weekly = WeeklyActivity::default();
        for record in records {
            match record.label {
                WasteLabel::Organic => organic += 1.0,
                WasteLabel::Inorganic => inorganic += 1.0,
            }
            weekly.add(record.captured_at.instant().weekday(), 1.0);
        }
        AggregateStats::new(organic + inorganic, organic, inorganic, weekly)
    }

    /// Active aggregate: server stats if any ever arrived, else computed
    pub fn current(&self, store: &RecordStore) -> (AggregateStats, StatsSource) {
        match &self.server {
            Some(stats) => (stats.clone(), StatsSource::Server),
            None => (
                Self::recompute_from_records(store.iter()),
                StatsSource::Records,
            ),
        }
    }
}
