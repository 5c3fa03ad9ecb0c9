//! Observable dashboard state

use std::sync::Arc;

use chrono::{DateTime, Utc};
use wwm_common::model::{
    AggregateStats, ClassificationRecord, ConnectionState, DeviceStatus, RecordId,
};

use crate::filter::{LogFilter, RecordSummary};
use crate::stats::StatsSource;

/// Whether the first snapshot has been applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    #[default]
    Loading,
    Ready,
}

/// Immutable snapshot of everything presentation needs
///
/// Published through a `watch` channel after every change.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    /// Newest capture first
    pub records: Arc<Vec<ClassificationRecord>>,
    pub stats: AggregateStats,
    pub stats_source: StatsSource,
    pub device: DeviceStatus,
    pub connection: ConnectionState,
    pub phase: SyncPhase,
    /// A snapshot load is in flight
    pub syncing: bool,
    /// Last applied snapshot or push
    pub last_updated: Option<DateTime<Utc>>,
    /// Failure of the most recent snapshot load, cleared by the next success
    pub last_sync_error: Option<String>,
}

impl Default for DashboardView {
    fn default() -> Self {
        Self {
            records: Arc::new(Vec::new()),
            stats: AggregateStats::default(),
            stats_source: StatsSource::Records,
            device: DeviceStatus::default(),
            connection: ConnectionState::Disconnected,
            phase: SyncPhase::Loading,
            syncing: false,
            last_updated: None,
            last_sync_error: None,
        }
    }
}

impl DashboardView {
    pub fn is_loading(&self) -> bool {
        self.phase == SyncPhase::Loading
    }

    pub fn record(&self, id: RecordId) -> Option<&ClassificationRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn record_ids(&self) -> Vec<RecordId> {
        self.records.iter().map(|r| r.id).collect()
    }

    pub fn filtered(&self, filter: &LogFilter) -> Vec<&ClassificationRecord> {
        self.records.iter().filter(|r| filter.matches(r)).collect()
    }

    pub fn summary(&self) -> RecordSummary {
        RecordSummary::from_records(self.records.iter())
    }
}
