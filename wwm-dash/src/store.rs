//! Canonical record collection
//!
//! [`RecordStore`] is the only owner of classification records. Every write
//! goes through [`RecordStore::upsert`] (full replace by id), the correction
//! status transition, or [`RecordStore::clear`]. Iteration order is always
//! newest capture first, ties broken by larger id first, independent of the
//! order in which records were applied.

use std::collections::{BTreeMap, HashMap};

use wwm_common::model::{ClassificationRecord, CorrectionStatus, DisplayKey, RecordId};

use crate::filter::{LogFilter, RecordSummary};

/// Result of applying one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// Id was not present
    Inserted,
    /// Id was present with different content
    Replaced,
    /// Identical record already present
    Unchanged,
}

impl UpsertOutcome {
    pub fn changed(&self) -> bool {
        !matches!(self, UpsertOutcome::Unchanged)
    }
}

/// Deduplicated, ordered classification records
#[derive(Debug, Default, Clone)]
pub struct RecordStore {
    ordered: BTreeMap<DisplayKey, ClassificationRecord>,
    keys: HashMap<RecordId, DisplayKey>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Insert or fully replace the record with the same id
    pub fn upsert(&mut self, record: ClassificationRecord) -> UpsertOutcome {
        let new_key = record.display_key();
        match self.keys.insert(record.id, new_key) {
            None => {
                self.ordered.insert(new_key, record);
                UpsertOutcome::Inserted
            }
            Some(old_key) => {
                if self.ordered.get(&old_key) == Some(&record) {
                    return UpsertOutcome::Unchanged;
                }
                // Capture time may differ on replace, so the position can move
                self.ordered.remove(&old_key);
                self.ordered.insert(new_key, record);
                UpsertOutcome::Replaced
            }
        }
    }

    /// Apply `upsert` to each record; returns how many changed the store
    pub fn upsert_many<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = ClassificationRecord>,
    {
        records
            .into_iter()
            .map(|record| self.upsert(record))
            .filter(UpsertOutcome::changed)
            .count()
    }

    /// Change only the correction status of an existing record
    ///
    /// Returns the previous status, or `None` if the id is unknown.
    pub fn set_correction_status(
        &mut self,
        id: RecordId,
        status: CorrectionStatus,
    ) -> Option<CorrectionStatus> {
        let key = self.keys.get(&id)?;
        let record = self.ordered.get_mut(key)?;
        let previous = record.correction_status;
        record.correction_status = status;
        Some(previous)
    }

    /// Empty the store (local display reset only)
    pub fn clear(&mut self) {
        self.ordered.clear();
        self.keys.clear();
    }

    pub fn get(&self, id: RecordId) -> Option<&ClassificationRecord> {
        self.keys.get(&id).and_then(|key| self.ordered.get(key))
    }

    /// Records in display order
    pub fn iter(&self) -> impl Iterator<Item = &ClassificationRecord> {
        self.ordered.values()
    }

    /// Snapshot of the records in display order
    ///
    /// The returned vector does not follow later mutations.
    pub fn all(&self) -> Vec<ClassificationRecord> {
        self.ordered.values().cloned().collect()
    }

    /// Records matching a log filter, in display order
    pub fn filtered(&self, filter: &LogFilter) -> Vec<ClassificationRecord> {
        self.iter().filter(|r| filter.matches(r)).cloned().collect()
    }

    /// Counts and average confidence over the current records
    pub fn summary(&self) -> RecordSummary {
        RecordSummary::from_records(self.iter())
    }
}
