//! Optimistic correction lifecycle
//!
//! `Unrated → Pending{Correct,Incorrect}` immediately, then the backend's
//! canonical record on success or back to `Unrated` on failure. This is the
//! only code that writes a record's correction status.

use std::collections::HashMap;

use tracing::{debug, info, warn};
use wwm_common::model::{ClassificationRecord, CorrectionStatus, RecordId, Verdict};

use crate::store::RecordStore;

/// An accepted correction awaiting its round trip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrectionTicket {
    pub id: RecordId,
    pub verdict: Verdict,
}

/// Result of a correction request
#[derive(Debug, Clone, PartialEq)]
pub enum CorrectionOutcome {
    /// Backend accepted; carries its canonical record
    Committed(ClassificationRecord),
    /// Unknown id, already rated, or already in flight; nothing was sent
    Ignored,
}

#[derive(Debug, Default)]
pub struct CorrectionCoordinator {
    outstanding: HashMap<RecordId, Verdict>,
}

impl CorrectionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_outstanding(&self, id: RecordId) -> bool {
        self.outstanding.contains_key(&id)
    }

    pub fn outstanding_count(&self) -> usize {
        self.outstanding.len()
    }

    /// Mark the record pending if it exists and is unrated
    ///
    /// Returns `None` when the precondition fails; that is a no-op, not an
    /// error.
    pub fn begin(
        &mut self,
        store: &mut RecordStore,
        id: RecordId,
        verdict: Verdict,
    ) -> Option<CorrectionTicket> {
        if self.outstanding.contains_key(&id) {
            debug!(id, "Correction already in flight, ignoring");
            return None;
        }
        match store.get(id).map(|r| r.correction_status) {
            Some(CorrectionStatus::Unrated) => {}
            Some(status) => {
                debug!(id, ?status, "Record already rated, ignoring correction");
                return None;
            }
            None => {
                debug!(id, "Correction for unknown record, ignoring");
                return None;
            }
        }

        store.set_correction_status(id, verdict.pending_status());
        self.outstanding.insert(id, verdict);
        Some(CorrectionTicket { id, verdict })
    }

    /// Keep the local pending status on a record arriving from the backend
    pub fn overlay(&self, mut record: ClassificationRecord) -> ClassificationRecord {
        if let Some(verdict) = self.outstanding.get(&record.id) {
            record.correction_status = verdict.pending_status();
        }
        record
    }

    /// Replace the record with the backend's canonical version
    ///
    /// A record cleared from the store while the request was in flight is
    /// not brought back; returns whether the store was written.
    pub fn commit(
        &mut self,
        store: &mut RecordStore,
        ticket: CorrectionTicket,
        canonical: ClassificationRecord,
    ) -> bool {
        self.outstanding.remove(&ticket.id);
        if store.get(ticket.id).is_none() {
            debug!(id = ticket.id, "Corrected record no longer in store");
            return false;
        }
        info!(
            id = ticket.id,
            status = ?canonical.correction_status,
            "Correction committed"
        );
        store.upsert(canonical);
        true
    }

    /// Revert the record to unrated
    pub fn rollback(&mut self, store: &mut RecordStore, ticket: CorrectionTicket) {
        self.outstanding.remove(&ticket.id);
        let pending = store
            .get(ticket.id)
            .is_some_and(|r| r.correction_status.is_pending());
        if pending {
            store.set_correction_status(ticket.id, CorrectionStatus::Unrated);
        }
        warn!(id = ticket.id, verdict = %ticket.verdict, "Correction rolled back");
    }
}
