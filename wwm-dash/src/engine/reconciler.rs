//! Snapshot/push reconciliation
//!
//! Pure, synchronous core of the engine. It sequences snapshot loads
//! against pushed signals:
//!
//! - Every payload signal that arrives while any load is in flight is
//!   appended to a replay log with a sequence number.
//! - Before the first snapshot resolves (`Loading`), logged signals are not
//!   applied. Afterwards they are applied live as well as logged.
//! - When a load resolves, its snapshot is applied and then every logged
//!   signal received since that load started (plus anything never applied)
//!   is replayed in arrival order. A snapshot taken before a push therefore
//!   never regresses it.
//! - A correction committed while a load is in flight is logged as a record
//!   push, so the replay ends on the committed record and not on an older
//!   push or snapshot.
//! - A `Connected` that follows a `Disconnected` asks for one resync.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use wwm_common::events::SyncTrigger;
use wwm_common::model::{
    ClassificationRecord, ConnectionState, DeviceStatus, RecordId, Verdict,
};
use wwm_common::{time, Error, Result};

use super::correction::{CorrectionCoordinator, CorrectionTicket};
use crate::snapshot::Snapshot;
use crate::stats::StatsProjector;
use crate::store::RecordStore;
use crate::stream::StreamSignal;
use crate::view::{DashboardView, SyncPhase};

/// Handle for one in-flight snapshot load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub id: u64,
    pub trigger: SyncTrigger,
    start_seq: u64,
}

/// What the caller must do after a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    Handled,
    /// The push channel came back; start a resync
    ResyncRequired,
}

/// Result of applying a snapshot
#[derive(Debug)]
pub struct LoadReport {
    pub trigger: SyncTrigger,
    /// Records inserted or replaced by the history half
    pub records_changed: usize,
    /// Logged signals re-applied after the snapshot
    pub replayed: usize,
    /// First failure among the two halves
    pub error: Option<Error>,
}

#[derive(Debug)]
struct LoggedSignal {
    seq: u64,
    signal: StreamSignal,
    applied: bool,
}

#[derive(Debug, Default)]
pub struct Reconciler {
    store: RecordStore,
    stats: StatsProjector,
    corrections: CorrectionCoordinator,
    device: DeviceStatus,
    connection: ConnectionState,
    phase: SyncPhase,
    last_updated: Option<DateTime<Utc>>,
    last_sync_error: Option<String>,
    replay_log: VecDeque<LoggedSignal>,
    next_seq: u64,
    in_flight: BTreeMap<u64, u64>,
    next_load: u64,
    saw_disconnect: bool,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn device(&self) -> &DeviceStatus {
        &self.device
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Signals retained for replay
    pub fn logged_signals(&self) -> usize {
        self.replay_log.len()
    }

    pub fn last_sync_error(&self) -> Option<&str> {
        self.last_sync_error.as_deref()
    }

    pub fn set_connection(&mut self, state: ConnectionState) {
        self.connection = state;
    }

    /// Register a snapshot load about to start
    pub fn begin_load(&mut self, trigger: SyncTrigger) -> LoadTicket {
        let ticket = LoadTicket {
            id: self.next_load,
            trigger,
            start_seq: self.next_seq,
        };
        self.next_load += 1;
        self.in_flight.insert(ticket.id, ticket.start_seq);
        debug!(load = ticket.id, %trigger, "Snapshot load registered");
        ticket
    }

    /// Route one signal from the stream client
    pub fn handle_signal(&mut self, signal: StreamSignal) -> SignalOutcome {
        match signal {
            StreamSignal::Connected => {
                if self.saw_disconnect {
                    self.saw_disconnect = false;
                    info!("Push channel reconnected, resync required");
                    return SignalOutcome::ResyncRequired;
                }
            }
            StreamSignal::Disconnected => {
                self.saw_disconnect = true;
                if self.device.online {
                    self.device = self.device.offline();
                }
            }
            payload => {
                let loading = self.phase == SyncPhase::Loading;
                if loading || !self.in_flight.is_empty() {
                    self.log_signal(payload.clone(), !loading);
                }
                if !loading {
                    self.apply_payload(payload);
                }
            }
        }
        SignalOutcome::Handled
    }

    fn log_signal(&mut self, signal: StreamSignal, applied: bool) {
        self.replay_log.push_back(LoggedSignal {
            seq: self.next_seq,
            signal,
            applied,
        });
        self.next_seq += 1;
    }

    fn apply_record(&mut self, record: ClassificationRecord) -> bool {
        let record = self.corrections.overlay(record);
        self.store.upsert(record).changed()
    }

    fn apply_payload(&mut self, signal: StreamSignal) -> bool {
        let changed = match signal {
            StreamSignal::DeviceStatus(status) => {
                let changed = self.device != status;
                self.device = status;
                changed
            }
            StreamSignal::StatsPush(stats) => self.stats.apply_server_stats(stats),
            StreamSignal::RecordPush(record) => self.apply_record(record),
            StreamSignal::Connected | StreamSignal::Disconnected => return false,
        };
        self.last_updated = Some(time::now());
        changed
    }

    /// Apply a resolved snapshot, then replay logged signals
    ///
    /// Always leaves `Loading`, whether or not either half succeeded.
    pub fn complete_load(&mut self, ticket: LoadTicket, snapshot: Snapshot) -> LoadReport {
        self.in_flight.remove(&ticket.id);
        let failure = snapshot.failure_message();
        let Snapshot { history, stats } = snapshot;

        let mut error = None;
        let mut applied = false;
        let mut records_changed = 0;

        match history {
            Ok(records) => {
                let corrections = &self.corrections;
                records_changed = self
                    .store
                    .upsert_many(records.into_iter().map(|r| corrections.overlay(r)));
                applied = true;
            }
            Err(e) => error = Some(e),
        }
        match stats {
            Ok(stats) => {
                self.stats.apply_server_stats(stats);
                applied = true;
            }
            Err(e) => {
                error.get_or_insert(e);
            }
        }
        if applied {
            self.last_updated = Some(time::now());
        }

        let replay: Vec<StreamSignal> = self
            .replay_log
            .iter_mut()
            .filter(|logged| logged.seq >= ticket.start_seq || !logged.applied)
            .map(|logged| {
                logged.applied = true;
                logged.signal.clone()
            })
            .collect();
        let replayed = replay.len();
        for signal in replay {
            self.apply_payload(signal);
        }
        self.trim_replay_log();

        self.phase = SyncPhase::Ready;
        self.last_sync_error = failure;

        debug!(
            load = ticket.id,
            trigger = %ticket.trigger,
            records_changed,
            replayed,
            "Snapshot applied"
        );

        LoadReport {
            trigger: ticket.trigger,
            records_changed,
            replayed,
            error,
        }
    }

    fn trim_replay_log(&mut self) {
        match self.in_flight.values().min().copied() {
            None => self.replay_log.clear(),
            Some(floor) => self
                .replay_log
                .retain(|logged| logged.seq >= floor || !logged.applied),
        }
    }

    /// Start an optimistic correction; `None` means nothing to do
    pub fn begin_correction(&mut self, id: RecordId, verdict: Verdict) -> Option<CorrectionTicket> {
        self.corrections.begin(&mut self.store, id, verdict)
    }

    /// Commit or roll back a correction with the backend's answer
    pub fn finish_correction(
        &mut self,
        ticket: CorrectionTicket,
        result: Result<ClassificationRecord>,
    ) -> Result<ClassificationRecord> {
        match result {
            Ok(canonical) => {
                let committed = self
                    .corrections
                    .commit(&mut self.store, ticket, canonical.clone());
                if committed && !self.in_flight.is_empty() {
                    self.log_signal(StreamSignal::RecordPush(canonical.clone()), true);
                }
                Ok(canonical)
            }
            Err(e) => {
                self.corrections.rollback(&mut self.store, ticket);
                Err(e)
            }
        }
    }

    /// Empty the local log; stats and device status are kept
    pub fn clear(&mut self) {
        info!(records = self.store.len(), "Clearing local log");
        self.store.clear();
    }

    /// Build the observable view of the current state
    pub fn view(&self) -> DashboardView {
        let (stats, stats_source) = self.stats.current(&self.store);
        DashboardView {
            records: self.store.all().into(),
            stats,
            stats_source,
            device: self.device.clone(),
            connection: self.connection,
            phase: self.phase,
            syncing: !self.in_flight.is_empty(),
            last_updated: self.last_updated,
            last_sync_error: self.last_sync_error.clone(),
        }
    }
}
