//! Notification events for the dashboard
//!
//! Provides the [`DashboardEvent`] enum and the [`EventBus`] that carries
//! them to presentation (toasts, status banners, logs). These are
//! notifications about state changes; the state itself is published
//! separately as a watchable view.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::model::{ConnectionState, CorrectionStatus, RecordId};

/// Why a snapshot resync ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncTrigger {
    /// First load after the engine starts
    Startup,
    /// Push channel came back after a drop
    Reconnect,
    /// Operator asked for a refresh
    Manual,
}

impl std::fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncTrigger::Startup => write!(f, "Startup"),
            SyncTrigger::Reconnect => write!(f, "Reconnect"),
            SyncTrigger::Manual => write!(f, "Manual"),
        }
    }
}

/// Dashboard notification types
///
/// Serialized with a `type` tag so they can be forwarded to a browser as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DashboardEvent {
    /// A record arrived over the push channel
    RecordReceived { id: RecordId },

    /// Snapshot resync applied
    SyncCompleted { trigger: SyncTrigger },

    /// Snapshot resync failed (stale data stays visible)
    SyncFailed { trigger: SyncTrigger, message: String },

    /// Correction accepted by the backend
    CorrectionCommitted { id: RecordId, status: CorrectionStatus },

    /// Correction rejected or lost; record reverted to unrated
    CorrectionFailed { id: RecordId, message: String },

    /// Local log view emptied
    LogCleared,

    /// Push channel state changed
    ConnectionChanged { state: ConnectionState },
}

impl DashboardEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            DashboardEvent::RecordReceived { .. } => "RecordReceived",
            DashboardEvent::SyncCompleted { .. } => "SyncCompleted",
            DashboardEvent::SyncFailed { .. } => "SyncFailed",
            DashboardEvent::CorrectionCommitted { .. } => "CorrectionCommitted",
            DashboardEvent::CorrectionFailed { .. } => "CorrectionFailed",
            DashboardEvent::LogCleared => "LogCleared",
            DashboardEvent::ConnectionChanged { .. } => "ConnectionChanged",
        }
    }
}

/// Notification bus built on `tokio::sync::broadcast`
///
/// - Non-blocking publish (slow subscribers don't block the engine)
/// - Multiple concurrent subscribers
/// - Lagged subscribers lose the oldest notifications, never state
///
/// # Examples
///
/// ```
/// use wwm_common::events::{DashboardEvent, EventBus};
///
/// let bus = EventBus::new(16);
/// let mut rx = bus.subscribe();
/// bus.emit_lossy(DashboardEvent::LogCleared);
/// assert_eq!(rx.try_recv().unwrap().event_type(), "LogCleared");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DashboardEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: DashboardEvent,
    ) -> Result<usize, broadcast::error::SendError<DashboardEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: DashboardEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
