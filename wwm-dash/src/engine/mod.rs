//! Dashboard engine
//!
//! One task owns the [`Reconciler`] and processes, one at a time, the
//! messages that can change it: stream signals, owner commands, and the
//! completions of snapshot loads and correction round trips. Network calls
//! run in short-lived tasks so the loop never blocks on I/O.
//!
//! The owner interacts through [`EngineHandle`]: watch the
//! [`DashboardView`], subscribe to [`DashboardEvent`]s, and send commands.

mod correction;
mod reconciler;

pub use correction::{CorrectionCoordinator, CorrectionOutcome, CorrectionTicket};
pub use reconciler::{LoadReport, LoadTicket, Reconciler, SignalOutcome};

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use wwm_common::config::DashConfig;
use wwm_common::events::{DashboardEvent, EventBus, SyncTrigger};
use wwm_common::model::{ClassificationRecord, ConnectionState, RecordId, Verdict};
use wwm_common::{Error, Result};

use crate::backend::Backend;
use crate::snapshot::{load_snapshot, Snapshot};
use crate::stream::{PushTransport, StreamClient, StreamSignal};
use crate::view::DashboardView;

const COMMAND_CAPACITY: usize = 32;

enum Command {
    Refresh {
        reply: Option<oneshot::Sender<Result<()>>>,
    },
    Correct {
        id: RecordId,
        verdict: Verdict,
        reply: oneshot::Sender<Result<CorrectionOutcome>>,
    },
    Clear,
}

enum Completion {
    Snapshot {
        ticket: LoadTicket,
        snapshot: Snapshot,
        reply: Option<oneshot::Sender<Result<()>>>,
    },
    Correction {
        ticket: CorrectionTicket,
        result: Result<ClassificationRecord>,
        reply: oneshot::Sender<Result<CorrectionOutcome>>,
    },
}

/// Builder for a running engine
pub struct DashboardEngine<B: Backend, T: PushTransport> {
    config: DashConfig,
    backend: Arc<B>,
    transport: Arc<T>,
    events: EventBus,
}

impl<B: Backend, T: PushTransport> DashboardEngine<B, T> {
    pub fn new(config: DashConfig, backend: B, transport: T) -> Self {
        let events = EventBus::new(config.event_channel_capacity);
        Self {
            config,
            backend: Arc::new(backend),
            transport: Arc::new(transport),
            events,
        }
    }

    /// Spawn the engine and stream tasks; must be called inside a runtime
    ///
    /// The startup snapshot load begins immediately.
    pub fn start(self) -> EngineHandle {
        let cancel = CancellationToken::new();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (signal_tx, signal_rx) = mpsc::channel(self.config.event_channel_capacity);
        let (view_tx, view_rx) = watch::channel(DashboardView::default());

        let stream = StreamClient::new(
            self.transport,
            self.config.reconnect.clone(),
            self.config.base_url.clone(),
        );
        let connection_rx = stream.state();
        let stream_task = tokio::spawn(stream.run(signal_tx, cancel.child_token()));

        let engine_loop = EngineLoop {
            reconciler: Reconciler::new(),
            backend: self.backend,
            events: self.events.clone(),
            view_tx,
            tasks: JoinSet::new(),
        };
        let task = tokio::spawn(engine_loop.run(
            command_rx,
            signal_rx,
            connection_rx,
            stream_task,
            cancel.clone(),
        ));

        info!(base_url = %self.config.base_url, "Dashboard engine started");

        EngineHandle {
            commands: command_tx,
            view: view_rx,
            events: self.events,
            cancel,
            task,
        }
    }
}

/// Owner's interface to a running engine
pub struct EngineHandle {
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<DashboardView>,
    events: EventBus,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl EngineHandle {
    /// Current view
    pub fn view(&self) -> DashboardView {
        self.view.borrow().clone()
    }

    /// Receiver notified on every view change
    pub fn subscribe_view(&self) -> watch::Receiver<DashboardView> {
        self.view.clone()
    }

    /// Receiver for notifications
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<DashboardEvent> {
        self.events.subscribe()
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::Internal("dashboard engine stopped".to_string()))
    }

    /// Re-pull both snapshots; resolves once they are applied
    pub async fn refresh(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Refresh { reply: Some(reply) }).await?;
        rx.await
            .map_err(|_| Error::Internal("refresh abandoned".to_string()))?
    }

    /// Start a resync without waiting for it
    ///
    /// The outcome is announced as `SyncCompleted` or `SyncFailed`.
    pub fn request_refresh(&self) -> Result<()> {
        self.commands
            .try_send(Command::Refresh { reply: None })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => {
                    Error::Internal("engine command queue full".to_string())
                }
                mpsc::error::TrySendError::Closed(_) => {
                    Error::Internal("dashboard engine stopped".to_string())
                }
            })
    }

    /// Submit a verdict; the record shows as pending until this resolves
    pub async fn submit_correction(
        &self,
        id: RecordId,
        verdict: Verdict,
    ) -> Result<CorrectionOutcome> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Correct { id, verdict, reply }).await?;
        rx.await
            .map_err(|_| Error::Internal("correction abandoned".to_string()))?
    }

    /// Empty the local log view
    pub async fn clear(&self) -> Result<()> {
        self.send(Command::Clear).await
    }

    /// Stop the push channel and the engine loop, then wait for both
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            error!(error = %e, "Dashboard engine task failed");
        }
    }
}

struct EngineLoop<B: Backend> {
    reconciler: Reconciler,
    backend: Arc<B>,
    events: EventBus,
    view_tx: watch::Sender<DashboardView>,
    tasks: JoinSet<Completion>,
}

impl<B: Backend> EngineLoop<B> {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut signals: mpsc::Receiver<StreamSignal>,
        mut connection: watch::Receiver<ConnectionState>,
        stream_task: JoinHandle<()>,
        cancel: CancellationToken,
    ) {
        self.start_resync(SyncTrigger::Startup, None);
        self.publish();
        let mut connection_open = true;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        debug!("All engine handles dropped");
                        break;
                    }
                },
                Some(signal) = signals.recv() => self.handle_signal(signal),
                Some(joined) = self.tasks.join_next() => match joined {
                    Ok(completion) => self.handle_completion(completion),
                    Err(e) => error!(error = %e, "Engine request task failed"),
                },
                changed = connection.changed(), if connection_open => {
                    if changed.is_err() {
                        connection_open = false;
                    } else {
                        let state = *connection.borrow_and_update();
                        self.reconciler.set_connection(state);
                        self.events.emit_lossy(DashboardEvent::ConnectionChanged { state });
                    }
                },
            }
            self.publish();
        }

        cancel.cancel();
        self.tasks.shutdown().await;
        if let Err(e) = stream_task.await {
            error!(error = %e, "Push channel task failed");
        }
        info!("Dashboard engine stopped");
    }

    /// Push the current view to watchers if it changed
    ///
    /// Runs before any reply so a caller sees the state its request produced.
    fn publish(&self) {
        let next = self.reconciler.view();
        self.view_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn start_resync(&mut self, trigger: SyncTrigger, reply: Option<oneshot::Sender<Result<()>>>) {
        let ticket = self.reconciler.begin_load(trigger);
        info!(%trigger, load = ticket.id, "Starting snapshot resync");
        let backend = Arc::clone(&self.backend);
        self.tasks.spawn(async move {
            let snapshot = load_snapshot(backend.as_ref()).await;
            Completion::Snapshot {
                ticket,
                snapshot,
                reply,
            }
        });
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Refresh { reply } => self.start_resync(SyncTrigger::Manual, reply),
            Command::Correct { id, verdict, reply } => {
                let Some(ticket) = self.reconciler.begin_correction(id, verdict) else {
                    let _ = reply.send(Ok(CorrectionOutcome::Ignored));
                    return;
                };
                debug!(id, %verdict, "Correction pending");
                let backend = Arc::clone(&self.backend);
                self.tasks.spawn(async move {
                    let result = backend.submit_correction(ticket.id, ticket.verdict).await;
                    Completion::Correction {
                        ticket,
                        result,
                        reply,
                    }
                });
            }
            Command::Clear => {
                self.reconciler.clear();
                self.events.emit_lossy(DashboardEvent::LogCleared);
            }
        }
    }

    fn handle_signal(&mut self, signal: StreamSignal) {
        let received = match &signal {
            StreamSignal::RecordPush(record) => Some(record.id),
            _ => None,
        };
        if self.reconciler.handle_signal(signal) == SignalOutcome::ResyncRequired {
            self.start_resync(SyncTrigger::Reconnect, None);
        }
        if let Some(id) = received {
            self.events.emit_lossy(DashboardEvent::RecordReceived { id });
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Snapshot {
                ticket,
                snapshot,
                reply,
            } => {
                let report = self.reconciler.complete_load(ticket, snapshot);
                let result = match report.error {
                    None => {
                        info!(
                            trigger = %report.trigger,
                            records_changed = report.records_changed,
                            replayed = report.replayed,
                            "Snapshot resync complete"
                        );
                        self.events.emit_lossy(DashboardEvent::SyncCompleted {
                            trigger: report.trigger,
                        });
                        Ok(())
                    }
                    Some(e) => {
                        let message = self
                            .reconciler
                            .last_sync_error()
                            .map(str::to_string)
                            .unwrap_or_else(|| e.to_string());
                        warn!(trigger = %report.trigger, error = %message, "Snapshot resync failed");
                        self.events.emit_lossy(DashboardEvent::SyncFailed {
                            trigger: report.trigger,
                            message,
                        });
                        Err(e)
                    }
                };
                self.publish();
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
            Completion::Correction {
                ticket,
                result,
                reply,
            } => {
                let result = match self.reconciler.finish_correction(ticket, result) {
                    Ok(canonical) => {
                        self.events.emit_lossy(DashboardEvent::CorrectionCommitted {
                            id: ticket.id,
                            status: canonical.correction_status,
                        });
                        Ok(CorrectionOutcome::Committed(canonical))
                    }
                    Err(e) => {
                        self.events.emit_lossy(DashboardEvent::CorrectionFailed {
                            id: ticket.id,
                            message: e.to_string(),
                        });
                        Err(e)
                    }
                };
                self.publish();
                let _ = reply.send(result);
            }
        }
    }
}
