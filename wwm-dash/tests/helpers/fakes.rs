//! Scripted in-process Backend and PushTransport

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::UnboundedReceiverStream;
use wwm_common::model::{AggregateStats, ClassificationRecord, RecordId, Verdict, WeeklyActivity};
use wwm_common::{Error, Result};
use wwm_dash::stream::{EventStream, PushTransport, RawEvent};
use wwm_dash::Backend;

/// A closed gate holds requests until reopened
#[derive(Clone)]
pub struct Gate(Arc<watch::Sender<bool>>);

impl Gate {
    fn new() -> Self {
        Gate(Arc::new(watch::channel(true).0))
    }

    pub fn close(&self) {
        self.0.send_replace(false);
    }

    pub fn open(&self) {
        self.0.send_replace(true);
    }

    async fn pass(&self) {
        let mut rx = self.0.subscribe();
        let _ = rx.wait_for(|open| *open).await;
    }
}

struct FakeState {
    history: Mutex<Vec<ClassificationRecord>>,
    stats: Mutex<AggregateStats>,
    fail_history: AtomicBool,
    fail_stats: AtomicBool,
    fail_corrections: AtomicBool,
    history_calls: AtomicUsize,
    stats_calls: AtomicUsize,
    correction_calls: AtomicUsize,
    load_gate: Gate,
    correction_gate: Gate,
}

/// Backend answering from in-memory data; clones share state
#[derive(Clone)]
pub struct FakeBackend(Arc<FakeState>);

impl FakeBackend {
    pub fn new(history: Vec<ClassificationRecord>, stats: AggregateStats) -> Self {
        FakeBackend(Arc::new(FakeState {
            history: Mutex::new(history),
            stats: Mutex::new(stats),
            fail_history: AtomicBool::new(false),
            fail_stats: AtomicBool::new(false),
            fail_corrections: AtomicBool::new(false),
            history_calls: AtomicUsize::new(0),
            stats_calls: AtomicUsize::new(0),
            correction_calls: AtomicUsize::new(0),
            load_gate: Gate::new(),
            correction_gate: Gate::new(),
        }))
    }

    pub fn set_history(&self, history: Vec<ClassificationRecord>) {
        *self.0.history.lock().unwrap() = history;
    }

    pub fn set_stats(&self, stats: AggregateStats) {
        *self.0.stats.lock().unwrap() = stats;
    }

    pub fn fail_history(&self, fail: bool) {
        self.0.fail_history.store(fail, Ordering::SeqCst);
    }

    pub fn fail_stats(&self, fail: bool) {
        self.0.fail_stats.store(fail, Ordering::SeqCst);
    }

    pub fn fail_corrections(&self, fail: bool) {
        self.0.fail_corrections.store(fail, Ordering::SeqCst);
    }

    pub fn history_calls(&self) -> usize {
        self.0.history_calls.load(Ordering::SeqCst)
    }

    pub fn stats_calls(&self) -> usize {
        self.0.stats_calls.load(Ordering::SeqCst)
    }

    pub fn correction_calls(&self) -> usize {
        self.0.correction_calls.load(Ordering::SeqCst)
    }

    /// Gate for history and stats loads
    pub fn load_gate(&self) -> &Gate {
        &self.0.load_gate
    }

    pub fn correction_gate(&self) -> &Gate {
        &self.0.correction_gate
    }
}

pub fn stats(total: f64, organic: f64, inorganic: f64) -> AggregateStats {
    AggregateStats::new(total, organic, inorganic, WeeklyActivity::default())
}

#[async_trait]
impl Backend for FakeBackend {
    async fn load_history(&self) -> Result<Vec<ClassificationRecord>> {
        self.0.history_calls.fetch_add(1, Ordering::SeqCst);
        self.0.load_gate.pass().await;
        if self.0.fail_history.load(Ordering::SeqCst) {
            return Err(Error::status(503, "history unavailable"));
        }
        Ok(self.0.history.lock().unwrap().clone())
    }

    async fn load_stats(&self) -> Result<AggregateStats> {
        self.0.stats_calls.fetch_add(1, Ordering::SeqCst);
        self.0.load_gate.pass().await;
        if self.0.fail_stats.load(Ordering::SeqCst) {
            return Err(Error::status(503, "stats unavailable"));
        }
        Ok(self.0.stats.lock().unwrap().clone())
    }

    async fn submit_correction(
        &self,
        id: RecordId,
        verdict: Verdict,
    ) -> Result<ClassificationRecord> {
        self.0.correction_calls.fetch_add(1, Ordering::SeqCst);
        self.0.correction_gate.pass().await;
        if self.0.fail_corrections.load(Ordering::SeqCst) {
            return Err(Error::transport("connection reset"));
        }
        let record = self
            .0
            .history
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned();
        match record {
            Some(mut record) => {
                record.correction_status = verdict.settled_status();
                Ok(record)
            }
            None => Err(Error::status(404, "no such record")),
        }
    }
}

/// One scripted push connection; dropping it ends the stream
pub struct FakeConnection {
    tx: mpsc::UnboundedSender<Result<RawEvent>>,
}

impl FakeConnection {
    pub fn push(&self, name: &str, data: impl Into<String>) {
        let _ = self.tx.send(Ok(RawEvent::new(name, data)));
    }

    /// End the stream with a transport error
    pub fn fail(self) {
        let _ = self.tx.send(Err(Error::transport("connection reset")));
    }
}

/// Push transport whose connections are handed out by the test
///
/// `open` waits until the test calls [`ChannelTransport::connect`].
pub struct ChannelTransport {
    pending: tokio::sync::Mutex<mpsc::UnboundedReceiver<UnboundedReceiverStream<Result<RawEvent>>>>,
    opens: Arc<AtomicUsize>,
}

/// Test side of a [`ChannelTransport`]
#[derive(Clone)]
pub struct TransportControl {
    connections: mpsc::UnboundedSender<UnboundedReceiverStream<Result<RawEvent>>>,
    opens: Arc<AtomicUsize>,
}

impl ChannelTransport {
    pub fn new() -> (Self, TransportControl) {
        let (connections, pending) = mpsc::unbounded_channel();
        let opens = Arc::new(AtomicUsize::new(0));
        (
            ChannelTransport {
                pending: tokio::sync::Mutex::new(pending),
                opens: Arc::clone(&opens),
            },
            TransportControl { connections, opens },
        )
    }
}

impl TransportControl {
    /// Let the next `open` succeed
    pub fn connect(&self) -> FakeConnection {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = self.connections.send(UnboundedReceiverStream::new(rx));
        FakeConnection { tx }
    }

    /// Number of `open` calls started so far
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushTransport for ChannelTransport {
    async fn open(&self) -> Result<EventStream> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let mut pending = self.pending.lock().await;
        match pending.recv().await {
            Some(stream) => Ok(stream.boxed()),
            None => Err(Error::transport("transport control dropped")),
        }
    }
}
