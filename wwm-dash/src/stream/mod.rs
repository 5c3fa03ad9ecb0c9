//! Push channel
//!
//! [`StreamClient`] owns the connection lifecycle and turns transport events
//! into [`StreamSignal`]s for its single listener. The wire transport sits
//! behind [`PushTransport`]; [`SseTransport`] reads Server-Sent Events.

mod client;
mod decode;
mod sse;

pub use client::StreamClient;
pub use decode::{decode_event, parse_event};
pub use sse::{SseDecoder, SseTransport};

use async_trait::async_trait;
use futures::stream::BoxStream;
use wwm_common::model::{AggregateStats, ClassificationRecord, DeviceStatus};
use wwm_common::Result;

/// Logical signals delivered to the reconciler
#[derive(Debug, Clone, PartialEq)]
pub enum StreamSignal {
    Connected,
    Disconnected,
    DeviceStatus(DeviceStatus),
    StatsPush(AggregateStats),
    RecordPush(ClassificationRecord),
}

/// One named event as read off the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub name: String,
    pub data: String,
}

impl RawEvent {
    pub fn new(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// Events from one open connection; an `Err` item or end of stream closes it
pub type EventStream = BoxStream<'static, Result<RawEvent>>;

/// Opens push connections
#[async_trait]
pub trait PushTransport: Send + Sync + 'static {
    /// Connect and return the event stream; `Err` means the attempt failed
    async fn open(&self) -> Result<EventStream>;
}
