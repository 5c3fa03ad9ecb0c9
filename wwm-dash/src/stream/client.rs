//! Push channel lifecycle
//!
//! `Disconnected → Connecting → Connected`, back to `Disconnected` on any
//! transport drop, then `Connecting` again after the configured backoff.
//! The loop runs until its cancellation token fires.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wwm_common::config::ReconnectConfig;
use wwm_common::model::ConnectionState;

use super::{decode_event, PushTransport, StreamSignal};

/// Why the connected phase ended
enum Closed {
    Dropped,
    Cancelled,
    ListenerGone,
}

/// Owns one push connection at a time and reconnects forever
pub struct StreamClient<T: PushTransport> {
    transport: Arc<T>,
    reconnect: ReconnectConfig,
    base_url: String,
    state_tx: watch::Sender<ConnectionState>,
}

impl<T: PushTransport> StreamClient<T> {
    /// `base_url` resolves image references in pushed records
    pub fn new(transport: Arc<T>, reconnect: ReconnectConfig, base_url: impl Into<String>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            transport,
            reconnect,
            base_url: base_url.into(),
            state_tx,
        }
    }

    /// Watch the connection state
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                debug!(from = %current, to = %state, "Push channel state");
                *current = state;
                true
            }
        });
    }

    /// Run until `cancel` fires or the listener is dropped
    ///
    /// Signals are sent in the order the transport produced them, so nothing
    /// read before a drop is delivered after the following `Connected`.
    pub async fn run(self, listener: mpsc::Sender<StreamSignal>, cancel: CancellationToken) {
        let mut attempt: u32 = 0;

        loop {
            self.set_state(ConnectionState::Connecting);

            let opened = tokio::select! {
                _ = cancel.cancelled() => break,
                opened = self.transport.open() => opened,
            };

            match opened {
                Ok(events) => {
                    attempt = 0;
                    self.set_state(ConnectionState::Connected);
                    info!("Push channel connected");
                    if listener.send(StreamSignal::Connected).await.is_err() {
                        break;
                    }

                    let closed = self.pump(events, &listener, &cancel).await;
                    self.set_state(ConnectionState::Disconnected);
                    match closed {
                        Closed::Cancelled | Closed::ListenerGone => break,
                        Closed::Dropped => {
                            if listener.send(StreamSignal::Disconnected).await.is_err() {
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    self.set_state(ConnectionState::Disconnected);
                    warn!(attempt, error = %e, "Push channel connection failed");
                }
            }

            let delay = self.reconnect.delay_for_attempt(attempt);
            attempt = attempt.saturating_add(1);
            info!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Reconnecting push channel"
            );

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.set_state(ConnectionState::Disconnected);
        debug!("Push channel stopped");
    }

    async fn pump(
        &self,
        mut events: super::EventStream,
        listener: &mpsc::Sender<StreamSignal>,
        cancel: &CancellationToken,
    ) -> Closed {
        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => return Closed::Cancelled,
                next = events.next() => next,
            };

            match next {
                Some(Ok(raw)) => {
                    if let Some(signal) = decode_event(&raw, &self.base_url) {
                        if listener.send(signal).await.is_err() {
                            return Closed::ListenerGone;
                        }
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Push channel dropped");
                    return Closed::Dropped;
                }
                None => {
                    info!("Push channel closed by backend");
                    return Closed::Dropped;
                }
            }
        }
    }
}
