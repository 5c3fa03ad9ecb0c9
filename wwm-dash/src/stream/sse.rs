//! Server-Sent Events transport

use std::mem;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::Client;
use tracing::{debug, trace};
use wwm_common::config::DashConfig;
use wwm_common::{Error, Result};

use super::{EventStream, PushTransport, RawEvent};

const DEFAULT_EVENT_NAME: &str = "message";

/// Incremental `text/event-stream` parser
///
/// Accepts arbitrary byte chunks (lines and UTF-8 sequences may be split
/// across chunks) and yields complete events. `id:` and `retry:` fields are
/// ignored; comment lines are skipped.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns the events it completed
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<RawEvent> {
        self.buf.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n' || b == b'\r') {
            let mut consumed = pos + 1;
            if self.buf[pos] == b'\r' {
                // A trailing CR may be the first half of CRLF
                if consumed == self.buf.len() {
                    break;
                }
                if self.buf[consumed] == b'\n' {
                    consumed += 1;
                }
            }
            let raw: Vec<u8> = self.buf.drain(..consumed).take(pos).collect();
            let line = String::from_utf8_lossy(&raw);
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }

        events
    }

    /// Flush at end of stream; an event without its blank line is discarded
    pub fn finish(&mut self) {
        if !self.data.is_empty() || !self.buf.is_empty() {
            debug!("Discarding incomplete push event at end of stream");
        }
        self.buf.clear();
        self.event = None;
        self.data.clear();
    }

    fn process_line(&mut self, line: &str) -> Option<RawEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.find(':') {
            Some(i) => {
                let value = &line[i + 1..];
                (&line[..i], value.strip_prefix(' ').unwrap_or(value))
            }
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" | "retry" => {}
            other => trace!(field = other, "Ignoring unknown SSE field"),
        }
        None
    }

    fn dispatch(&mut self) -> Option<RawEvent> {
        let name = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = mem::take(&mut self.data).join("\n");
        Some(RawEvent {
            name: name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| DEFAULT_EVENT_NAME.to_string()),
            data,
        })
    }
}

/// Push transport reading `text/event-stream` from the backend
#[derive(Clone)]
pub struct SseTransport {
    client: Client,
    url: String,
}

impl SseTransport {
    pub fn new(config: &DashConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("wwm-dash/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: config.events_url(),
        })
    }
}

#[async_trait]
impl PushTransport for SseTransport {
    async fn open(&self) -> Result<EventStream> {
        let response = self
            .client
            .get(&self.url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| Error::transport(format!("{}: {e}", self.url)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::status(
                status.as_u16(),
                format!("push channel {} answered HTTP {}", self.url, status.as_u16()),
            ));
        }
        debug!(url = %self.url, "Push channel open");

        let mut decoder = SseDecoder::new();
        let events = response
            .bytes_stream()
            .map(move |chunk| match chunk {
                Ok(bytes) => decoder.feed(&bytes).into_iter().map(Ok).collect::<Vec<_>>(),
                Err(e) => vec![Err(Error::transport(format!("push stream read failed: {e}")))],
            })
            .flat_map(futures::stream::iter);

        Ok(events.boxed())
    }
}
