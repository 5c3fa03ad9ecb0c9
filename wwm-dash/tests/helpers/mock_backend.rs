//! In-process HTTP backend for integration tests
//!
//! Serves `/api/history`, `/api/stats`, `/api/log/:id/correction`, and an SSE
//! `/events` stream on an ephemeral loopback port. Tests script responses
//! and push events through [`MockBackend`].

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
enum Push {
    Event { name: String, data: String },
    Disconnect,
}

#[derive(Clone)]
struct MockState {
    history: Arc<Mutex<Value>>,
    stats: Arc<Mutex<Value>>,
    fail_status: Arc<Mutex<Option<u16>>>,
    delay_ms: Arc<AtomicU64>,
    corrections: Arc<Mutex<Vec<(u64, Value)>>>,
    history_hits: Arc<AtomicUsize>,
    stats_hits: Arc<AtomicUsize>,
    sse_connections: Arc<AtomicUsize>,
    push: broadcast::Sender<Push>,
}

/// Handle to a running mock backend
#[derive(Clone)]
pub struct MockBackend {
    addr: SocketAddr,
    state: MockState,
}

impl MockBackend {
    /// Bind to `127.0.0.1:0` and serve in the background
    pub async fn start(history: Value, stats: Value) -> Self {
        let (push, _) = broadcast::channel(64);
        let state = MockState {
            history: Arc::new(Mutex::new(history)),
            stats: Arc::new(Mutex::new(stats)),
            fail_status: Arc::new(Mutex::new(None)),
            delay_ms: Arc::new(AtomicU64::new(0)),
            corrections: Arc::new(Mutex::new(Vec::new())),
            history_hits: Arc::new(AtomicUsize::new(0)),
            stats_hits: Arc::new(AtomicUsize::new(0)),
            sse_connections: Arc::new(AtomicUsize::new(0)),
            push,
        };

        let router = Router::new()
            .route("/api/history", get(history_handler))
            .route("/api/stats", get(stats_handler))
            .route("/api/log/:id/correction", post(correction_handler))
            .route("/events", get(events_handler))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("mock backend address");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("mock backend serve");
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn set_history(&self, history: Value) {
        *self.state.history.lock().unwrap() = history;
    }

    pub fn set_stats(&self, stats: Value) {
        *self.state.stats.lock().unwrap() = stats;
    }

    /// Answer every API request with this status (`None` restores normal)
    pub fn fail_with(&self, status: Option<u16>) {
        *self.state.fail_status.lock().unwrap() = status;
    }

    pub fn set_delay(&self, delay: Duration) {
        self.state
            .delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn corrections(&self) -> Vec<(u64, Value)> {
        self.state.corrections.lock().unwrap().clone()
    }

    pub fn history_hits(&self) -> usize {
        self.state.history_hits.load(Ordering::SeqCst)
    }

    pub fn stats_hits(&self) -> usize {
        self.state.stats_hits.load(Ordering::SeqCst)
    }

    pub fn sse_connections(&self) -> usize {
        self.state.sse_connections.load(Ordering::SeqCst)
    }

    /// Send a named event to every open `/events` stream
    pub fn push(&self, name: &str, data: impl Into<String>) {
        let _ = self.state.push.send(Push::Event {
            name: name.to_string(),
            data: data.into(),
        });
    }

    /// End every open `/events` stream
    pub fn disconnect_all(&self) {
        let _ = self.state.push.send(Push::Disconnect);
    }
}

async fn scripted(state: &MockState) -> Option<Response> {
    let delay = state.delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    let status = *state.fail_status.lock().unwrap();
    status.map(|code| {
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, "scripted failure").into_response()
    })
}

async fn history_handler(State(state): State<MockState>) -> Response {
    state.history_hits.fetch_add(1, Ordering::SeqCst);
    if let Some(failure) = scripted(&state).await {
        return failure;
    }
    let history = state.history.lock().unwrap().clone();
    Json(history).into_response()
}

async fn stats_handler(State(state): State<MockState>) -> Response {
    state.stats_hits.fetch_add(1, Ordering::SeqCst);
    if let Some(failure) = scripted(&state).await {
        return failure;
    }
    let stats = state.stats.lock().unwrap().clone();
    Json(stats).into_response()
}

async fn correction_handler(
    State(state): State<MockState>,
    Path(id): Path<u64>,
    Json(body): Json<Value>,
) -> Response {
    state.corrections.lock().unwrap().push((id, body.clone()));
    if let Some(failure) = scripted(&state).await {
        return failure;
    }

    let wire_status = match body.get("verdict").and_then(Value::as_str) {
        Some("correct") => "benar",
        Some("incorrect") => "salah",
        _ => return (StatusCode::BAD_REQUEST, "bad verdict").into_response(),
    };

    let record = state
        .history
        .lock()
        .unwrap()
        .as_array()
        .and_then(|records| {
            records
                .iter()
                .find(|r| r.get("id").and_then(Value::as_u64) == Some(id))
                .cloned()
        });

    match record {
        Some(mut record) => {
            record["koreksi_status"] = Value::String(wire_status.to_string());
            Json(record).into_response()
        }
        None => (StatusCode::NOT_FOUND, "no such record").into_response(),
    }
}

async fn events_handler(State(state): State<MockState>) -> impl IntoResponse {
    let mut rx = state.push.subscribe();
    state.sse_connections.fetch_add(1, Ordering::SeqCst);

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(Push::Event { name, data }) => {
                    yield Ok::<Event, Infallible>(Event::default().event(name).data(data));
                }
                Ok(Push::Disconnect) | Err(broadcast::error::RecvError::Closed) => break,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
