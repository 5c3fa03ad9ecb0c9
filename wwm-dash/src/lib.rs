//! # WWM Dashboard Engine (wwm-dash)
//!
//! Client-side state engine for the waste-classification monitoring
//! dashboard.
//!
//! **Purpose:** Keep a consistent, ordered view of classification records,
//! aggregate statistics, and device liveness by combining pull snapshots
//! from the backend with its best-effort push channel.
//!
//! **Architecture:** A pure [`engine::Reconciler`] (record store, stats
//! projection, correction lifecycle) driven by one async loop. The backend
//! and the push transport sit behind traits so the engine runs against
//! HTTP/SSE in production and scripted fakes in tests.

pub mod backend;
pub mod engine;
pub mod filter;
pub mod snapshot;
pub mod stats;
pub mod store;
pub mod stream;
pub mod view;

pub use backend::{Backend, HttpBackend};
pub use engine::{CorrectionOutcome, DashboardEngine, EngineHandle};
pub use filter::{LogFilter, RecordSummary};
pub use stream::{PushTransport, SseTransport};
pub use view::{DashboardView, SyncPhase};
pub use wwm_common::{Error, Result};
