//! Backend request surface
//!
//! The engine talks to the classification backend only through the
//! [`Backend`] trait: the two snapshot pulls and the correction round trip.
//! [`HttpBackend`] is the production implementation; tests substitute
//! scripted fakes.

mod http;

pub use http::HttpBackend;

use async_trait::async_trait;
use wwm_common::model::{AggregateStats, ClassificationRecord, RecordId, Verdict};
use wwm_common::Result;

/// Pull and correction requests against the backend
///
/// Implementations do not retry; retry policy belongs to the caller.
/// Returned records carry resolved, absolute image references.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// `GET /history`
    async fn load_history(&self) -> Result<Vec<ClassificationRecord>>;

    /// `GET /stats`
    async fn load_stats(&self) -> Result<AggregateStats>;

    /// `POST /log/{id}/correction`; returns the backend's canonical record
    async fn submit_correction(&self, id: RecordId, verdict: Verdict)
        -> Result<ClassificationRecord>;
}
