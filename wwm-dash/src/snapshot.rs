//! Snapshot loading
//!
//! A snapshot is the pair of pull requests (`history`, `stats`) issued
//! together. Both run concurrently and each half reports its own outcome so
//! the reconciler can apply whichever succeeded.

use tracing::debug;
use wwm_common::api::RecordPayload;
use wwm_common::model::{AggregateStats, ClassificationRecord};
use wwm_common::{Error, Result};

use crate::backend::Backend;

/// Outcome of one snapshot load
#[derive(Debug)]
pub struct Snapshot {
    pub history: Result<Vec<ClassificationRecord>>,
    pub stats: Result<AggregateStats>,
}

impl Snapshot {
    pub fn is_complete(&self) -> bool {
        self.history.is_ok() && self.stats.is_ok()
    }

    /// Human-readable description of every failed half, if any
    pub fn failure_message(&self) -> Option<String> {
        let failures: Vec<String> = [
            self.history.as_ref().err().map(|e| format!("history: {e}")),
            self.stats.as_ref().err().map(|e| format!("stats: {e}")),
        ]
        .into_iter()
        .flatten()
        .collect();

        if failures.is_empty() {
            None
        } else {
            Some(failures.join("; "))
        }
    }
}

/// Run `load_history` and `load_stats` concurrently
pub async fn load_snapshot<B: Backend + ?Sized>(backend: &B) -> Snapshot {
    let (history, stats) = tokio::join!(backend.load_history(), backend.load_stats());
    debug!(
        history_ok = history.is_ok(),
        stats_ok = stats.is_ok(),
        "Snapshot load finished"
    );
    Snapshot { history, stats }
}

/// Convert history payloads into records with resolved image references
///
/// Any single invalid payload fails the whole history.
pub fn normalize_history(
    base_url: &str,
    payloads: Vec<RecordPayload>,
) -> Result<Vec<ClassificationRecord>> {
    payloads
        .into_iter()
        .map(|payload| {
            let id = payload.id;
            payload.into_record(base_url).map_err(|e| match e {
                Error::MalformedPayload(msg) => {
                    Error::MalformedPayload(format!("history record {id}: {msg}"))
                }
                other => other,
            })
        })
        .collect()
}
