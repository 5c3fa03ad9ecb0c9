//! Shared helpers for wwm-dash integration tests

#![allow(dead_code)]

pub mod fakes;
pub mod mock_backend;

use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::watch;
use wwm_common::config::{BackoffPolicy, DashConfig, ReconnectConfig};
use wwm_common::model::{
    CapturedAt, ClassificationRecord, CorrectionStatus, RecordId, RecordStatus, WasteLabel,
};

pub const WAIT: Duration = Duration::from_secs(5);

/// Record captured on 16/10/2026 at `time`; even ids are organic
pub fn record(id: RecordId, time: &str) -> ClassificationRecord {
    ClassificationRecord {
        id,
        image_ref: format!("http://backend/static/{id}.jpg"),
        label: if id % 2 == 0 {
            WasteLabel::Organic
        } else {
            WasteLabel::Inorganic
        },
        confidence: 90.0,
        captured_at: CapturedAt::parse("16/10/2026", time).unwrap(),
        processing_time_ms: 42.0,
        model_version: "v2".to_string(),
        status: RecordStatus::Success,
        correction_status: CorrectionStatus::Unrated,
    }
}

/// Backend wire form of a record
pub fn record_json(id: RecordId, time: &str) -> Value {
    json!({
        "id": id,
        "image_path": format!("static\\captures\\{id}.jpg"),
        "label": if id % 2 == 0 { "Organik" } else { "Anorganik" },
        "confidence": 90.0,
        "date": "16/10/2026",
        "timestamp": time,
        "processing_time": 42.0,
        "model_version": "v2",
        "status": "success",
        "koreksi_status": "belum_dinilai"
    })
}

/// Backend wire form of the stats envelope
pub fn stats_json(total: f64, organic: f64, inorganic: f64) -> Value {
    json!({
        "stats": {
            "total": total,
            "organik": organic,
            "anorganik": inorganic,
            "percentage": { "organik": 0, "anorganik": 0 }
        },
        "weeklyActivity": [
            { "day": "Sen", "amount": 3 },
            { "day": "Jum", "amount": total }
        ],
        "lastUpdated": "2026-10-16T08:00:00Z"
    })
}

/// Config pointing at `base_url` with fast fixed reconnects
pub fn test_config(base_url: &str) -> DashConfig {
    DashConfig {
        base_url: base_url.to_string(),
        request_timeout_ms: 2_000,
        reconnect: ReconnectConfig {
            policy: BackoffPolicy::Fixed,
            initial_delay_ms: 10,
            max_delay_ms: 10,
            multiplier: 1.0,
        },
        ..Default::default()
    }
}

/// Wait until the watched value satisfies `predicate`, returning a copy
pub async fn wait_until<T, F>(rx: &mut watch::Receiver<T>, predicate: F) -> T
where
    T: Clone,
    F: FnMut(&T) -> bool,
{
    tokio::time::timeout(WAIT, rx.wait_for(predicate))
        .await
        .expect("timed out waiting for state")
        .expect("watch sender dropped")
        .clone()
}
