//! Backend API contract
//!
//! Wire payloads for the classification backend:
//! - `GET {api}/history`: list of [`RecordPayload`]
//! - `GET {api}/stats`: [`StatsEnvelope`]
//! - `POST {api}/log/{id}/correction`: [`CorrectionRequest`] in, [`RecordPayload`] out
//! - push events `device_status_update`, `update_stats`, `new_log`
//!
//! This module holds only shapes and pure conversions; the HTTP and push
//! transports live in the dashboard crate.

pub mod types;

pub use types::{
    resolve_image_ref, CorrectionRequest, DevicePayload, PushEventKind, RecordPayload, StatsBody,
    StatsEnvelope, WeeklyEntry, WireCorrectionStatus,
};
