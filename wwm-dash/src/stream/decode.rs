//! Raw push events to typed signals

use tracing::warn;
use wwm_common::api::{DevicePayload, PushEventKind, RecordPayload, StatsEnvelope};
use wwm_common::{Error, Result};

use super::{RawEvent, StreamSignal};

/// Decode one event, returning `Ok(None)` for event names we do not handle
pub fn parse_event(raw: &RawEvent, base_url: &str) -> Result<Option<StreamSignal>> {
    let Some(kind) = PushEventKind::from_name(&raw.name) else {
        return Ok(None);
    };

    let signal = match kind {
        PushEventKind::DeviceStatus => {
            let payload: DevicePayload = serde_json::from_str(&raw.data)?;
            StreamSignal::DeviceStatus(payload.into_status()?)
        }
        PushEventKind::Stats => {
            let envelope: StatsEnvelope = serde_json::from_str(&raw.data)?;
            StreamSignal::StatsPush(envelope.into_stats()?)
        }
        PushEventKind::Record => {
            let payload: RecordPayload = serde_json::from_str(&raw.data)?;
            StreamSignal::RecordPush(payload.into_record(base_url)?)
        }
    };
    Ok(Some(signal))
}

/// Decode one event, logging and dropping anything unusable
pub fn decode_event(raw: &RawEvent, base_url: &str) -> Option<StreamSignal> {
    match parse_event(raw, base_url) {
        Ok(Some(signal)) => Some(signal),
        Ok(None) => {
            warn!(event = %raw.name, "Dropping push event with unknown name");
            None
        }
        Err(Error::MalformedPayload(reason)) => {
            warn!(event = %raw.name, %reason, "Dropping malformed push payload");
            None
        }
        Err(e) => {
            warn!(event = %raw.name, error = %e, "Dropping push event");
            None
        }
    }
}
