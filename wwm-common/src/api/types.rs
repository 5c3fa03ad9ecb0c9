//! Backend wire types
//!
//! Payload shapes for the three HTTP endpoints and the push channel, and
//! their validated conversion into the domain model. Field names follow the
//! backend; English spellings are accepted as aliases.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::model::{
    parse_day_label, AggregateStats, CapturedAt, ClassificationRecord, CorrectionStatus,
    DeviceStatus, RecordId, RecordStatus, Verdict, WasteLabel, WeeklyActivity,
};
use crate::{Error, Result};

// ========================================
// Resource Locators
// ========================================

/// Canonicalize a backend-local image path into an absolute reference
///
/// Backslash separators become `/` and the path is prefixed with the
/// configured base URL. References that are already absolute URLs only get
/// their separators normalized.
///
/// ```
/// use wwm_common::api::resolve_image_ref;
///
/// assert_eq!(
///     resolve_image_ref("http://pi.local:5000/", "uploads\\2026\\a.jpg").unwrap(),
///     "http://pi.local:5000/uploads/2026/a.jpg"
/// );
/// ```
pub fn resolve_image_ref(base_url: &str, raw: &str) -> Result<String> {
    let normalized = raw.trim().replace('\\', "/");
    if normalized.is_empty() {
        return Err(Error::MalformedPayload("empty image path".to_string()));
    }
    if normalized.starts_with("http://") || normalized.starts_with("https://") {
        return Ok(normalized);
    }
    Ok(format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        normalized.trim_start_matches('/')
    ))
}

// ========================================
// Classification Records
// ========================================

/// Correction state as the backend reports it
///
/// The backend only knows settled states; pending states are local.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum WireCorrectionStatus {
    #[default]
    #[serde(rename = "belum_dinilai", alias = "unrated")]
    Unrated,
    #[serde(rename = "benar", alias = "correct")]
    Correct,
    #[serde(rename = "salah", alias = "incorrect")]
    Incorrect,
}

impl From<WireCorrectionStatus> for CorrectionStatus {
    fn from(status: WireCorrectionStatus) -> Self {
        match status {
            WireCorrectionStatus::Unrated => CorrectionStatus::Unrated,
            WireCorrectionStatus::Correct => CorrectionStatus::Correct,
            WireCorrectionStatus::Incorrect => CorrectionStatus::Incorrect,
        }
    }
}

/// One record as served by `/history`, pushed as `new_log`, or returned from
/// a correction
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecordPayload {
    pub id: RecordId,
    #[serde(alias = "image_ref", alias = "imageRef")]
    pub image_path: String,
    pub label: WasteLabel,
    pub confidence: f64,
    pub date: String,
    pub timestamp: String,
    #[serde(default, alias = "processing_time_ms", alias = "processingTimeMs")]
    pub processing_time: f64,
    #[serde(default, alias = "modelVersion")]
    pub model_version: String,
    pub status: RecordStatus,
    #[serde(default, alias = "correction_status", alias = "correctionStatus")]
    pub koreksi_status: WireCorrectionStatus,
}

impl RecordPayload {
    /// Validate and convert, resolving the image path against `base_url`
    pub fn into_record(self, base_url: &str) -> Result<ClassificationRecord> {
        if !self.confidence.is_finite() || !(0.0..=100.0).contains(&self.confidence) {
            return Err(Error::MalformedPayload(format!(
                "record {}: confidence {} outside 0..=100",
                self.id, self.confidence
            )));
        }
        if !self.processing_time.is_finite() || self.processing_time < 0.0 {
            return Err(Error::MalformedPayload(format!(
                "record {}: negative processing time",
                self.id
            )));
        }

        let captured_at = CapturedAt::parse(&self.date, &self.timestamp).map_err(|e| {
            Error::MalformedPayload(format!("record {}: {}", self.id, e))
        })?;

        Ok(ClassificationRecord {
            id: self.id,
            image_ref: resolve_image_ref(base_url, &self.image_path)?,
            label: self.label,
            confidence: self.confidence,
            captured_at,
            processing_time_ms: self.processing_time,
            model_version: self.model_version,
            status: self.status,
            correction_status: self.koreksi_status.into(),
        })
    }
}

/// Body of `POST /log/{id}/correction`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionRequest {
    pub verdict: Verdict,
}

// ========================================
// Aggregate Statistics
// ========================================

/// Category weights inside a stats payload
///
/// The backend also sends a `percentage` object; it is ignored because the
/// percentages are always recomputed from the weights.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatsBody {
    pub total: f64,
    #[serde(rename = "organik", alias = "organic")]
    pub organic: f64,
    #[serde(rename = "anorganik", alias = "inorganic")]
    pub inorganic: f64,
}

/// One day of weekly activity
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WeeklyEntry {
    pub day: String,
    pub amount: f64,
}

/// Payload of `GET /stats` and of the `update_stats` push event
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatsEnvelope {
    pub stats: StatsBody,
    #[serde(default, rename = "weeklyActivity", alias = "weekly_activity")]
    pub weekly_activity: Vec<WeeklyEntry>,
    #[serde(default, rename = "lastUpdated", alias = "last_updated")]
    pub last_updated: Option<Value>,
}

fn non_negative(field: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(Error::MalformedPayload(format!(
            "stats field '{field}' must be non-negative, got {value}"
        )))
    }
}

impl StatsEnvelope {
    /// Validate and convert into aggregate stats
    pub fn into_stats(self) -> Result<AggregateStats> {
        let total = non_negative("total", self.stats.total)?;
        let organic = non_negative("organik", self.stats.organic)?;
        let inorganic = non_negative("anorganik", self.stats.inorganic)?;

        // One unit of slack for rounding on the backend side
        if (organic + inorganic - total).abs() > 1.0 {
            return Err(Error::MalformedPayload(format!(
                "stats total {total} disagrees with organik {organic} + anorganik {inorganic}"
            )));
        }

        let mut weekly = WeeklyActivity::default();
        for entry in self.weekly_activity {
            let amount = non_negative("weeklyActivity.amount", entry.amount)?;
            match parse_day_label(&entry.day) {
                Some(day) => weekly.add(day, amount),
                None => debug!(day = %entry.day, "Dropping weekly entry with unknown day"),
            }
        }

        let last_updated = match self.last_updated {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
        };

        Ok(AggregateStats::new(total, organic, inorganic, weekly).with_last_updated(last_updated))
    }
}

// ========================================
// Device Status
// ========================================

/// Payload of the `device_status_update` push event
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DevicePayload {
    #[serde(default, alias = "deviceId")]
    pub device_id: Option<String>,
    #[serde(default)]
    pub online: Option<bool>,
    #[serde(default)]
    pub status: Option<String>,
}

impl DevicePayload {
    /// Validate and convert; either `online` or a recognizable `status` is required
    pub fn into_status(self) -> Result<DeviceStatus> {
        let online = match (self.online, self.status.as_deref()) {
            (Some(online), _) => online,
            (None, Some(status)) => match status.trim().to_ascii_lowercase().as_str() {
                "online" | "connected" | "up" => true,
                "offline" | "disconnected" | "down" => false,
                other => {
                    return Err(Error::MalformedPayload(format!(
                        "unknown device status '{other}'"
                    )))
                }
            },
            (None, None) => {
                return Err(Error::MalformedPayload(
                    "device status carries neither 'online' nor 'status'".to_string(),
                ))
            }
        };

        Ok(DeviceStatus {
            device_id: self.device_id.unwrap_or_default(),
            online,
        })
    }
}

// ========================================
// Push Event Names
// ========================================

/// Named events on the push channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushEventKind {
    DeviceStatus,
    Stats,
    Record,
}

impl PushEventKind {
    /// Map a backend event name (current or legacy spelling)
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "device_status_update" | "device_status" => Some(PushEventKind::DeviceStatus),
            "update_stats" | "stats_update" => Some(PushEventKind::Stats),
            "new_log" | "new_record" => Some(PushEventKind::Record),
            _ => None,
        }
    }

}
