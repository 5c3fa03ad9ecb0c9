//! Classification record types

use std::cmp::Reverse;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::time::parse_capture_instant;
use crate::Result;

/// Server-assigned record identity, stable across resyncs
pub type RecordId = u64;

/// Waste category assigned by the classifier
///
/// Wire names are the backend's (`Organik`/`Anorganik`); English names are
/// accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WasteLabel {
    #[serde(rename = "Organik", alias = "Organic", alias = "organic")]
    Organic,
    #[serde(rename = "Anorganik", alias = "Inorganic", alias = "inorganic")]
    Inorganic,
}

impl WasteLabel {
    /// Backend display name
    pub fn as_str(&self) -> &'static str {
        match self {
            WasteLabel::Organic => "Organik",
            WasteLabel::Inorganic => "Anorganik",
        }
    }
}

impl fmt::Display for WasteLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline outcome for a single classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Success,
    Warning,
    Error,
}

/// Human verdict on a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Correct,
    Incorrect,
}

impl Verdict {
    /// Status shown while the verdict is in flight
    pub fn pending_status(self) -> CorrectionStatus {
        match self {
            Verdict::Correct => CorrectionStatus::PendingCorrect,
            Verdict::Incorrect => CorrectionStatus::PendingIncorrect,
        }
    }

    /// Status once the backend accepted the verdict
    pub fn settled_status(self) -> CorrectionStatus {
        match self {
            Verdict::Correct => CorrectionStatus::Correct,
            Verdict::Incorrect => CorrectionStatus::Incorrect,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Correct => f.write_str("correct"),
            Verdict::Incorrect => f.write_str("incorrect"),
        }
    }
}

/// Human-feedback state of a record
///
/// Transitions: `Unrated -> Pending* -> {Correct | Incorrect}`, or
/// `Pending* -> Unrated` when the round trip fails. The pending states are
/// local only and never come from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionStatus {
    #[default]
    Unrated,
    PendingCorrect,
    PendingIncorrect,
    Correct,
    Incorrect,
}

impl CorrectionStatus {
    /// True while a correction request for the record is outstanding
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            CorrectionStatus::PendingCorrect | CorrectionStatus::PendingIncorrect
        )
    }
}

/// Capture time as formatted by the backend plus its sortable instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapturedAt {
    /// Date as received (e.g. `16/10/2026`)
    pub date: String,
    /// Time of day as received (e.g. `14.05.32`)
    pub time: String,
    instant: NaiveDateTime,
}

impl CapturedAt {
    /// Parse the backend's date and time strings
    pub fn parse(date: &str, time: &str) -> Result<Self> {
        let instant = parse_capture_instant(date, time)?;
        Ok(Self {
            date: date.trim().to_string(),
            time: time.trim().to_string(),
            instant,
        })
    }

    /// Sortable instant derived from the formatted fields
    pub fn instant(&self) -> NaiveDateTime {
        self.instant
    }
}

/// One classified waste item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationRecord {
    pub id: RecordId,
    /// Absolute, resolvable image location
    pub image_ref: String,
    pub label: WasteLabel,
    /// Classifier confidence, 0..=100
    pub confidence: f64,
    pub captured_at: CapturedAt,
    pub processing_time_ms: f64,
    pub model_version: String,
    pub status: RecordStatus,
    pub correction_status: CorrectionStatus,
}

/// Sort key for display: most recent capture first, ties broken by larger id first
pub type DisplayKey = (Reverse<NaiveDateTime>, Reverse<RecordId>);

impl ClassificationRecord {
    pub fn display_key(&self) -> DisplayKey {
        (Reverse(self.captured_at.instant()), Reverse(self.id))
    }
}
