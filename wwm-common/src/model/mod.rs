//! Domain model shared by the dashboard crates

mod device;
mod record;
mod stats;

pub use device::{ConnectionState, DeviceStatus};
pub use record::{
    CapturedAt, ClassificationRecord, CorrectionStatus, DisplayKey, RecordId, RecordStatus,
    Verdict, WasteLabel,
};
pub use stats::{day_label, parse_day_label, percent_split, AggregateStats, WeeklyActivity};
