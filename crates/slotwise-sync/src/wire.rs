//! Persistence document format.
//!
//! The channel holds a JSON array of schedule records:
//!
//! ```json
//! [{
//!   "schedule_name": "Morning",
//!   "frequency": "daily",
//!   "start_time": 1704099600,
//!   "end_time": 1704272400,
//!   "duration": 1,
//!   "timeslots": [
//!     { "start_time": 1704099600, "end_time": 1704103200, "duration": 1, "edited": 0 }
//!   ]
//! }]
//! ```
//!
//! Timestamps are unix seconds (fractional when the instant has milliseconds).
//! A slot's `end_time` is always written as `start_time + duration * 3600`,
//! and on load the slot duration is recomputed from the two timestamps rather
//! than read from `duration`. Identifiers are not stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slotwise_core::{ScheduleId, SlotId};
use slotwise_scheduler::types::UNNAMED_SCHEDULE;
use slotwise_scheduler::{Frequency, Schedule, TimeSlot};
use tracing::warn;

use crate::error::{Result, SyncError};

/// One schedule as stored on the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRecord {
    #[serde(default = "default_name")]
    pub schedule_name: String,
    #[serde(default = "default_frequency")]
    pub frequency: Frequency,
    #[serde(with = "unix_seconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "unix_seconds")]
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub timeslots: Vec<SlotRecord>,
}

/// One occurrence as stored on the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotRecord {
    #[serde(with = "unix_seconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "unix_seconds")]
    pub end_time: DateTime<Utc>,
    /// Written for readers of the raw document; ignored on load.
    #[serde(default)]
    pub duration: f64,
    #[serde(with = "edited_flag", default)]
    pub edited: bool,
}

fn default_name() -> String {
    UNNAMED_SCHEDULE.to_string()
}

fn default_frequency() -> Frequency {
    Frequency::Once
}

impl From<&Schedule> for ScheduleRecord {
    fn from(schedule: &Schedule) -> Self {
        Self {
            schedule_name: schedule.name.clone(),
            frequency: schedule.frequency,
            start_time: schedule.start_time,
            end_time: schedule.end_time,
            duration: schedule.duration,
            timeslots: schedule
                .time_slots
                .iter()
                .map(|slot| SlotRecord {
                    start_time: slot.start_time,
                    end_time: slot.end_time(),
                    duration: slot.duration,
                    edited: slot.edited,
                })
                .collect(),
        }
    }
}

impl ScheduleRecord {
    /// Rebuild a schedule with fresh identifiers.
    ///
    /// Slots whose timestamps do not describe a positive duration are
    /// dropped; the caller prunes schedules left without slots.
    pub fn into_schedule(self) -> Schedule {
        let name = self.schedule_name;
        let time_slots = self
            .timeslots
            .into_iter()
            .filter_map(|record| {
                let duration =
                    (record.end_time - record.start_time).num_milliseconds() as f64 / 3_600_000.0;
                if duration > 0.0 {
                    Some(TimeSlot {
                        id: SlotId::new(),
                        start_time: record.start_time,
                        duration,
                        edited: record.edited,
                    })
                } else {
                    warn!(
                        schedule = %name,
                        start = %record.start_time,
                        "dropping stored time slot with non-positive duration"
                    );
                    None
                }
            })
            .collect();

        Schedule {
            id: ScheduleId::new(),
            name,
            frequency: self.frequency,
            start_time: self.start_time,
            end_time: self.end_time,
            duration: self.duration,
            time_slots,
        }
    }
}

/// Serialize schedules into the channel document. An empty slice yields `[]`.
pub fn encode_document(schedules: &[Schedule]) -> Result<serde_json::Value> {
    let records: Vec<ScheduleRecord> = schedules.iter().map(ScheduleRecord::from).collect();
    Ok(serde_json::to_value(records)?)
}

/// Parse a channel document back into schedules.
///
/// Accepts the array itself, the array wrapped in a JSON string (hosts that
/// store `JSON.stringify(payload)`), or `null` for an empty channel.
pub fn decode_document(document: serde_json::Value) -> Result<Vec<Schedule>> {
    let document = match document {
        serde_json::Value::Null => return Ok(Vec::new()),
        serde_json::Value::String(raw) if raw.trim().is_empty() => return Ok(Vec::new()),
        serde_json::Value::String(raw) => serde_json::from_str(&raw)
            .map_err(|e| SyncError::Decode(format!("string payload is not JSON: {e}")))?,
        other => other,
    };

    let records: Vec<ScheduleRecord> =
        serde_json::from_value(document).map_err(|e| SyncError::Decode(e.to_string()))?;
    Ok(records.into_iter().map(ScheduleRecord::into_schedule).collect())
}

/// Unix seconds, written as an integer when the instant has no sub-second part.
pub mod unix_seconds {
    use chrono::{DateTime, Utc};
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = at.timestamp_millis();
        if millis % 1000 == 0 {
            serializer.serialize_i64(millis / 1000)
        } else {
            serializer.serialize_f64(millis as f64 / 1000.0)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() {
            return Err(D::Error::custom("timestamp is not a finite number"));
        }
        DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
            .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {secs}")))
    }
}

/// `edited` is `0 | 1` on the wire; booleans are accepted on read.
mod edited_flag {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Number(f64),
    }

    pub fn serialize<S: Serializer>(edited: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*edited))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(match Flag::deserialize(deserializer)? {
            Flag::Bool(b) => b,
            Flag::Number(n) => n != 0.0,
        })
    }
}
