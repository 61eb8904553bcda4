use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use slotwise_core::{ScheduleId, SlotId};

use crate::error::SchedulerError;

/// Display name given to every non-recurring schedule.
pub const ONCE_NAME: &str = "Once";
/// Display name for a recurring schedule saved without one.
pub const UNNAMED_SCHEDULE: &str = "Unnamed Schedule";

/// How often a schedule repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Once,
    Daily,
    Weekly,
}

impl Frequency {
    /// Fixed distance between consecutive occurrences; `None` for `Once`.
    pub fn period(self) -> Option<Duration> {
        match self {
            Frequency::Once => None,
            Frequency::Daily => Some(Duration::days(1)),
            Frequency::Weekly => Some(Duration::weeks(1)),
        }
    }

    pub fn is_recurring(self) -> bool {
        self != Frequency::Once
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Frequency::Once => "once",
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Frequency {
    type Err = SchedulerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "once" => Ok(Frequency::Once),
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            other => Err(SchedulerError::InvalidFrequency(other.to_string())),
        }
    }
}

/// Convert fractional hours to a chrono duration at millisecond precision.
///
/// `None` when `hours` is not finite or does not fit a [`Duration`].
pub fn hours_to_duration(hours: f64) -> Option<Duration> {
    let millis = (hours * 3_600_000.0).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    Duration::try_milliseconds(millis as i64)
}

/// End of an occurrence starting at `start`, or `None` when it falls outside
/// the range chrono can represent.
pub fn slot_end(start: DateTime<Utc>, hours: f64) -> Option<DateTime<Utc>> {
    start.checked_add_signed(hours_to_duration(hours)?)
}

/// One concrete occurrence of a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: SlotId,
    pub start_time: DateTime<Utc>,
    /// Length in hours; always positive.
    pub duration: f64,
    /// Set when the user changed this occurrence directly. Edited slots
    /// survive regeneration of the parent schedule.
    pub edited: bool,
}

impl TimeSlot {
    /// A generated (unedited) occurrence.
    pub fn new(start_time: DateTime<Utc>, duration: f64) -> Self {
        Self {
            id: SlotId::new(),
            start_time,
            duration,
            edited: false,
        }
    }

    /// Saturates at [`DateTime::MAX_UTC`]; the store never admits such a slot.
    pub fn end_time(&self) -> DateTime<Utc> {
        slot_end(self.start_time, self.duration).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// A recurrence rule together with the slots generated from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: ScheduleId,
    pub name: String,
    pub frequency: Frequency,
    pub start_time: DateTime<Utc>,
    /// Ignored when generating `Once` occurrences.
    pub end_time: DateTime<Utc>,
    /// Default hours for newly generated occurrences.
    pub duration: f64,
    /// Not kept sorted; projections sort before surfacing.
    pub time_slots: Vec<TimeSlot>,
}

impl Schedule {
    pub fn is_empty(&self) -> bool {
        self.time_slots.is_empty()
    }

    pub fn slot(&self, slot_id: SlotId) -> Option<&TimeSlot> {
        self.time_slots.iter().find(|s| s.id == slot_id)
    }

    /// First slot whose start matches `at` exactly.
    pub fn slot_at(&self, at: DateTime<Utc>) -> Option<&TimeSlot> {
        self.time_slots.iter().find(|s| s.start_time == at)
    }
}

/// Parameters for [`ScheduleStore::create`](crate::store::ScheduleStore::create).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSchedule {
    #[serde(default)]
    pub name: String,
    pub frequency: Frequency,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration: f64,
}

/// Replacement recurrence parameters for an existing schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEdit {
    /// New display name; `None` or blank keeps the current one.
    #[serde(default)]
    pub name: Option<String>,
    pub frequency: Frequency,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration: f64,
}

/// Name a freshly created schedule is stored under.
pub fn display_name(frequency: Frequency, requested: &str) -> String {
    if !frequency.is_recurring() {
        ONCE_NAME.to_string()
    } else if requested.trim().is_empty() {
        UNNAMED_SCHEDULE.to_string()
    } else {
        requested.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::str::FromStr;

    #[test]
    fn frequency_display_and_parse() {
        assert_eq!(Frequency::Weekly.to_string(), "weekly");
        assert_eq!(Frequency::from_str("Daily").unwrap(), Frequency::Daily);
        assert_eq!(Frequency::from_str(" once ").unwrap(), Frequency::Once);
        assert!(Frequency::from_str("monthly").is_err());
    }

    #[test]
    fn frequency_serializes_lowercase() {
        let json = serde_json::to_string(&Frequency::Daily).unwrap();
        assert_eq!(json, "\"daily\"");
    }

    #[test]
    fn slot_end_time_handles_fractional_hours() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap();
        let slot = TimeSlot::new(start, 1.5);
        assert_eq!(slot.end_time(), Utc.with_ymd_and_hms(2024, 3, 1, 7, 30, 0).unwrap());
        assert!(!slot.edited);
    }

    #[test]
    fn slot_end_rejects_unrepresentable_instants() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap();
        assert_eq!(slot_end(start, 2.0), Some(start + Duration::hours(2)));
        assert_eq!(slot_end(start, 1e12), None);
        assert_eq!(slot_end(start, f64::INFINITY), None);
        assert_eq!(slot_end(DateTime::<Utc>::MAX_UTC, 1.0), None);
        assert!(hours_to_duration(1e300).is_none());
    }

    #[test]
    fn oversized_slot_end_saturates_instead_of_panicking() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap();
        let slot = TimeSlot::new(start, 1e12);
        assert_eq!(slot.end_time(), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn once_is_always_named_once() {
        assert_eq!(display_name(Frequency::Once, "Irrigation"), ONCE_NAME);
    }

    #[test]
    fn blank_recurring_name_gets_placeholder() {
        assert_eq!(display_name(Frequency::Daily, ""), UNNAMED_SCHEDULE);
        assert_eq!(display_name(Frequency::Weekly, "   "), UNNAMED_SCHEDULE);
        assert_eq!(display_name(Frequency::Weekly, "Top-up"), "Top-up");
    }
}
