use chrono::{DateTime, Utc};
use serde::Serialize;
use slotwise_core::{ScheduleId, SlotId};
use tracing::debug;

use crate::types::{Frequency, Schedule};

/// One occurrence in the flat slot view, tagged with its owning schedule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotRow {
    pub schedule_id: ScheduleId,
    pub schedule_name: String,
    pub slot_id: SlotId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration: f64,
    pub edited: bool,
}

/// Summary of one schedule in the schedule view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleRow {
    pub schedule_id: ScheduleId,
    pub name: String,
    pub frequency: Frequency,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration: f64,
    pub slot_count: usize,
}

/// Both read models, ascending by start time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Projections {
    pub time_slots: Vec<SlotRow>,
    pub schedules: Vec<ScheduleRow>,
}

/// Flatten and sort the store contents for presentation.
///
/// Recomputed from scratch on every call. Both sorts are stable, so rows that
/// start at the same instant keep their store order.
pub fn derive_projections(schedules: &[Schedule]) -> Projections {
    let mut time_slots: Vec<SlotRow> = schedules
        .iter()
        .flat_map(|schedule| {
            schedule.time_slots.iter().map(move |slot| SlotRow {
                schedule_id: schedule.id,
                schedule_name: schedule.name.clone(),
                slot_id: slot.id,
                start_time: slot.start_time,
                end_time: slot.end_time(),
                duration: slot.duration,
                edited: slot.edited,
            })
        })
        .collect();
    time_slots.sort_by_key(|row| row.start_time);

    let mut rows: Vec<ScheduleRow> = schedules
        .iter()
        .map(|s| ScheduleRow {
            schedule_id: s.id,
            name: s.name.clone(),
            frequency: s.frequency,
            start_time: s.start_time,
            end_time: s.end_time,
            duration: s.duration,
            slot_count: s.time_slots.len(),
        })
        .collect();
    rows.sort_by_key(|row| row.start_time);

    debug!(
        slots = time_slots.len(),
        schedules = rows.len(),
        "projections derived"
    );
    Projections {
        time_slots,
        schedules: rows,
    }
}
