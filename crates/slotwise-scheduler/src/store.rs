use chrono::{DateTime, Duration, Utc};
use slotwise_core::config::MAX_PAST_START_HOURS;
use slotwise_core::{ScheduleId, SlotId};
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SchedulerError};
use crate::projection::{derive_projections, Projections};
use crate::reconcile::reconcile;
use crate::schedule::{expand, occurrence_count, occurrences, MAX_OCCURRENCES};
use crate::types::{
    display_name, slot_end, Frequency, NewSchedule, Schedule, ScheduleEdit, TimeSlot,
};

/// What [`ScheduleStore::delete_slot`] ended up removing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRemoval {
    /// The slot is gone; its schedule still has other slots.
    SlotRemoved,
    /// The slot was the schedule's last one, so the schedule was pruned too.
    ScheduleRemoved,
}

/// In-memory collection of schedules.
///
/// There is exactly one writer; callers that share a store across tasks wrap
/// it in a mutex. Insertion order is preserved, projections sort on demand.
#[derive(Debug, Clone, Default)]
pub struct ScheduleStore {
    schedules: Vec<Schedule>,
}

impl ScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from previously persisted schedules.
    ///
    /// Schedules without slots count as deleted and are dropped.
    pub fn from_schedules(schedules: Vec<Schedule>) -> Self {
        let before = schedules.len();
        let schedules: Vec<Schedule> = schedules.into_iter().filter(|s| !s.is_empty()).collect();
        if schedules.len() < before {
            warn!(pruned = before - schedules.len(), "dropped schedules without time slots");
        }
        Self { schedules }
    }

    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }

    pub fn schedules(&self) -> &[Schedule] {
        &self.schedules
    }

    pub fn iter(&self) -> impl Iterator<Item = &Schedule> {
        self.schedules.iter()
    }

    pub fn get(&self, id: ScheduleId) -> Option<&Schedule> {
        self.schedules.iter().find(|s| s.id == id)
    }

    /// First schedule carrying `name`. Names are not unique; prefer ids.
    pub fn find_by_name(&self, name: &str) -> Option<&Schedule> {
        self.schedules.iter().find(|s| s.name == name)
    }

    /// Sorted read models for the presentation layer.
    pub fn projections(&self) -> Projections {
        derive_projections(&self.schedules)
    }

    /// Validate, expand and append a new schedule.
    ///
    /// `now` anchors the "not too far in the past" check.
    #[instrument(skip(self), fields(frequency = %new.frequency))]
    pub fn create(&mut self, new: NewSchedule, now: DateTime<Utc>) -> Result<ScheduleId> {
        let oldest_allowed = now - Duration::hours(MAX_PAST_START_HOURS);
        if new.start_time < oldest_allowed {
            return Err(SchedulerError::StartTooOld {
                start: new.start_time,
                max_hours: MAX_PAST_START_HOURS,
            });
        }
        validate_rule(new.frequency, new.start_time, new.end_time, new.duration)?;

        let schedule = Schedule {
            id: ScheduleId::new(),
            name: display_name(new.frequency, &new.name),
            frequency: new.frequency,
            start_time: new.start_time,
            end_time: new.end_time,
            duration: new.duration,
            time_slots: expand(new.start_time, new.end_time, new.duration, new.frequency),
        };
        let id = schedule.id;

        info!(
            schedule_id = %id,
            name = %schedule.name,
            slots = schedule.time_slots.len(),
            "schedule created"
        );
        self.schedules.push(schedule);
        Ok(id)
    }

    /// Override a single occurrence; the slot is flagged as edited.
    #[instrument(skip(self))]
    pub fn edit_slot(
        &mut self,
        schedule_id: ScheduleId,
        slot_id: SlotId,
        new_start: DateTime<Utc>,
        new_duration: f64,
    ) -> Result<()> {
        validate_slot(new_start, new_duration)?;

        let schedule = self.get_mut(schedule_id)?;
        let slot = schedule
            .time_slots
            .iter_mut()
            .find(|s| s.id == slot_id)
            .ok_or(SchedulerError::SlotNotFound {
                schedule_id,
                slot_id,
            })?;

        *slot = TimeSlot {
            id: slot_id,
            start_time: new_start,
            duration: new_duration,
            edited: true,
        };
        debug!(%schedule_id, %slot_id, "time slot edited");
        Ok(())
    }

    /// Replace a schedule's recurrence parameters and regenerate its slots,
    /// keeping every slot the user edited directly.
    #[instrument(skip(self))]
    pub fn edit_schedule(&mut self, schedule_id: ScheduleId, edit: ScheduleEdit) -> Result<()> {
        validate_rule(edit.frequency, edit.start_time, edit.end_time, edit.duration)?;

        let schedule = self.get_mut(schedule_id)?;
        let slots = reconcile(
            &schedule.time_slots,
            edit.start_time,
            edit.end_time,
            edit.duration,
            edit.frequency,
        );

        if let Some(name) = edit.name.filter(|n| !n.trim().is_empty()) {
            schedule.name = name;
        }
        schedule.frequency = edit.frequency;
        schedule.start_time = edit.start_time;
        schedule.end_time = edit.end_time;
        schedule.duration = edit.duration;
        schedule.time_slots = slots;

        info!(
            %schedule_id,
            frequency = %schedule.frequency,
            slots = schedule.time_slots.len(),
            "schedule updated"
        );
        Ok(())
    }

    /// Remove one occurrence, pruning the schedule if it was the last one.
    #[instrument(skip(self))]
    pub fn delete_slot(&mut self, schedule_id: ScheduleId, slot_id: SlotId) -> Result<SlotRemoval> {
        let index = self.index_of(schedule_id)?;
        let schedule = &mut self.schedules[index];
        let slot_index = schedule
            .time_slots
            .iter()
            .position(|s| s.id == slot_id)
            .ok_or(SchedulerError::SlotNotFound {
                schedule_id,
                slot_id,
            })?;

        schedule.time_slots.remove(slot_index);
        if schedule.is_empty() {
            self.schedules.remove(index);
            info!(%schedule_id, "last time slot deleted, schedule removed");
            return Ok(SlotRemoval::ScheduleRemoved);
        }

        debug!(%schedule_id, %slot_id, "time slot deleted");
        Ok(SlotRemoval::SlotRemoved)
    }

    /// Remove a schedule and all of its slots.
    #[instrument(skip(self))]
    pub fn delete_schedule(&mut self, schedule_id: ScheduleId) -> Result<Schedule> {
        let index = self.index_of(schedule_id)?;
        let removed = self.schedules.remove(index);
        info!(%schedule_id, name = %removed.name, "schedule deleted");
        Ok(removed)
    }

    /// Remove everything. Returns how many schedules were dropped.
    pub fn clear_all(&mut self) -> usize {
        let n = self.schedules.len();
        self.schedules.clear();
        info!(count = n, "all schedules cleared");
        n
    }

    fn index_of(&self, id: ScheduleId) -> Result<usize> {
        self.schedules
            .iter()
            .position(|s| s.id == id)
            .ok_or(SchedulerError::ScheduleNotFound { id })
    }

    fn get_mut(&mut self, id: ScheduleId) -> Result<&mut Schedule> {
        self.schedules
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(SchedulerError::ScheduleNotFound { id })
    }
}

/// The duration must be positive and the slot must end at a representable instant.
fn validate_slot(start: DateTime<Utc>, duration: f64) -> Result<()> {
    if duration.is_finite() && duration > 0.0 && slot_end(start, duration).is_some() {
        Ok(())
    } else {
        Err(SchedulerError::InvalidDuration(duration))
    }
}

fn validate_rule(
    frequency: Frequency,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    duration: f64,
) -> Result<()> {
    validate_slot(start, duration)?;
    if frequency.is_recurring() && end <= start {
        return Err(SchedulerError::EndNotAfterStart { start, end });
    }
    let count = occurrence_count(start, end, frequency);
    if count > MAX_OCCURRENCES {
        return Err(SchedulerError::TooManyOccurrences {
            count,
            max: MAX_OCCURRENCES,
        });
    }
    // The last occurrence ends latest.
    if let Some(&last) = occurrences(start, end, frequency).last() {
        validate_slot(last, duration)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ONCE_NAME, UNNAMED_SCHEDULE};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 9, 0, 0).unwrap()
    }

    fn daily(name: &str, from: u32, to: u32) -> NewSchedule {
        NewSchedule {
            name: name.to_string(),
            frequency: Frequency::Daily,
            start_time: day(from),
            end_time: day(to),
            duration: 1.0,
        }
    }

    #[test]
    fn create_daily_expands_slots() {
        let mut store = ScheduleStore::new();
        let id = store.create(daily("Morning", 1, 3), now()).unwrap();

        let schedule = store.get(id).unwrap();
        assert_eq!(schedule.name, "Morning");
        assert_eq!(schedule.time_slots.len(), 3);
    }

    #[test]
    fn create_applies_naming_defaults() {
        let mut store = ScheduleStore::new();
        let once = store
            .create(
                NewSchedule {
                    frequency: Frequency::Once,
                    ..daily("ignored", 2, 2)
                },
                now(),
            )
            .unwrap();
        let unnamed = store.create(daily("", 1, 2), now()).unwrap();

        assert_eq!(store.get(once).unwrap().name, ONCE_NAME);
        assert_eq!(store.get(once).unwrap().time_slots.len(), 1);
        assert_eq!(store.get(unnamed).unwrap().name, UNNAMED_SCHEDULE);
    }

    #[test]
    fn create_rejects_start_25_hours_ago() {
        let mut store = ScheduleStore::new();
        let start = now() - Duration::hours(25);
        let new = NewSchedule {
            name: String::new(),
            frequency: Frequency::Once,
            start_time: start,
            end_time: start,
            duration: 1.0,
        };

        let err = store.create(new, now()).unwrap_err();
        assert!(matches!(err, SchedulerError::StartTooOld { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn create_accepts_start_23_hours_ago() {
        let mut store = ScheduleStore::new();
        let start = now() - Duration::hours(23);
        let new = NewSchedule {
            name: String::new(),
            frequency: Frequency::Once,
            start_time: start,
            end_time: start,
            duration: 1.0,
        };
        assert!(store.create(new, now()).is_ok());
    }

    #[test]
    fn create_daily_rejects_end_not_after_start() {
        let mut store = ScheduleStore::new();
        for (from, to) in [(3, 3), (3, 2)] {
            let err = store.create(daily("x", from, to), now()).unwrap_err();
            assert!(matches!(err, SchedulerError::EndNotAfterStart { .. }));
            assert_eq!(err.code(), "END_NOT_AFTER_START");
        }
        assert!(store.is_empty());
    }

    #[test]
    fn create_rejects_non_positive_duration() {
        let mut store = ScheduleStore::new();
        for duration in [0.0, -1.0, f64::NAN] {
            let new = NewSchedule {
                duration,
                ..daily("x", 1, 2)
            };
            let err = store.create(new, now()).unwrap_err();
            assert!(matches!(err, SchedulerError::InvalidDuration(_)));
        }
    }

    #[test]
    fn create_rejects_oversized_window() {
        let mut store = ScheduleStore::new();
        let new = NewSchedule {
            end_time: day(1) + Duration::days(MAX_OCCURRENCES as i64 + 5),
            ..daily("forever", 1, 2)
        };
        let err = store.create(new, now()).unwrap_err();
        assert!(matches!(err, SchedulerError::TooManyOccurrences { .. }));
    }

    #[test]
    fn edit_slot_marks_edited() {
        let mut store = ScheduleStore::new();
        let id = store.create(daily("a", 1, 3), now()).unwrap();
        let slot_id = store.get(id).unwrap().time_slots[1].id;

        let moved = day(2) + Duration::hours(3);
        store.edit_slot(id, slot_id, moved, 2.0).unwrap();

        let slot = store.get(id).unwrap().slot(slot_id).unwrap();
        assert_eq!(slot.start_time, moved);
        assert_eq!(slot.duration, 2.0);
        assert!(slot.edited);
    }

    #[test]
    fn edit_slot_reports_missing_targets() {
        let mut store = ScheduleStore::new();
        let id = store.create(daily("a", 1, 3), now()).unwrap();

        let err = store.edit_slot(ScheduleId::new(), SlotId::new(), day(1), 1.0).unwrap_err();
        assert!(matches!(err, SchedulerError::ScheduleNotFound { .. }));

        let err = store.edit_slot(id, SlotId::new(), day(1), 1.0).unwrap_err();
        assert!(matches!(err, SchedulerError::SlotNotFound { .. }));
        assert!(err.is_not_found());
    }

    #[test]
    fn edit_schedule_keeps_edited_slot() {
        let mut store = ScheduleStore::new();
        let id = store.create(daily("a", 1, 5), now()).unwrap();
        let slot_id = store.get(id).unwrap().time_slots[2].id;
        store.edit_slot(id, slot_id, day(3), 4.0).unwrap();

        store
            .edit_schedule(
                id,
                ScheduleEdit {
                    name: Some("renamed".into()),
                    frequency: Frequency::Daily,
                    start_time: day(1),
                    end_time: day(7),
                    duration: 0.5,
                },
            )
            .unwrap();

        let schedule = store.get(id).unwrap();
        assert_eq!(schedule.name, "renamed");
        assert_eq!(schedule.end_time, day(7));
        assert_eq!(schedule.time_slots.len(), 7);
        let kept = schedule.slot(slot_id).unwrap();
        assert!(kept.edited);
        assert_eq!(kept.duration, 4.0);
    }

    #[test]
    fn edit_schedule_blank_name_keeps_current() {
        let mut store = ScheduleStore::new();
        let id = store.create(daily("keep me", 1, 2), now()).unwrap();
        store
            .edit_schedule(
                id,
                ScheduleEdit {
                    name: Some("  ".into()),
                    frequency: Frequency::Weekly,
                    start_time: day(1),
                    end_time: day(20),
                    duration: 1.0,
                },
            )
            .unwrap();
        assert_eq!(store.get(id).unwrap().name, "keep me");
    }

    #[test]
    fn edit_schedule_validates_window() {
        let mut store = ScheduleStore::new();
        let id = store.create(daily("a", 1, 3), now()).unwrap();
        let before = store.get(id).unwrap().clone();

        let err = store
            .edit_schedule(
                id,
                ScheduleEdit {
                    name: None,
                    frequency: Frequency::Weekly,
                    start_time: day(5),
                    end_time: day(4),
                    duration: 1.0,
                },
            )
            .unwrap_err();

        assert!(matches!(err, SchedulerError::EndNotAfterStart { .. }));
        assert_eq!(store.get(id).unwrap(), &before);
    }

    #[test]
    fn deleting_last_slot_removes_schedule() {
        let mut store = ScheduleStore::new();
        let id = store.create(daily("a", 1, 2), now()).unwrap();
        let slots: Vec<SlotId> = store.get(id).unwrap().time_slots.iter().map(|s| s.id).collect();

        assert_eq!(store.delete_slot(id, slots[0]).unwrap(), SlotRemoval::SlotRemoved);
        assert_eq!(store.len(), 1);
        assert_eq!(store.delete_slot(id, slots[1]).unwrap(), SlotRemoval::ScheduleRemoved);
        assert!(store.get(id).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn delete_schedule_and_clear_all() {
        let mut store = ScheduleStore::new();
        let a = store.create(daily("a", 1, 2), now()).unwrap();
        store.create(daily("b", 1, 2), now()).unwrap();
        store.create(daily("c", 1, 2), now()).unwrap();

        assert_eq!(store.delete_schedule(a).unwrap().name, "a");
        assert!(matches!(
            store.delete_schedule(a),
            Err(SchedulerError::ScheduleNotFound { .. })
        ));
        assert_eq!(store.clear_all(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn duplicate_names_are_distinct_schedules() {
        let mut store = ScheduleStore::new();
        let first = store.create(daily("pump", 1, 2), now()).unwrap();
        let second = store.create(daily("pump", 3, 4), now()).unwrap();

        assert_ne!(first, second);
        assert_eq!(store.find_by_name("pump").unwrap().id, first);
        store.delete_schedule(first).unwrap();
        assert_eq!(store.find_by_name("pump").unwrap().id, second);
    }

    #[test]
    fn from_schedules_prunes_empty() {
        let mut store = ScheduleStore::new();
        let id = store.create(daily("a", 1, 2), now()).unwrap();
        let mut empty = store.get(id).unwrap().clone();
        empty.id = ScheduleId::new();
        empty.time_slots.clear();

        let mut all = store.schedules().to_vec();
        all.push(empty);
        let rebuilt = ScheduleStore::from_schedules(all);
        assert_eq!(rebuilt.len(), 1);
    }

    #[test]
    fn unrepresentable_slot_end_is_rejected() {
        let mut store = ScheduleStore::new();
        let huge = NewSchedule {
            frequency: Frequency::Once,
            duration: 1e12,
            ..daily("huge", 2, 2)
        };
        assert!(matches!(
            store.create(huge, now()),
            Err(SchedulerError::InvalidDuration(_))
        ));
        assert!(store.is_empty());
        assert!(store.projections().time_slots.is_empty());
    }

    #[test]
    fn last_occurrence_must_end_in_range() {
        let mut store = ScheduleStore::new();
        let end = DateTime::<Utc>::MAX_UTC;
        let start = end - Duration::days(2);
        let at_limit = NewSchedule {
            start_time: start,
            end_time: end,
            ..daily("edge", 1, 2)
        };
        assert!(matches!(
            store.create(at_limit, start),
            Err(SchedulerError::InvalidDuration(_))
        ));

        let fits = NewSchedule {
            start_time: start,
            end_time: end - Duration::hours(2),
            ..daily("edge", 1, 2)
        };
        let id = store.create(fits, start).unwrap();
        assert_eq!(store.get(id).unwrap().time_slots.len(), 2);
        assert_eq!(store.projections().time_slots.len(), 2);
    }

    #[test]
    fn edit_slot_rejects_unrepresentable_end() {
        let mut store = ScheduleStore::new();
        let id = store.create(daily("a", 1, 2), now()).unwrap();
        let before = store.get(id).unwrap().time_slots[0].clone();

        let result = store.edit_slot(id, before.id, day(3), 1e12);
        assert!(matches!(result, Err(SchedulerError::InvalidDuration(_))));
        assert_eq!(store.get(id).unwrap().time_slots[0], before);
    }
}
