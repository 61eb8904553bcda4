// End-to-end lifecycle of a schedule through the public store API,
// checked through the paginated projections a UI would render.

use chrono::{DateTime, Duration, TimeZone, Utc};
use slotwise_scheduler::view::{paginate, parse_jump};
use slotwise_scheduler::{
    Frequency, NewSchedule, ScheduleEdit, ScheduleStore, SchedulerError, SlotRemoval,
};

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
}

fn now() -> DateTime<Utc> {
    at(1, 8)
}

fn daily(name: &str, from: u32, to: u32) -> NewSchedule {
    NewSchedule {
        name: name.into(),
        frequency: Frequency::Daily,
        start_time: at(from, 9),
        end_time: at(to, 9),
        duration: 1.0,
    }
}

#[test]
fn create_edit_delete_lifecycle() {
    let mut store = ScheduleStore::new();
    let reading = store.create(daily("Reading", 2, 13), now()).unwrap();
    let gym = store
        .create(
            NewSchedule {
                name: "ignored".into(),
                frequency: Frequency::Once,
                start_time: at(3, 18),
                end_time: at(3, 18),
                duration: 1.5,
            },
            now(),
        )
        .unwrap();

    let views = store.projections();
    assert_eq!(views.time_slots.len(), 13);
    assert_eq!(views.schedules.len(), 2);
    assert_eq!(store.get(gym).unwrap().name, "Once");

    // Second page of the slot list holds the remaining three rows.
    let page = paginate(&views.time_slots, 2, 10);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.items.len(), 3);
    assert_eq!(parse_jump("2", page.total_pages), Some(2));
    assert_eq!(parse_jump("3", page.total_pages), None);

    // Move one occurrence, then shorten the rule: the moved one stays.
    let moved = store.get(reading).unwrap().time_slots[9].id;
    store.edit_slot(reading, moved, at(11, 20), 0.5).unwrap();
    store
        .edit_schedule(
            reading,
            ScheduleEdit {
                name: Some("Evening reading".into()),
                frequency: Frequency::Daily,
                start_time: at(2, 21),
                end_time: at(6, 21),
                duration: 1.0,
            },
        )
        .unwrap();

    let schedule = store.get(reading).unwrap();
    assert_eq!(schedule.name, "Evening reading");
    assert_eq!(schedule.time_slots.len(), 6);
    let kept = schedule.slot(moved).unwrap();
    assert!(kept.edited);
    assert_eq!(kept.start_time, at(11, 20));

    // Deleting the only slot of a one-off removes the schedule.
    let gym_slot = store.get(gym).unwrap().time_slots[0].id;
    assert_eq!(store.delete_slot(gym, gym_slot).unwrap(), SlotRemoval::ScheduleRemoved);
    assert!(store.get(gym).is_none());

    let err = store.delete_schedule(gym).unwrap_err();
    assert!(matches!(err, SchedulerError::ScheduleNotFound { .. }));

    assert_eq!(store.clear_all(), 1);
    assert!(store.projections().time_slots.is_empty());
}

#[test]
fn projections_interleave_schedules_chronologically() {
    let mut store = ScheduleStore::new();
    store.create(daily("A", 2, 4), now()).unwrap();
    let mut weekly = daily("B", 2, 16);
    weekly.frequency = Frequency::Weekly;
    weekly.start_time = at(2, 7);
    weekly.end_time = at(16, 7);
    store.create(weekly, now()).unwrap();

    let names: Vec<String> = store
        .projections()
        .time_slots
        .into_iter()
        .map(|r| r.schedule_name)
        .collect();
    assert_eq!(names, vec!["B", "A", "A", "A", "B", "B"]);
}

#[test]
fn rejected_creations_leave_store_untouched() {
    let mut store = ScheduleStore::new();

    let mut too_old = daily("late", 2, 4);
    too_old.start_time = now() - Duration::hours(25);
    assert_eq!(
        store.create(too_old, now()).unwrap_err().code(),
        "START_TOO_OLD"
    );

    let mut inverted = daily("inverted", 4, 2);
    inverted.frequency = Frequency::Weekly;
    assert_eq!(
        store.create(inverted, now()).unwrap_err().code(),
        "END_NOT_AFTER_START"
    );

    let mut zero = daily("zero", 2, 4);
    zero.duration = 0.0;
    assert!(store.create(zero, now()).unwrap_err().is_validation());

    assert!(store.is_empty());
}
