use chrono::{DateTime, Utc};

use crate::schedule::occurrences;
use crate::types::{Frequency, TimeSlot};

/// Regenerate a schedule's slots after its recurrence parameters change.
///
/// Occurrences the user edited directly are carried over untouched, even when
/// they fall outside the new window. Everything else is regenerated from the
/// new rule with `new_duration`. A regenerated slot keeps the id of the
/// unedited slot it replaces at the same instant, so callers holding slot ids
/// are not invalidated by a no-op edit.
pub fn reconcile(
    existing: &[TimeSlot],
    new_start: DateTime<Utc>,
    new_end: DateTime<Utc>,
    new_duration: f64,
    new_frequency: Frequency,
) -> Vec<TimeSlot> {
    let fresh = |at: DateTime<Utc>| {
        let mut slot = TimeSlot::new(at, new_duration);
        if let Some(previous) = existing.iter().find(|s| !s.edited && s.start_time == at) {
            slot.id = previous.id;
        }
        slot
    };

    let mut result: Vec<TimeSlot> = if new_frequency.is_recurring() {
        occurrences(new_start, new_end, new_frequency)
            .into_iter()
            .map(|at| {
                existing
                    .iter()
                    .find(|s| s.edited && s.start_time == at)
                    .cloned()
                    .unwrap_or_else(|| fresh(at))
            })
            .collect()
    } else {
        match existing.iter().find(|s| s.edited) {
            Some(edited) => vec![edited.clone()],
            None => vec![fresh(new_start)],
        }
    };

    // Edited occurrences the new rule no longer produces are kept as-is.
    for slot in existing.iter().filter(|s| s.edited) {
        if !result.iter().any(|r| r.start_time == slot.start_time) {
            result.push(slot.clone());
        }
    }

    result.sort_by_key(|s| s.start_time);
    result
}
