use chrono::{DateTime, Utc};

use crate::types::{Frequency, TimeSlot};

/// Upper bound on occurrences a single schedule may expand into.
pub const MAX_OCCURRENCES: usize = 10_000;

/// Instants generated by a recurrence rule, in ascending order.
///
/// `Once` yields `start` alone and ignores `end`. Recurring frequencies yield
/// `start, start + period, …` up to and including the last instant `<= end`;
/// an inverted window yields nothing (callers validate before expanding).
pub fn occurrences(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    frequency: Frequency,
) -> Vec<DateTime<Utc>> {
    let Some(period) = frequency.period() else {
        return vec![start];
    };

    let mut out = Vec::with_capacity(occurrence_count(start, end, frequency));
    let mut at = start;
    while at <= end {
        out.push(at);
        match at.checked_add_signed(period) {
            Some(next) => at = next,
            None => break,
        }
    }
    out
}

/// Number of instants [`occurrences`] would produce, without allocating.
pub fn occurrence_count(start: DateTime<Utc>, end: DateTime<Utc>, frequency: Frequency) -> usize {
    match frequency.period() {
        None => 1,
        Some(_) if end < start => 0,
        Some(period) => {
            let span = (end - start).num_milliseconds();
            (span / period.num_milliseconds()) as usize + 1
        }
    }
}

/// Expand a recurrence rule into fresh, unedited time slots.
pub fn expand(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    duration: f64,
    frequency: Frequency,
) -> Vec<TimeSlot> {
    occurrences(start, end, frequency)
        .into_iter()
        .map(|at| TimeSlot::new(at, duration))
        .collect()
}
