use chrono::{DateTime, Utc};
use slotwise_core::{ScheduleId, SlotId};
use thiserror::Error;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The requested start lies further in the past than new schedules allow.
    #[error("Start time {start} is more than {max_hours} hours in the past")]
    StartTooOld { start: DateTime<Utc>, max_hours: i64 },

    /// A recurring schedule needs a window that ends after it starts.
    #[error("End time {end} must be after start time {start} for recurring schedules")]
    EndNotAfterStart {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Durations are hours and must be positive and finite.
    #[error("Invalid duration: {0} hours")]
    InvalidDuration(f64),

    /// The window would expand into more occurrences than the store accepts.
    #[error("Too many occurrences: {count} (max {max})")]
    TooManyOccurrences { count: usize, max: usize },

    /// Frequency string did not match `once`, `daily` or `weekly`.
    #[error("Invalid frequency: {0}")]
    InvalidFrequency(String),

    /// No schedule with the given ID exists in the store.
    #[error("Schedule not found: {id}")]
    ScheduleNotFound { id: ScheduleId },

    /// The schedule exists but has no slot with the given ID.
    #[error("Time slot {slot_id} not found in schedule {schedule_id}")]
    SlotNotFound {
        schedule_id: ScheduleId,
        slot_id: SlotId,
    },
}

impl SchedulerError {
    /// Short error code string returned to HTTP clients.
    pub fn code(&self) -> &'static str {
        match self {
            SchedulerError::StartTooOld { .. } => "START_TOO_OLD",
            SchedulerError::EndNotAfterStart { .. } => "END_NOT_AFTER_START",
            SchedulerError::InvalidDuration(_) => "INVALID_DURATION",
            SchedulerError::TooManyOccurrences { .. } => "TOO_MANY_OCCURRENCES",
            SchedulerError::InvalidFrequency(_) => "INVALID_FREQUENCY",
            SchedulerError::ScheduleNotFound { .. } => "SCHEDULE_NOT_FOUND",
            SchedulerError::SlotNotFound { .. } => "SLOT_NOT_FOUND",
        }
    }

    /// True for errors caused by the request payload rather than store state.
    pub fn is_validation(&self) -> bool {
        !self.is_not_found()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SchedulerError::ScheduleNotFound { .. } | SchedulerError::SlotNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
