//! `slotwise-scheduler`: recurring schedules, their concrete time slots and
//! the in-memory store that owns them.
//!
//! # Overview
//!
//! A [`Schedule`] is a recurrence rule (frequency, window, default duration)
//! plus the [`TimeSlot`]s generated from it. The [`schedule::expand`] function
//! turns a rule into slots; [`reconcile::reconcile`] regenerates slots after
//! the rule changes without discarding occurrences the user edited by hand.
//! [`ScheduleStore`] applies user intents and [`projection::derive_projections`]
//! produces the sorted read models the presentation layer paginates.
//!
//! # Frequencies
//!
//! | Variant  | Occurrences                                         |
//! |----------|-----------------------------------------------------|
//! | `Once`   | Exactly one, at the start instant                   |
//! | `Daily`  | `start + n·24h` while `<= end`                      |
//! | `Weekly` | `start + n·7d` while `<= end`                       |

pub mod error;
pub mod projection;
pub mod reconcile;
pub mod schedule;
pub mod store;
pub mod types;
pub mod view;

pub use error::{Result, SchedulerError};
pub use projection::{derive_projections, Projections, ScheduleRow, SlotRow};
pub use store::{ScheduleStore, SlotRemoval};
pub use types::{Frequency, NewSchedule, Schedule, ScheduleEdit, TimeSlot};
pub use view::{Page, ViewMode};
