//! `slotwise-core`: configuration, identifiers and the top-level error type
//! shared by every slotwise crate.

pub mod config;
pub mod error;
pub mod types;

pub use config::SlotwiseConfig;
pub use error::{Result, SlotwiseError};
pub use types::{ScheduleId, SlotId};
