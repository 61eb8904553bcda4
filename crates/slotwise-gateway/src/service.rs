//! Intent dispatch: every mutation goes through [`ScheduleService::apply`],
//! which updates the store and queues a full snapshot for persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slotwise_core::{ScheduleId, SlotId};
use slotwise_scheduler::{
    Frequency, NewSchedule, ScheduleEdit, ScheduleStore, SchedulerError, SlotRemoval,
};
use slotwise_sync::{SyncError, SyncGateway};
use thiserror::Error;
use tracing::debug;

/// A user action against the store.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    Create(NewSchedule),
    EditSlot {
        schedule_id: ScheduleId,
        slot_id: SlotId,
        start_time: DateTime<Utc>,
        duration: f64,
    },
    EditSchedule {
        schedule_id: ScheduleId,
        #[serde(default)]
        name: Option<String>,
        frequency: Frequency,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        duration: f64,
    },
    DeleteSlot {
        schedule_id: ScheduleId,
        slot_id: SlotId,
    },
    DeleteSchedule {
        schedule_id: ScheduleId,
    },
    ClearAll,
}

impl Intent {
    fn kind(&self) -> &'static str {
        match self {
            Intent::Create(_) => "create",
            Intent::EditSlot { .. } => "edit_slot",
            Intent::EditSchedule { .. } => "edit_schedule",
            Intent::DeleteSlot { .. } => "delete_slot",
            Intent::DeleteSchedule { .. } => "delete_schedule",
            Intent::ClearAll => "clear_all",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Created { schedule_id: ScheduleId },
    SlotEdited,
    ScheduleEdited,
    SlotDeleted { schedule_removed: bool },
    ScheduleDeleted,
    Cleared { count: usize },
}

/// Result of a successful intent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Applied {
    #[serde(flatten)]
    pub outcome: Outcome,
    /// Snapshot generation queued for persistence.
    pub generation: u64,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Scheduler(e) => e.code(),
            ServiceError::Sync(e) => e.code(),
        }
    }
}

/// The store plus the gateway that persists it. Single writer; the HTTP
/// layer keeps it behind a mutex.
pub struct ScheduleService {
    store: ScheduleStore,
    sync: SyncGateway,
}

impl ScheduleService {
    pub fn new(store: ScheduleStore, sync: SyncGateway) -> Self {
        Self { store, sync }
    }

    pub fn store(&self) -> &ScheduleStore {
        &self.store
    }

    pub fn sync(&self) -> &SyncGateway {
        &self.sync
    }

    /// Apply `intent`. The mutation runs on a staged copy that replaces the
    /// store only once its snapshot is queued, so on any failure the store is
    /// unchanged and nothing is pushed.
    pub fn apply(&mut self, intent: Intent, now: DateTime<Utc>) -> Result<Applied, ServiceError> {
        let kind = intent.kind();
        let mut staged = self.store.clone();
        let outcome = mutate(&mut staged, intent, now)?;

        let generation = self.sync.push(&staged)?;
        self.store = staged;
        debug!(intent = kind, generation, "intent applied");
        Ok(Applied {
            outcome,
            generation,
        })
    }
}

fn mutate(
    store: &mut ScheduleStore,
    intent: Intent,
    now: DateTime<Utc>,
) -> Result<Outcome, SchedulerError> {
    let outcome = match intent {
        Intent::Create(new) => Outcome::Created {
            schedule_id: store.create(new, now)?,
        },
        Intent::EditSlot {
            schedule_id,
            slot_id,
            start_time,
            duration,
        } => {
            store.edit_slot(schedule_id, slot_id, start_time, duration)?;
            Outcome::SlotEdited
        }
        Intent::EditSchedule {
            schedule_id,
            name,
            frequency,
            start_time,
            end_time,
            duration,
        } => {
            store.edit_schedule(
                schedule_id,
                ScheduleEdit {
                    name,
                    frequency,
                    start_time,
                    end_time,
                    duration,
                },
            )?;
            Outcome::ScheduleEdited
        }
        Intent::DeleteSlot {
            schedule_id,
            slot_id,
        } => {
            let removal = store.delete_slot(schedule_id, slot_id)?;
            Outcome::SlotDeleted {
                schedule_removed: removal == SlotRemoval::ScheduleRemoved,
            }
        }
        Intent::DeleteSchedule { schedule_id } => {
            store.delete_schedule(schedule_id)?;
            Outcome::ScheduleDeleted
        }
        Intent::ClearAll => Outcome::Cleared {
            count: store.clear_all(),
        },
    };
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use slotwise_core::config::SyncConfig;
    use slotwise_sync::{MemoryChannel, PushState};
    use std::sync::Arc;

    fn service() -> (ScheduleService, Arc<MemoryChannel>) {
        let channel = Arc::new(MemoryChannel::new("schedules"));
        let (sync, _worker) = SyncGateway::start(channel.clone(), &SyncConfig::default());
        (ScheduleService::new(ScheduleStore::new(), sync), channel)
    }

    fn tomorrow() -> DateTime<Utc> {
        Utc::now() + Duration::days(1)
    }

    #[test]
    fn intents_parse_from_tagged_json() {
        let intent: Intent = serde_json::from_value(json!({
            "intent": "create",
            "name": "Gym",
            "frequency": "weekly",
            "start_time": "2030-01-01T18:00:00Z",
            "end_time": "2030-02-01T18:00:00Z",
            "duration": 1.5
        }))
        .unwrap();
        assert!(matches!(intent, Intent::Create(ref n) if n.frequency == Frequency::Weekly));

        let intent: Intent = serde_json::from_value(json!({"intent": "clear_all"})).unwrap();
        assert!(matches!(intent, Intent::ClearAll));
    }

    #[tokio::test]
    async fn successful_intent_is_pushed() {
        let (mut service, channel) = service();
        let start = tomorrow();

        let applied = service
            .apply(
                Intent::Create(NewSchedule {
                    name: "Walk".into(),
                    frequency: Frequency::Daily,
                    start_time: start,
                    end_time: start + Duration::days(2),
                    duration: 1.0,
                }),
                Utc::now(),
            )
            .unwrap();
        assert!(matches!(applied.outcome, Outcome::Created { .. }));

        let report = service.sync().pusher().settled(applied.generation).await.unwrap();
        assert_eq!(report.state, PushState::Completed);
        let doc = channel.document().unwrap();
        assert_eq!(doc[0]["timeslots"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn failed_intent_does_not_push() {
        let (mut service, _channel) = service();

        let err = service
            .apply(
                Intent::DeleteSchedule {
                    schedule_id: ScheduleId::new(),
                },
                Utc::now(),
            )
            .unwrap_err();

        assert_eq!(err.code(), "SCHEDULE_NOT_FOUND");
        assert_eq!(service.sync().pusher().generation(), 0);
    }

    #[tokio::test]
    async fn deleting_last_slot_reports_schedule_removal() {
        let (mut service, _channel) = service();
        let start = tomorrow();
        let Outcome::Created { schedule_id } = service
            .apply(
                Intent::Create(NewSchedule {
                    name: String::new(),
                    frequency: Frequency::Once,
                    start_time: start,
                    end_time: start,
                    duration: 1.0,
                }),
                Utc::now(),
            )
            .unwrap()
            .outcome
        else {
            panic!("expected a created outcome");
        };
        let slot_id = service.store().get(schedule_id).unwrap().time_slots[0].id;

        let applied = service
            .apply(Intent::DeleteSlot { schedule_id, slot_id }, Utc::now())
            .unwrap();

        assert_eq!(
            applied.outcome,
            Outcome::SlotDeleted {
                schedule_removed: true
            }
        );
        assert!(service.store().is_empty());
    }

    #[tokio::test]
    async fn rejected_edit_leaves_store_untouched() {
        let (mut service, _channel) = service();
        let start = tomorrow();
        let created = service
            .apply(
                Intent::Create(NewSchedule {
                    name: "Walk".into(),
                    frequency: Frequency::Daily,
                    start_time: start,
                    end_time: start + Duration::days(2),
                    duration: 1.0,
                }),
                Utc::now(),
            )
            .unwrap();
        let Outcome::Created { schedule_id } = created.outcome else {
            panic!("expected a created outcome");
        };
        let before = service.store().schedules().to_vec();

        let err = service
            .apply(
                Intent::EditSchedule {
                    schedule_id,
                    name: Some("Run".into()),
                    frequency: Frequency::Daily,
                    start_time: start,
                    end_time: start - Duration::days(1),
                    duration: 1.0,
                },
                Utc::now(),
            )
            .unwrap_err();

        assert_eq!(err.code(), "END_NOT_AFTER_START");
        assert_eq!(service.store().schedules(), before.as_slice());
        assert_eq!(service.sync().pusher().generation(), created.generation);
    }

    #[tokio::test]
    async fn oversized_duration_is_rejected_before_push() {
        let (mut service, _channel) = service();
        let start = tomorrow();

        let err = service
            .apply(
                Intent::Create(NewSchedule {
                    name: String::new(),
                    frequency: Frequency::Once,
                    start_time: start,
                    end_time: start,
                    duration: 1e12,
                }),
                Utc::now(),
            )
            .unwrap_err();

        assert_eq!(err.code(), "INVALID_DURATION");
        assert!(service.store().is_empty());
        assert_eq!(service.sync().pusher().generation(), 0);
    }
}
