use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use slotwise_core::config::SyncConfig;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::channel::PersistenceChannel;
use crate::error::{Result, SyncError};

/// Exponential backoff with jitter for failed saves.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts per snapshot, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound of the random extra delay, as a fraction of the base.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.backoff_base_ms),
            max_delay: Duration::from_millis(config.backoff_max_ms),
            jitter: config.jitter.clamp(0.0, 1.0),
        }
    }

    /// Delay before retrying after failed attempt number `attempt` (1-based).
    ///
    /// `base · 2^(attempt-1)`, capped at `max_delay`, plus up to `jitter` of that.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        let delay = self
            .base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay);
        delay + jitter(delay, self.jitter)
    }
}

/// Pseudo-random extra delay derived from the clock's sub-second nanos.
fn jitter(delay: Duration, fraction: f64) -> Duration {
    let max_ms = (delay.as_millis() as f64 * fraction) as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    Duration::from_millis(u64::from(nanos) % max_ms)
}

/// Outcome of the most recent push attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PushState {
    /// Nothing pushed yet.
    Idle,
    Completed,
    /// Gave up on this snapshot; the next mutation pushes again.
    Failed { error: String },
    /// A newer snapshot arrived while this one was waiting to retry.
    Superseded,
}

impl PushState {
    pub fn is_final(&self) -> bool {
        matches!(self, PushState::Completed | PushState::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushReport {
    /// Snapshot generation the report describes (0 before any push).
    pub generation: u64,
    #[serde(flatten)]
    pub state: PushState,
    pub attempts: u32,
    pub finished_at: Option<DateTime<Utc>>,
}

impl PushReport {
    fn idle() -> Self {
        Self {
            generation: 0,
            state: PushState::Idle,
            attempts: 0,
            finished_at: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Snapshot {
    generation: u64,
    document: Option<serde_json::Value>,
}

/// Handle to the background worker that saves snapshots to a channel.
///
/// Only the newest snapshot matters: pushes made while a save is in flight
/// coalesce, and a snapshot waiting on a retry is abandoned in favour of a
/// newer one. Dropping the handle lets the worker flush what it has not yet
/// seen and exit.
pub struct SyncPusher {
    snapshots: watch::Sender<Snapshot>,
    reports: watch::Receiver<PushReport>,
}

impl SyncPusher {
    /// Spawn the worker on the current Tokio runtime.
    pub fn spawn(channel: Arc<dyn PersistenceChannel>, policy: RetryPolicy) -> (Self, JoinHandle<()>) {
        let (snapshots, snapshot_rx) = watch::channel(Snapshot::default());
        let (report_tx, reports) = watch::channel(PushReport::idle());
        let worker = tokio::spawn(run_worker(channel, policy, snapshot_rx, report_tx));
        (Self { snapshots, reports }, worker)
    }

    /// Queue `document` for saving. Returns its generation number.
    pub fn push(&self, document: serde_json::Value) -> u64 {
        let mut generation = 0;
        self.snapshots.send_modify(|snapshot| {
            snapshot.generation += 1;
            snapshot.document = Some(document);
            generation = snapshot.generation;
        });
        debug!(generation, "snapshot queued");
        generation
    }

    /// Generation of the most recently queued snapshot.
    pub fn generation(&self) -> u64 {
        self.snapshots.borrow().generation
    }

    pub fn latest_report(&self) -> PushReport {
        self.reports.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PushReport> {
        self.reports.clone()
    }

    /// Wait until `generation` (or a newer snapshot) has completed or failed.
    pub async fn settled(&self, generation: u64) -> Result<PushReport> {
        let mut rx = self.reports.clone();
        let report = rx
            .wait_for(|r| r.generation >= generation && r.state.is_final())
            .await
            .map_err(|_| SyncError::Closed)?;
        Ok(report.clone())
    }
}

async fn run_worker(
    channel: Arc<dyn PersistenceChannel>,
    policy: RetryPolicy,
    mut snapshots: watch::Receiver<Snapshot>,
    reports: watch::Sender<PushReport>,
) {
    info!(channel = %channel.name(), "push worker started");

    // `changed` still yields an unseen value after the sender is dropped.
    while snapshots.changed().await.is_ok() {
        let snapshot = snapshots.borrow_and_update().clone();
        let Some(document) = snapshot.document else {
            continue;
        };
        let report = push_with_retry(
            channel.as_ref(),
            &policy,
            snapshot.generation,
            &document,
            &snapshots,
        )
        .await;
        reports.send_replace(report);
    }

    info!(channel = %channel.name(), "push worker stopped");
}

async fn push_with_retry(
    channel: &dyn PersistenceChannel,
    policy: &RetryPolicy,
    generation: u64,
    document: &serde_json::Value,
    snapshots: &watch::Receiver<Snapshot>,
) -> PushReport {
    let mut attempt = 0;
    let state = loop {
        attempt += 1;
        match channel.save(document).await {
            Ok(()) => {
                debug!(generation, attempt, "snapshot saved");
                break PushState::Completed;
            }
            Err(e) if !e.is_transient() || attempt >= policy.max_attempts => {
                error!(
                    channel = %channel.name(),
                    generation,
                    attempt,
                    error = %e,
                    "giving up on snapshot"
                );
                break PushState::Failed {
                    error: e.to_string(),
                };
            }
            Err(e) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    channel = %channel.name(),
                    generation,
                    attempt,
                    max = policy.max_attempts,
                    error = %e,
                    retry_after_ms = delay.as_millis() as u64,
                    "save failed, retrying with backoff"
                );
                sleep(delay).await;
                if snapshots.borrow().generation > generation {
                    debug!(generation, "snapshot superseded during backoff");
                    break PushState::Superseded;
                }
            }
        }
    };

    PushReport {
        generation,
        state,
        attempts: attempt,
        finished_at: Some(Utc::now()),
    }
}
