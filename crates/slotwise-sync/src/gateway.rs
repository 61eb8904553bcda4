use std::sync::Arc;

use slotwise_core::config::{ChannelBackend, ChannelConfig, SyncConfig};
use slotwise_scheduler::ScheduleStore;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::channel::PersistenceChannel;
use crate::error::{Result, SyncError};
use crate::http::HttpChannel;
use crate::memory::MemoryChannel;
use crate::pusher::{RetryPolicy, SyncPusher};
use crate::sqlite::SqliteChannel;
use crate::wire::{decode_document, encode_document};

/// Construct the channel selected by `[channel] backend`.
pub fn build_channel(config: &ChannelConfig) -> Result<Arc<dyn PersistenceChannel>> {
    let channel: Arc<dyn PersistenceChannel> = match config.backend {
        ChannelBackend::Memory => Arc::new(MemoryChannel::new(&config.name)),
        ChannelBackend::Sqlite => Arc::new(SqliteChannel::open(&config.name, &config.path)?),
        ChannelBackend::Http => {
            let http = config.http.as_ref().ok_or_else(|| {
                SyncError::Config("backend \"http\" requires [channel.http]".into())
            })?;
            Arc::new(HttpChannel::new(&config.name, http)?)
        }
    };
    info!(backend = ?config.backend, channel = %config.name, "persistence channel ready");
    Ok(channel)
}

/// Pulls the store once and pushes every change to the persistence channel.
pub struct SyncGateway {
    channel: Arc<dyn PersistenceChannel>,
    pusher: SyncPusher,
}

impl SyncGateway {
    /// Wrap `channel` and spawn its push worker.
    pub fn start(channel: Arc<dyn PersistenceChannel>, sync: &SyncConfig) -> (Self, JoinHandle<()>) {
        let (pusher, worker) = SyncPusher::spawn(channel.clone(), RetryPolicy::from_config(sync));
        (Self { channel, pusher }, worker)
    }

    /// Read and decode the stored collection.
    #[instrument(skip(self), fields(channel = %self.channel.name()))]
    pub async fn try_load(&self) -> Result<ScheduleStore> {
        let schedules = match self.channel.load().await? {
            Some(document) => decode_document(document)?,
            None => Vec::new(),
        };
        let store = ScheduleStore::from_schedules(schedules);
        info!(schedules = store.len(), "schedules loaded");
        Ok(store)
    }

    /// Like [`try_load`](Self::try_load), but starts empty when the channel
    /// cannot be read or holds an unreadable document.
    pub async fn load(&self) -> ScheduleStore {
        match self.try_load().await {
            Ok(store) => store,
            Err(e) => {
                warn!(error = %e, code = e.code(), "could not load schedules, starting empty");
                ScheduleStore::new()
            }
        }
    }

    /// Snapshot the whole store for the push worker.
    pub fn push(&self, store: &ScheduleStore) -> Result<u64> {
        let document = encode_document(store.schedules())?;
        Ok(self.pusher.push(document))
    }

    pub fn pusher(&self) -> &SyncPusher {
        &self.pusher
    }

    pub fn channel(&self) -> &Arc<dyn PersistenceChannel> {
        &self.channel
    }
}
