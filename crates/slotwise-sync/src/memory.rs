use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::channel::PersistenceChannel;
use crate::error::Result;

/// Process-local channel. Nothing survives a restart.
///
/// Used for the `memory` backend and as a test double.
pub struct MemoryChannel {
    name: String,
    document: Mutex<Option<serde_json::Value>>,
    saves: AtomicUsize,
}

impl MemoryChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            document: Mutex::new(None),
            saves: AtomicUsize::new(0),
        }
    }

    /// Start with a document already stored, as if saved by an earlier run.
    pub fn with_document(name: impl Into<String>, document: serde_json::Value) -> Self {
        let channel = Self::new(name);
        *channel.document.lock().unwrap_or_else(|e| e.into_inner()) = Some(document);
        channel
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// The currently stored document.
    pub fn document(&self) -> Option<serde_json::Value> {
        self.document.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl PersistenceChannel for MemoryChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self) -> Result<Option<serde_json::Value>> {
        Ok(self.document())
    }

    async fn save(&self, document: &serde_json::Value) -> Result<()> {
        *self.document.lock().unwrap_or_else(|e| e.into_inner()) = Some(document.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
