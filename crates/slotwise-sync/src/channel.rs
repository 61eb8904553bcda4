use async_trait::async_trait;

use crate::error::Result;

/// A named slot on the host that holds one JSON document.
///
/// Implementations must be `Send + Sync` so the push worker can drive them
/// from its own Tokio task while the gateway loads through the same handle.
#[async_trait]
pub trait PersistenceChannel: Send + Sync {
    /// Channel name the document is stored under (e.g. `"schedules"`).
    fn name(&self) -> &str;

    /// Fetch the current document, or `None` if nothing was ever saved.
    async fn load(&self) -> Result<Option<serde_json::Value>>;

    /// Replace the stored document. Last write wins.
    async fn save(&self, document: &serde_json::Value) -> Result<()>;
}
