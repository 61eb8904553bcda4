//! `slotwise-sync` moves the schedule collection between the in-memory
//! store and a host persistence channel.
//!
//! The whole collection is one JSON document (see [`wire`]). It is pulled
//! once at startup and pushed in full after every mutation by a background
//! [`pusher::SyncPusher`] worker that coalesces snapshots and retries
//! transient failures.

pub mod channel;
pub mod error;
pub mod gateway;
pub mod http;
pub mod memory;
pub mod pusher;
pub mod sqlite;
pub mod wire;

pub use channel::PersistenceChannel;
pub use error::SyncError;
pub use gateway::{build_channel, SyncGateway};
pub use http::HttpChannel;
pub use memory::MemoryChannel;
pub use pusher::{PushReport, PushState, RetryPolicy, SyncPusher};
pub use sqlite::SqliteChannel;
