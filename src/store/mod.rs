//! Counting store adapters.
//!
//! The window counter engine talks to the shared store through the
//! [`CountingStore`] trait. Every mutation goes through a single atomic
//! increment-and-expire-if-new primitive; adapters must never emulate it
//! with a separate read followed by a write.

mod memory;
mod redis_store;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use crate::clock::Clock;
use crate::config::{StoreBackend, StoreConfig};
use crate::error::{HashgateError, Result, StoreError};

/// How often the in-memory store drops expired windows.
const PURGE_INTERVAL: Duration = Duration::from_secs(30);

/// State of one counter record as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreHit {
    /// Hits recorded in the active window
    pub count: u64,
    /// Milliseconds until the active window expires
    pub ttl_ms: u64,
}

/// Trait for shared counting stores.
#[async_trait]
pub trait CountingStore: Send + Sync {
    /// Atomically add one hit to `key`.
    ///
    /// An absent or expired record is replaced by a record with a count of
    /// one that expires `window_ms` from now, in the same atomic step. A live
    /// record is incremented and keeps its expiry.
    async fn increment(&self, key: &str, window_ms: u64) -> std::result::Result<StoreHit, StoreError>;

    /// Read the live record for `key` without modifying it.
    async fn peek(&self, key: &str) -> std::result::Result<Option<StoreHit>, StoreError>;
}

/// Build the store adapter selected by the configuration.
///
/// The in-memory backend gets a background task purging expired windows,
/// so this must run inside a Tokio runtime.
pub async fn connect(config: &StoreConfig, clock: Arc<dyn Clock>) -> Result<Arc<dyn CountingStore>> {
    match config.backend {
        StoreBackend::Memory => {
            warn!("Using in-memory counting store; counts are not shared between instances");
            let store = Arc::new(MemoryStore::new(clock));
            spawn_purge_task(Arc::downgrade(&store));
            Ok(store as Arc<dyn CountingStore>)
        }
        StoreBackend::Redis => {
            let url = config.redis_url.as_deref().ok_or_else(|| {
                HashgateError::Config("store.redis_url is required for the redis backend".to_string())
            })?;
            let store = RedisStore::connect(url, config.timeout()).await?;
            info!("Connected to redis counting store");
            Ok(Arc::new(store) as Arc<dyn CountingStore>)
        }
    }
}

fn spawn_purge_task(store: std::sync::Weak<MemoryStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match store.upgrade() {
                Some(store) => {
                    store.purge_expired();
                }
                None => break,
            }
        }
    });
}
