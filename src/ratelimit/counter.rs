//! Window counter engine.
//!
//! Records one hit per call against the counting store and reports the
//! resulting count together with the absolute end of the active window.
//! The engine knows nothing about quotas.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use super::keys::{CounterKey, EntityKey, Namespace};
use crate::clock::Clock;
use crate::error::{StoreError, ValidationError};
use crate::store::{CountingStore, StoreHit};

/// Shortest accepted window, in seconds.
pub const MIN_WINDOW_SECONDS: u64 = 5;
/// Longest accepted window: two weeks.
pub const MAX_WINDOW_SECONDS: u64 = 2 * 7 * 24 * 60 * 60;

/// Default bound on a single store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(1000);
/// Default prefix for counter keys in the store.
pub const DEFAULT_KEY_PREFIX: &str = "limit:";

/// A validated window duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowDuration(u64);

impl WindowDuration {
    /// Build a window from whole seconds within the accepted range.
    pub fn from_secs(secs: u64) -> Result<Self, ValidationError> {
        if (MIN_WINDOW_SECONDS..=MAX_WINDOW_SECONDS).contains(&secs) {
            Ok(Self(secs))
        } else {
            Err(ValidationError::TimeWindow(secs))
        }
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.0)
    }
}

/// Outcome of recording one hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHit {
    /// Hits in the active window, this one included
    pub total: u64,
    /// When the active window ends, in milliseconds since the Unix epoch
    pub reset_at_ms: u64,
}

impl WindowHit {
    /// Quota left after this hit.
    pub fn remaining(&self, quota: u64) -> u64 {
        quota.saturating_sub(self.total)
    }
}

/// Counts hits per (namespace, entity) in expiring windows.
///
/// Every call is one atomic store operation bounded by a timeout. A timed out
/// or failed call is reported as an error, never as an empty count.
pub struct WindowCounter {
    store: Arc<dyn CountingStore>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    key_prefix: String,
}

impl WindowCounter {
    pub fn new(store: Arc<dyn CountingStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            timeout: DEFAULT_STORE_TIMEOUT,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Record one hit for `entity` in `namespace`.
    ///
    /// Starts a new window of length `window` when none is active. A live
    /// window keeps the length it was created with, whatever `window` says.
    /// Sub-millisecond windows are rounded up to one millisecond.
    pub async fn hit(
        &self,
        namespace: &Namespace,
        entity: &EntityKey,
        window: Duration,
    ) -> Result<WindowHit, StoreError> {
        let key = CounterKey::new(namespace, entity).to_store_key(&self.key_prefix);
        let window_ms = (window.as_millis() as u64).max(1);

        trace!(namespace = %namespace, entity = %entity, window_ms, "Recording hit");

        let hit = self.bounded(self.store.increment(&key, window_ms)).await?;
        let hit = self.to_window_hit(hit);

        if hit.total == 1 {
            debug!(
                namespace = %namespace,
                entity = %entity,
                reset_at_ms = hit.reset_at_ms,
                "Started new window"
            );
        }

        Ok(hit)
    }

    /// Read the active window for `entity` without recording a hit.
    pub async fn peek(
        &self,
        namespace: &Namespace,
        entity: &EntityKey,
    ) -> Result<Option<WindowHit>, StoreError> {
        let key = CounterKey::new(namespace, entity).to_store_key(&self.key_prefix);
        let hit = self.bounded(self.store.peek(&key)).await?;
        Ok(hit.map(|hit| self.to_window_hit(hit)))
    }

    async fn bounded<T>(
        &self,
        call: impl std::future::Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                let timeout_ms = self.timeout.as_millis() as u64;
                warn!(timeout_ms, "Counting store call timed out");
                Err(StoreError::Timeout(timeout_ms))
            }
        }
    }

    fn to_window_hit(&self, hit: StoreHit) -> WindowHit {
        WindowHit {
            total: hit.count,
            reset_at_ms: self.clock.now_ms().saturating_add(hit.ttl_ms),
        }
    }
}

impl std::fmt::Debug for WindowCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowCounter")
            .field("timeout", &self.timeout)
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}
