//! In-process counting store.
//!
//! Each key maps to one record inside a sharded map; the shard write lock
//! held by the entry guard makes the expire-or-increment step atomic per key.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use super::{CountingStore, StoreHit};
use crate::clock::Clock;
use crate::error::StoreError;

#[derive(Debug, Clone, Copy)]
struct Record {
    count: u64,
    expires_at_ms: u64,
}

/// Counting store kept in local memory.
///
/// Only suitable when a single process serves every caller; counts are not
/// shared between instances.
#[derive(Debug)]
pub struct MemoryStore {
    records: DashMap<String, Record>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: DashMap::new(),
            clock,
        }
    }

    /// Number of records currently held, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop every expired record. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let before = self.records.len();
        self.records.retain(|_, record| record.expires_at_ms > now);
        let purged = before.saturating_sub(self.records.len());
        if purged > 0 {
            debug!(purged, "Purged expired counter records");
        }
        purged
    }
}

#[async_trait]
impl CountingStore for MemoryStore {
    async fn increment(&self, key: &str, window_ms: u64) -> Result<StoreHit, StoreError> {
        let now = self.clock.now_ms();
        let fresh = Record {
            count: 0,
            expires_at_ms: now.saturating_add(window_ms),
        };

        let mut record = self.records.entry(key.to_string()).or_insert(fresh);
        if record.expires_at_ms <= now {
            *record = fresh;
        }
        record.count += 1;

        Ok(StoreHit {
            count: record.count,
            ttl_ms: record.expires_at_ms - now,
        })
    }

    async fn peek(&self, key: &str) -> Result<Option<StoreHit>, StoreError> {
        let now = self.clock.now_ms();
        Ok(self
            .records
            .get(key)
            .filter(|record| record.expires_at_ms > now)
            .map(|record| StoreHit {
                count: record.count,
                ttl_ms: record.expires_at_ms - now,
            }))
    }
}
