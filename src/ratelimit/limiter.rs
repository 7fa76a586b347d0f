//! Batch rate limit service.

use std::collections::HashMap;

use futures::future::try_join_all;
use tracing::{debug, info};

use super::api::{EntityStatus, RateLimitRequest, RateLimitResponse};
use super::batch::Batch;
use super::counter::WindowCounter;
use super::keys::EntityKey;
use crate::error::{Result, StoreError};
use crate::privacy::KeyHasher;

/// Decision for one batch, in the order the entities were given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    /// True only when every entity still has quota left
    pub ok: bool,
    pub entities: Vec<(EntityKey, EntityStatus)>,
}

/// Fans batches out to the window counter and aggregates the results.
///
/// Hits are recorded for every entity before the decision is made, so a
/// rejected batch still consumes quota.
#[derive(Debug)]
pub struct RateLimiter {
    counter: WindowCounter,
    hasher: KeyHasher,
}

impl RateLimiter {
    pub fn new(counter: WindowCounter, hasher: KeyHasher) -> Self {
        Self { counter, hasher }
    }

    /// Handle one ingress request end to end.
    ///
    /// The request is fully validated before the store is touched. The
    /// response is keyed by each entity exactly as the caller sent it.
    pub async fn check(&self, request: RateLimitRequest) -> Result<RateLimitResponse> {
        let request = request.validate()?;

        let namespace = self.hasher.namespace(request.app_id(), request.event_name());
        let keys = request
            .entities()
            .iter()
            .map(|entity| self.hasher.entity_key(request.app_id(), entity))
            .collect();
        let batch = Batch::from_parts(request.quota(), request.window(), namespace, keys)?;

        let outcome = self.check_batch(&batch).await?;

        // Duplicate entities each counted a hit; the last one is reported
        let entities: HashMap<String, EntityStatus> = request
            .entities()
            .iter()
            .cloned()
            .zip(outcome.entities.into_iter().map(|(_, status)| status))
            .collect();

        Ok(RateLimitResponse {
            ok: outcome.ok,
            entities,
        })
    }

    /// Record one hit per entity concurrently and decide the batch.
    ///
    /// Fails as a whole if any entity's hit fails. Hits already committed
    /// for other entities of the batch are not rolled back.
    pub async fn check_batch(&self, batch: &Batch) -> std::result::Result<BatchOutcome, StoreError> {
        let quota = batch.quota();
        let window = batch.window().duration();

        debug!(
            namespace = %batch.namespace(),
            entity_count = batch.entities().len(),
            quota = quota.get(),
            window_secs = batch.window().as_secs(),
            "Processing batch"
        );

        let hits = try_join_all(
            batch
                .entities()
                .iter()
                .map(|entity| self.counter.hit(batch.namespace(), entity, window)),
        )
        .await?;

        let entities: Vec<(EntityKey, EntityStatus)> = batch
            .entities()
            .iter()
            .cloned()
            .zip(hits.iter().map(|hit| EntityStatus::from_hit(hit, quota)))
            .collect();

        let ok = entities.iter().all(|(_, status)| status.remaining > 0);

        info!(
            namespace = %batch.namespace(),
            entity_count = entities.len(),
            ok,
            "Rate limit decision made"
        );

        Ok(BatchOutcome { ok, entities })
    }
}
