//! Validated request and batch types.
//!
//! Values of these types can only be built through constructors that check
//! every constraint, so holding one means no store access is needed to know
//! the request is well formed.

use std::num::NonZeroU64;

use super::counter::WindowDuration;
use super::keys::{EntityKey, Namespace};
use crate::error::ValidationError;

/// Most entities accepted in one batch.
pub const MAX_BATCH_SIZE: usize = 16;

/// Hits allowed per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Quota(NonZeroU64);

impl Quota {
    pub fn new(quota: u64) -> Result<Self, ValidationError> {
        NonZeroU64::new(quota)
            .map(Self)
            .ok_or(ValidationError::Quota(quota))
    }

    pub fn get(&self) -> u64 {
        self.0.get()
    }
}

fn check_batch_size(count: usize) -> Result<(), ValidationError> {
    match count {
        0 => Err(ValidationError::NoEntities),
        n if n > MAX_BATCH_SIZE => Err(ValidationError::BatchSizeExceeded { count: n }),
        _ => Ok(()),
    }
}

/// An ingress request that passed validation; identifiers are still as sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    quota: Quota,
    window: WindowDuration,
    app_id: String,
    event_name: String,
    entities: Vec<String>,
}

impl ValidatedRequest {
    pub fn new(
        quota: Quota,
        window: WindowDuration,
        app_id: String,
        event_name: String,
        entities: Vec<String>,
    ) -> Result<Self, ValidationError> {
        check_batch_size(entities.len())?;
        Ok(Self {
            quota,
            window,
            app_id,
            event_name,
            entities,
        })
    }

    pub fn quota(&self) -> Quota {
        self.quota
    }

    pub fn window(&self) -> WindowDuration {
        self.window
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    pub fn entities(&self) -> &[String] {
        &self.entities
    }
}

/// A batch of hashed entity keys ready to be counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    quota: Quota,
    window: WindowDuration,
    namespace: Namespace,
    entities: Vec<EntityKey>,
}

impl Batch {
    /// Validate raw parameters into a batch.
    pub fn new(
        quota: u64,
        window_secs: u64,
        namespace: Namespace,
        entities: Vec<EntityKey>,
    ) -> Result<Self, ValidationError> {
        Self::from_parts(
            Quota::new(quota)?,
            WindowDuration::from_secs(window_secs)?,
            namespace,
            entities,
        )
    }

    pub fn from_parts(
        quota: Quota,
        window: WindowDuration,
        namespace: Namespace,
        entities: Vec<EntityKey>,
    ) -> Result<Self, ValidationError> {
        check_batch_size(entities.len())?;
        Ok(Self {
            quota,
            window,
            namespace,
            entities,
        })
    }

    pub fn quota(&self) -> Quota {
        self.quota
    }

    pub fn window(&self) -> WindowDuration {
        self.window
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn entities(&self) -> &[EntityKey] {
        &self.entities
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(n: usize) -> Vec<EntityKey> {
        (0..n).map(|i| EntityKey::new(format!("k{}", i))).collect()
    }

    #[test]
    fn test_quota_must_be_positive() {
        assert_eq!(Quota::new(0), Err(ValidationError::Quota(0)));
        assert_eq!(Quota::new(1).unwrap().get(), 1);
    }

    #[test]
    fn test_batch_size_limits() {
        let ns = Namespace::new("ns");

        assert_eq!(
            Batch::new(1, 5, ns.clone(), Vec::new()),
            Err(ValidationError::NoEntities)
        );
        assert_eq!(Batch::new(1, 5, ns.clone(), keys(16)).unwrap().entities().len(), 16);
        assert_eq!(
            Batch::new(1, 5, ns, keys(17)),
            Err(ValidationError::BatchSizeExceeded { count: 17 })
        );
    }

    #[test]
    fn test_batch_checks_quota_before_window() {
        let result = Batch::new(0, 1, Namespace::new("ns"), keys(1));
        assert_eq!(result, Err(ValidationError::Quota(0)));
    }

    #[test]
    fn test_validated_request_rejects_empty_entities() {
        let result = ValidatedRequest::new(
            Quota::new(1).unwrap(),
            WindowDuration::from_secs(5).unwrap(),
            "app".to_string(),
            "event".to_string(),
            Vec::new(),
        );
        assert_eq!(result, Err(ValidationError::NoEntities));
    }
}
