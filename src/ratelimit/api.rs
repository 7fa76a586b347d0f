//! Wire types shared by the HTTP endpoint and the client SDK.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::batch::{Quota, ValidatedRequest};
use super::counter::{WindowDuration, WindowHit};
use crate::error::ValidationError;

/// Body of `POST /api/ratelimit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitRequest {
    pub quota: u64,
    pub time_window_seconds: u64,
    pub app_id: String,
    pub event_name: String,
    pub entities: Vec<String>,
}

impl RateLimitRequest {
    /// Check every constraint without side effects.
    pub fn validate(self) -> Result<ValidatedRequest, ValidationError> {
        let quota = Quota::new(self.quota)?;
        let window = WindowDuration::from_secs(self.time_window_seconds)?;
        ValidatedRequest::new(quota, window, self.app_id, self.event_name, self.entities)
    }
}

/// Per-entity detail of a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStatus {
    /// Hits in the active window, this one included
    pub total: u64,
    /// Quota left in the active window
    pub remaining: u64,
    /// Window end, in seconds since the Unix epoch
    pub reset: u64,
}

impl EntityStatus {
    pub fn from_hit(hit: &WindowHit, quota: Quota) -> Self {
        Self {
            total: hit.total,
            remaining: hit.remaining(quota.get()),
            reset: hit.reset_at_ms / 1000,
        }
    }
}

/// Response of `POST /api/ratelimit`, keyed by entity as the caller sent it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitResponse {
    pub ok: bool,
    pub entities: HashMap<String, EntityStatus>,
}

/// Body returned alongside any non-2xx status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}
