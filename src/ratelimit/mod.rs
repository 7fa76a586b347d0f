//! Rate limiting logic.

mod api;
mod batch;
mod counter;
mod keys;
mod limiter;

pub use api::{EntityStatus, ErrorResponse, RateLimitRequest, RateLimitResponse};
pub use batch::{Batch, Quota, ValidatedRequest, MAX_BATCH_SIZE};
pub use counter::{
    WindowCounter, WindowDuration, WindowHit, DEFAULT_KEY_PREFIX, DEFAULT_STORE_TIMEOUT,
    MAX_WINDOW_SECONDS, MIN_WINDOW_SECONDS,
};
pub use keys::{CounterKey, EntityKey, Namespace};
pub use limiter::{BatchOutcome, RateLimiter};
