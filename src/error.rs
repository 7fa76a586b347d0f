//! Error types for the Hashgate service.

use thiserror::Error;

use crate::ratelimit::{MAX_BATCH_SIZE, MAX_WINDOW_SECONDS, MIN_WINDOW_SECONDS};

/// Main error type for Hashgate operations.
#[derive(Error, Debug)]
pub enum HashgateError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The request was rejected before touching the counting store
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The counting store timed out or failed
    #[error("Counting store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HashgateError {
    /// Short machine-readable label for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            HashgateError::Config(_) => "config",
            HashgateError::Validation(ValidationError::BatchSizeExceeded { .. }) => {
                "batch_size_exceeded"
            }
            HashgateError::Validation(_) => "validation",
            HashgateError::StoreUnavailable(_) => "store_unavailable",
            HashgateError::Io(_) => "io",
        }
    }
}

/// A request constraint that was violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("quota must be at least 1, got {0}")]
    Quota(u64),

    #[error(
        "time_window_seconds must be between {} and {}, got {0}",
        MIN_WINDOW_SECONDS,
        MAX_WINDOW_SECONDS
    )]
    TimeWindow(u64),

    #[error("entities must be a non-empty array of strings")]
    NoEntities,

    #[error("cannot pass more than {} entities, got {count}", MAX_BATCH_SIZE)]
    BatchSizeExceeded { count: usize },

    #[error("malformed request: {0}")]
    Malformed(String),
}

/// Failures at the counting store seam.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store call timed out after {0} ms")]
    Timeout(u64),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("unexpected store reply: {0}")]
    Protocol(String),
}

/// Result type alias for Hashgate operations.
pub type Result<T> = std::result::Result<T, HashgateError>;

/// Errors returned by the client SDK.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The call options were rejected before sending anything
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("rate limit service returned {status} ({kind}): {message}")]
    Service {
        status: u16,
        kind: String,
        message: String,
    },

    /// At least one entity is over quota
    #[error("rate limited")]
    RateLimited,
}
