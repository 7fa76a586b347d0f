//! HTTP handlers for the rate limit API.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, instrument, warn};

use crate::error::{HashgateError, ValidationError};
use crate::ratelimit::{ErrorResponse, RateLimitRequest, RateLimitResponse, RateLimiter};

/// Shared handler state.
#[derive(Clone)]
struct AppState {
    limiter: Arc<RateLimiter>,
}

/// Build the API router.
pub fn router(limiter: Arc<RateLimiter>, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/api/ratelimit", post(ratelimit))
        .route("/health", get(health))
        .layer(RequestBodyLimitLayer::new(body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { limiter })
}

/// Record one hit per entity and report whether all are within quota.
#[instrument(skip_all)]
async fn ratelimit(
    State(state): State<AppState>,
    payload: Result<Json<RateLimitRequest>, JsonRejection>,
) -> Result<Json<RateLimitResponse>, HashgateError> {
    let Json(request) =
        payload.map_err(|rejection| ValidationError::Malformed(rejection.body_text()))?;

    let response = state.limiter.check(request).await?;
    Ok(Json(response))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

impl IntoResponse for HashgateError {
    fn into_response(self) -> Response {
        let status = match &self {
            HashgateError::Validation(e) => {
                warn!(error = %e, "Rejected rate limit request");
                StatusCode::BAD_REQUEST
            }
            HashgateError::StoreUnavailable(e) => {
                error!(error = %e, "Counting store unavailable");
                StatusCode::SERVICE_UNAVAILABLE
            }
            HashgateError::Config(_) | HashgateError::Io(_) => {
                error!(error = %self, "Internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            kind: self.kind().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn test_error_status_codes() {
        let validation: HashgateError = ValidationError::Quota(0).into();
        assert_eq!(validation.into_response().status(), StatusCode::BAD_REQUEST);

        let batch: HashgateError = ValidationError::BatchSizeExceeded { count: 20 }.into();
        assert_eq!(batch.into_response().status(), StatusCode::BAD_REQUEST);

        let store: HashgateError = StoreError::Timeout(1000).into();
        assert_eq!(store.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
