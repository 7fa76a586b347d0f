//! Client SDK for the rate limit service.
//!
//! Identifiers are salted and hashed before they leave the process; the
//! service only ever sees hashes. Responses are mapped back to the raw
//! entity ids for the caller.

use std::env;
use std::time::Duration;

use tracing::debug;

use crate::error::ClientError;
use crate::privacy::ClientHasher;
use crate::ratelimit::{ErrorResponse, RateLimitRequest, RateLimitResponse};

/// Service URL used when neither an explicit URL nor `RATELIMITER_URL` is set.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";
/// Bound on one request, connecting included.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Parameters of one rate limit call, with raw identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOptions {
    pub quota: u64,
    pub time_window_seconds: u64,
    pub app_id: String,
    pub event_name: String,
    pub entities: Vec<String>,
    /// Salt for entity and event hashes; derived from the app id when unset
    pub salt: Option<String>,
}

impl CallOptions {
    fn check(&self) -> Result<(), ClientError> {
        if self.quota < 1 {
            return Err(ClientError::InvalidOptions("quota must be at least 1".to_string()));
        }
        if self.entities.is_empty() {
            return Err(ClientError::InvalidOptions(
                "entities must be a non-empty list".to_string(),
            ));
        }
        Ok(())
    }
}

/// HTTP client for the rate limit service.
#[derive(Debug, Clone)]
pub struct RateLimiterClient {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl RateLimiterClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Client for `RATELIMITER_URL`, or the default URL when unset.
    pub fn from_env() -> Self {
        let base_url = env::var("RATELIMITER_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(&base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Record one hit for each entity and return the decision keyed by raw entity.
    pub async fn call(&self, options: &CallOptions) -> Result<RateLimitResponse, ClientError> {
        options.check()?;

        let mut hasher = ClientHasher::new(&options.app_id, options.salt.as_deref());
        let request = RateLimitRequest {
            quota: options.quota,
            time_window_seconds: options.time_window_seconds,
            app_id: hasher.app_id().to_string(),
            event_name: hasher.event_name(&options.event_name),
            entities: options.entities.iter().map(|e| hasher.entity(e)).collect(),
        };

        let resp = self
            .client
            .post(format!("{}/api/ratelimit", self.base_url))
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let (kind, message) = match resp.json::<ErrorResponse>().await {
                Ok(body) => (body.kind, body.error),
                Err(_) => ("unknown".to_string(), status.to_string()),
            };
            return Err(ClientError::Service {
                status: status.as_u16(),
                kind,
                message,
            });
        }

        let decision: RateLimitResponse = resp.json().await?;
        debug!(ok = decision.ok, entity_count = decision.entities.len(), "Rate limit response received");

        Ok(RateLimitResponse {
            ok: decision.ok,
            entities: hasher.unhash(decision.entities),
        })
    }

    /// Like [`call`](Self::call), but any over-quota entity is an error.
    pub async fn ensure_within_quota(&self, options: &CallOptions) -> Result<(), ClientError> {
        let decision = self.call(options).await?;
        if decision.ok {
            Ok(())
        } else {
            Err(ClientError::RateLimited)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> CallOptions {
        CallOptions {
            quota: 3,
            time_window_seconds: 60,
            app_id: "app".to_string(),
            event_name: "signup".to_string(),
            entities: vec!["alice".to_string()],
            salt: None,
        }
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = RateLimiterClient::new("http://localhost:8080/");
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_from_env_base_url() {
        env::set_var("RATELIMITER_URL", "http://limits.internal:9000/");
        let configured = RateLimiterClient::from_env();
        env::remove_var("RATELIMITER_URL");
        assert_eq!(configured.base_url(), "http://limits.internal:9000");

        assert_eq!(RateLimiterClient::from_env().base_url(), DEFAULT_BASE_URL);
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        // Accepts the connection and reads nothing back
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _held = tokio::spawn(async move {
            let mut sockets = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                sockets.push(socket);
            }
        });

        let client = RateLimiterClient::new(&format!("http://{}", addr))
            .with_timeout(Duration::from_millis(200));
        match client.call(&options()).await.unwrap_err() {
            ClientError::Http(e) => assert!(e.is_timeout()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_empty_entities_rejected_locally() {
        // Nothing listens on this port; the call must fail before any request
        let client = RateLimiterClient::new("http://127.0.0.1:9");
        let opts = CallOptions {
            entities: Vec::new(),
            ..options()
        };

        let err = client.call(&opts).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidOptions(_)));
    }

    #[tokio::test]
    async fn test_zero_quota_rejected_locally() {
        let client = RateLimiterClient::new("http://127.0.0.1:9");
        let opts = CallOptions { quota: 0, ..options() };

        let err = client.call(&opts).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidOptions(_)));
    }
}
