//! Client SDK against a live server on an ephemeral port.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use hashgate::client::{CallOptions, RateLimiterClient};
use hashgate::clock::SystemClock;
use hashgate::error::ClientError;
use hashgate::http::router;
use hashgate::privacy::{KeyHasher, Salt};
use hashgate::ratelimit::{RateLimiter, WindowCounter};
use hashgate::store::MemoryStore;

async fn spawn_server() -> SocketAddr {
    let clock = Arc::new(SystemClock);
    let store = Arc::new(MemoryStore::new(clock.clone()));
    let counter = WindowCounter::new(store, clock);
    let limiter = Arc::new(RateLimiter::new(counter, KeyHasher::new(Salt::new("server"))));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(limiter, 64 * 1024)).await.unwrap();
    });
    addr
}

fn options(quota: u64, entities: &[&str]) -> CallOptions {
    CallOptions {
        quota,
        time_window_seconds: 60,
        app_id: "my-app".to_string(),
        event_name: "login".to_string(),
        entities: entities.iter().map(|e| e.to_string()).collect(),
        salt: None,
    }
}

#[tokio::test]
async fn test_call_returns_raw_entity_ids() {
    let addr = spawn_server().await;
    let client = RateLimiterClient::new(&format!("http://{}", addr));

    let decision = client.call(&options(3, &["10.0.0.1", "user@example.com"])).await.unwrap();
    assert!(decision.ok);
    assert_eq!(decision.entities.len(), 2);
    assert_eq!(decision.entities["10.0.0.1"].total, 1);
    assert_eq!(decision.entities["user@example.com"].remaining, 2);
}

#[tokio::test]
async fn test_ensure_within_quota_errors_once_exhausted() {
    let addr = spawn_server().await;
    let client = RateLimiterClient::new(&format!("http://{}", addr));
    let opts = options(2, &["carol"]);

    client.ensure_within_quota(&opts).await.unwrap();
    let err = client.ensure_within_quota(&opts).await.unwrap_err();
    assert!(matches!(err, ClientError::RateLimited));
}

#[tokio::test]
async fn test_salt_separates_counters() {
    let addr = spawn_server().await;
    let client = RateLimiterClient::new(&format!("http://{}", addr));

    client.call(&options(5, &["dave"])).await.unwrap();
    let salted = CallOptions {
        salt: Some("other".to_string()),
        ..options(5, &["dave"])
    };
    let decision = client.call(&salted).await.unwrap();
    assert_eq!(decision.entities["dave"].total, 1);
}

#[tokio::test]
async fn test_server_validation_error_surfaces() {
    let addr = spawn_server().await;
    let client = RateLimiterClient::new(&format!("http://{}", addr));
    let opts = CallOptions {
        time_window_seconds: 1,
        ..options(5, &["erin"])
    };

    match client.call(&opts).await.unwrap_err() {
        ClientError::Service { status, kind, .. } => {
            assert_eq!(status, 400);
            assert_eq!(kind, "validation");
        }
        other => panic!("unexpected error: {other}"),
    }
}
