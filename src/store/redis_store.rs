//! Redis-backed counting store.
//!
//! The increment and the expiry of a new record run inside one server-side
//! Lua script, so Redis' single-threaded command processor serializes every
//! hit on a key and a window can never be left without an expiry.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, Script};
use tracing::warn;

use super::{CountingStore, StoreHit};
use crate::error::StoreError;

/// Increment the counter; start the window on the first hit.
///
/// A key found without an expiry is healed with the requested window.
const HIT_SCRIPT: &str = r"
local count = redis.call('INCR', KEYS[1])
local ttl = redis.call('PTTL', KEYS[1])
if count == 1 or ttl < 0 then
  redis.call('PEXPIRE', KEYS[1], ARGV[1])
  ttl = tonumber(ARGV[1])
end
return {count, ttl}
";

/// Counting store shared by every instance pointed at the same Redis.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    hit_script: Script,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connect to Redis and check that it answers.
    ///
    /// # Arguments
    /// * `url` - Redis connection URL (e.g., "redis://127.0.0.1/")
    /// * `timeout` - Bound on connecting plus the initial `PING`
    ///
    /// # Errors
    /// Returns error if the URL is invalid, the first connection fails, or
    /// the server does not answer within `timeout`.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::open(url)?;

        let connecting = async {
            let mut connection = ConnectionManager::new(client).await?;
            redis::cmd("PING")
                .query_async::<_, String>(&mut connection)
                .await?;
            Ok::<_, StoreError>(connection)
        };

        let connection = match tokio::time::timeout(timeout, connecting).await {
            Ok(result) => result?,
            Err(_) => {
                let timeout_ms = timeout.as_millis() as u64;
                warn!(timeout_ms, "Redis did not answer during connect");
                return Err(StoreError::Timeout(timeout_ms));
            }
        };

        Ok(Self {
            connection,
            hit_script: Script::new(HIT_SCRIPT),
        })
    }
}

#[async_trait]
impl CountingStore for RedisStore {
    async fn increment(&self, key: &str, window_ms: u64) -> Result<StoreHit, StoreError> {
        let mut conn = self.connection.clone();
        let mut invocation = self.hit_script.key(key);
        invocation.arg(window_ms);

        let (count, ttl): (i64, i64) = invocation.invoke_async(&mut conn).await.map_err(|e| {
            warn!(error = %e, "Redis hit script failed");
            StoreError::from(e)
        })?;

        if count < 1 || ttl < 0 {
            return Err(StoreError::Protocol(format!(
                "hit script returned count={} ttl={}",
                count, ttl
            )));
        }

        Ok(StoreHit {
            count: count as u64,
            ttl_ms: ttl as u64,
        })
    }

    async fn peek(&self, key: &str) -> Result<Option<StoreHit>, StoreError> {
        let mut conn = self.connection.clone();
        let (count, ttl): (Option<u64>, i64) = redis::pipe()
            .atomic()
            .get(key)
            .pttl(key)
            .query_async(&mut conn)
            .await?;

        Ok(count.map(|count| StoreHit {
            count,
            // -1 means the key has no expiry; report it as already due
            ttl_ms: ttl.max(0) as u64,
        }))
    }
}
