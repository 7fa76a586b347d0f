//! HTTP server implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};

use super::service::router;
use crate::error::{HashgateError, Result};
use crate::ratelimit::RateLimiter;

/// HTTP server for the rate limit service.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    /// The rate limiter instance
    rate_limiter: Arc<RateLimiter>,
    /// Largest accepted request body
    body_limit_bytes: usize,
}

impl HttpServer {
    pub fn new(addr: SocketAddr, rate_limiter: Arc<RateLimiter>, body_limit_bytes: usize) -> Self {
        Self {
            addr,
            rate_limiter,
            body_limit_bytes,
        }
    }

    /// Start the HTTP server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await?;
        let addr = listener.local_addr()?;
        let app = router(self.rate_limiter, self.body_limit_bytes);

        info!(addr = %addr, "Starting HTTP server for rate limit API");

        axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP server failed");
                HashgateError::Io(e)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::privacy::{KeyHasher, Salt};
    use crate::ratelimit::WindowCounter;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_server_stops_on_signal() {
        let clock = Arc::new(SystemClock);
        let counter = WindowCounter::new(Arc::new(MemoryStore::new(clock.clone())), clock);
        let limiter = Arc::new(RateLimiter::new(counter, KeyHasher::new(Salt::new("s"))));

        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let server = HttpServer::new(addr, limiter, 1024);

        server.serve_with_shutdown(async {}).await.unwrap();
    }
}
