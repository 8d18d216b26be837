//! Token revocation (blacklist) lookups.
//!
//! # Key Pattern
//!
//! - `blacklist:{raw-token}` - present while the token is revoked. The value is
//!   never read; the logout path that writes it owns its TTL.
//!
//! # Connection Pattern
//!
//! The Redis store uses a `ConnectionManager`, which multiplexes requests over
//! one connection, reconnects on failure and is cheap to clone. Each lookup
//! clones it; no locking is needed.

use crate::observability::metrics::record_revocation_lookup;
use async_trait::async_trait;
use common::secret::{ExposeSecret, SecretString};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::instrument;

/// Prefix prepended to the raw token to form its revocation key.
pub const REVOCATION_KEY_PREFIX: &str = "blacklist:";

/// Default upper bound on a single revocation lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_millis(250);

/// Failures talking to the revocation store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Revocation store unavailable: {0}")]
    Unavailable(String),

    #[error("Revocation lookup timed out after {0:?}")]
    Timeout(Duration),
}

/// Derive the store key for a raw token.
pub fn revocation_key(token: &str) -> String {
    format!("{REVOCATION_KEY_PREFIX}{token}")
}

/// Read-only view of the shared key-value store holding revocations.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Whether `key` exists. The stored value is irrelevant.
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Round-trip check used by the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Redis-backed revocation store.
#[derive(Clone)]
pub struct RedisRevocationStore {
    connection: ConnectionManager,
}

impl RedisRevocationStore {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the URL is invalid or the initial
    /// connection fails.
    pub async fn connect(redis_url: &SecretString) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url.expose_secret()).map_err(|e| {
            // Note: Do NOT log redis_url as it may contain credentials
            tracing::error!(
                target: "gateway.auth.revocation",
                error = %e,
                "Failed to open Redis client"
            );
            StoreError::Unavailable(format!("Failed to open Redis client: {e}"))
        })?;

        let connection = ConnectionManager::new(client).await.map_err(|e| {
            tracing::error!(
                target: "gateway.auth.revocation",
                error = %e,
                "Failed to connect to Redis"
            );
            StoreError::Unavailable(format!("Failed to connect to Redis: {e}"))
        })?;

        Ok(Self { connection })
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection.clone();
        let exists: bool = conn.exists(key).await.map_err(|e| {
            tracing::warn!(
                target: "gateway.auth.revocation",
                error = %e,
                "Failed to check revocation key"
            );
            StoreError::Unavailable(format!("EXISTS failed: {e}"))
        })?;
        Ok(exists)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let _pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Unavailable(format!("PING failed: {e}")))?;
        Ok(())
    }
}

/// Answers "is this token revoked?" with a single bounded store lookup.
///
/// Never retries. A lookup that outlives `lookup_timeout` is dropped and
/// reported as `StoreError::Timeout`.
#[derive(Clone)]
pub struct RevocationCache {
    store: Arc<dyn RevocationStore>,
    lookup_timeout: Duration,
}

impl RevocationCache {
    pub fn new(store: Arc<dyn RevocationStore>, lookup_timeout: Duration) -> Self {
        Self {
            store,
            lookup_timeout,
        }
    }

    pub fn store(&self) -> &Arc<dyn RevocationStore> {
        &self.store
    }

    /// Check the revocation list for `token`.
    #[instrument(skip_all, name = "gateway.auth.revocation.lookup")]
    pub async fn is_revoked(&self, token: &str) -> Result<bool, StoreError> {
        let key = revocation_key(token);
        let start = Instant::now();

        let result = match tokio::time::timeout(self.lookup_timeout, self.store.exists(&key)).await
        {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    target: "gateway.auth.revocation",
                    timeout_ms = self.lookup_timeout.as_millis() as u64,
                    "Revocation lookup timed out"
                );
                Err(StoreError::Timeout(self.lookup_timeout))
            }
        };

        let status = match &result {
            Ok(_) => "success",
            Err(StoreError::Timeout(_)) => "timeout",
            Err(StoreError::Unavailable(_)) => "error",
        };
        record_revocation_lookup(status, start.elapsed());

        result
    }
}

/// In-memory and failure-injecting stores for tests.
pub mod mock {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::RwLock;

    /// Revocation store backed by a set of raw tokens.
    #[derive(Default)]
    pub struct InMemoryRevocationStore {
        keys: RwLock<HashSet<String>>,
        lookups: AtomicUsize,
    }

    impl InMemoryRevocationStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Create a store with `tokens` already revoked.
        pub fn with_revoked<I, S>(tokens: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: AsRef<str>,
        {
            let store = Self::new();
            for token in tokens {
                store.revoke(token.as_ref());
            }
            store
        }

        /// Revoke a raw token, as the logout path would.
        pub fn revoke(&self, token: &str) {
            if let Ok(mut keys) = self.keys.write() {
                keys.insert(revocation_key(token));
            }
        }

        /// Number of `exists` calls made so far.
        pub fn lookup_count(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RevocationStore for InMemoryRevocationStore {
        async fn exists(&self, key: &str) -> Result<bool, StoreError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            let keys = self
                .keys
                .read()
                .map_err(|_| StoreError::Unavailable("poisoned".to_string()))?;
            Ok(keys.contains(key))
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    /// Store that is always unreachable.
    #[derive(Default)]
    pub struct UnavailableRevocationStore;

    #[async_trait]
    impl RevocationStore for UnavailableRevocationStore {
        async fn exists(&self, _key: &str) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    /// Store whose lookups take `delay` before answering "not revoked".
    pub struct SlowRevocationStore {
        delay: Duration,
    }

    impl SlowRevocationStore {
        pub fn new(delay: Duration) -> Self {
            Self { delay }
        }
    }

    #[async_trait]
    impl RevocationStore for SlowRevocationStore {
        async fn exists(&self, _key: &str) -> Result<bool, StoreError> {
            tokio::time::sleep(self.delay).await;
            Ok(false)
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::mock::*;
    use super::*;

    #[test]
    fn test_revocation_key_format() {
        assert_eq!(revocation_key("a.b.c"), "blacklist:a.b.c");
        assert_eq!(revocation_key(""), "blacklist:");
    }

    #[tokio::test]
    async fn test_not_revoked() {
        let store = Arc::new(InMemoryRevocationStore::new());
        let cache = RevocationCache::new(store.clone(), DEFAULT_LOOKUP_TIMEOUT);

        assert_eq!(cache.is_revoked("a.b.c").await, Ok(false));
        assert_eq!(store.lookup_count(), 1);
    }

    #[tokio::test]
    async fn test_revoked_token() {
        let store = Arc::new(InMemoryRevocationStore::with_revoked(["a.b.c"]));
        let cache = RevocationCache::new(store, DEFAULT_LOOKUP_TIMEOUT);

        assert_eq!(cache.is_revoked("a.b.c").await, Ok(true));
        assert_eq!(cache.is_revoked("a.b.d").await, Ok(false));
    }

    #[tokio::test]
    async fn test_store_error_is_surfaced() {
        let cache = RevocationCache::new(
            Arc::new(UnavailableRevocationStore),
            DEFAULT_LOOKUP_TIMEOUT,
        );

        assert!(matches!(
            cache.is_revoked("a.b.c").await,
            Err(StoreError::Unavailable(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_store_times_out() {
        let cache = RevocationCache::new(
            Arc::new(SlowRevocationStore::new(Duration::from_secs(5))),
            Duration::from_millis(250),
        );

        assert_eq!(
            cache.is_revoked("a.b.c").await,
            Err(StoreError::Timeout(Duration::from_millis(250)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_enough_store_answers() {
        let cache = RevocationCache::new(
            Arc::new(SlowRevocationStore::new(Duration::from_millis(10))),
            Duration::from_millis(250),
        );

        assert_eq!(cache.is_revoked("a.b.c").await, Ok(false));
    }
}
