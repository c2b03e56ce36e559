// judge-cache-redis/src/lib.rs
// ============================================================================
// Module: Redis Progress Cache
// Description: Pooled Redis client implementing judge-core's ProgressCache
//              contract: publish-only, last-write-wins, TTL-bounded keys.
// Purpose: The reference Progress Cache client (§4.8 / §6).
// Dependencies: redis, r2d2, judge-core
// ============================================================================

//! ## Overview
//! The orchestrator is the sole writer for a given submission fingerprint
//! (§5), so this client never reads back what it writes and needs no
//! cross-writer locking. A pooled connection manager keeps concurrent
//! `spawn_blocking` invocations from sharing one TCP connection.

// ============================================================================
// SECTION: Imports
// ============================================================================

use judge_core::CacheError;
use judge_core::ProgressCache;
use judge_core::ProgressSnapshot;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable naming the cache's connection address.
pub const CACHE_URL_ENV: &str = "JUDGE_CACHE_URL";
/// Connection address used when [`CACHE_URL_ENV`] is unset: the loopback
/// host on Redis's default port.
pub const DEFAULT_CACHE_URL: &str = "redis://127.0.0.1:6379";

/// Errors establishing the Redis connection pool, distinct from
/// [`CacheError`]: this one only ever occurs at daemon startup, never
/// mid-submission, so the orchestrator's publish path never needs to
/// distinguish its variants.
#[derive(Debug, Error)]
pub enum RedisCacheError {
    /// The connection address was not a valid Redis URL.
    #[error("invalid redis connection address: {0}")]
    InvalidUrl(#[source] redis::RedisError),
    /// The connection pool could not be built.
    #[error("failed to build redis connection pool: {0}")]
    PoolInit(#[source] r2d2::Error),
}

/// A Redis-backed [`ProgressCache`], pooled via `r2d2`.
///
/// Every publish is an unconditional `SET key value EX ttl_secs` — there
/// is no read-modify-write, matching the single-writer-per-submission
/// invariant in §5.
pub struct RedisProgressCache {
    pool: r2d2::Pool<redis::Client>,
}

impl RedisProgressCache {
    /// Opens a pooled connection to `redis_url`.
    ///
    /// # Errors
    ///
    /// Returns [`RedisCacheError::InvalidUrl`] if `redis_url` cannot be
    /// parsed, or [`RedisCacheError::PoolInit`] if the pool could not be
    /// built (this does not require the server to be reachable yet;
    /// `r2d2` connects lazily on first checkout).
    pub fn new(redis_url: &str) -> Result<Self, RedisCacheError> {
        let client = redis::Client::open(redis_url).map_err(RedisCacheError::InvalidUrl)?;
        let pool = r2d2::Pool::builder().build(client).map_err(RedisCacheError::PoolInit)?;
        Ok(Self { pool })
    }

    /// Opens a pooled connection using [`CACHE_URL_ENV`], falling back to
    /// [`DEFAULT_CACHE_URL`] when unset, per §6.
    ///
    /// # Errors
    ///
    /// See [`RedisProgressCache::new`].
    pub fn from_env() -> Result<Self, RedisCacheError> {
        let redis_url = std::env::var(CACHE_URL_ENV).unwrap_or_else(|_| DEFAULT_CACHE_URL.to_string());
        Self::new(&redis_url)
    }

    /// Writes `value` at `key` with the given TTL, translating any pool
    /// or connection failure into [`CacheError::Backend`].
    fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let mut conn = self.pool.get().map_err(|err| CacheError::Backend(err.to_string()))?;
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_secs)
            .query::<()>(&mut *conn)
            .map_err(|err| CacheError::Backend(err.to_string()))
    }
}

impl ProgressCache for RedisProgressCache {
    fn publish_snapshot(&self, key: &str, snapshot: &ProgressSnapshot, ttl_secs: u64) -> Result<(), CacheError> {
        let payload = serde_json::to_string(snapshot).map_err(|err| CacheError::Backend(err.to_string()))?;
        self.set_with_ttl(key, &payload, ttl_secs)
    }

    fn publish_report(&self, key: &str, report: &str, ttl_secs: u64) -> Result<(), CacheError> {
        self.set_with_ttl(key, report, ttl_secs)
    }
}

#[cfg(test)]
#[allow(
    unsafe_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::missing_docs_in_private_items,
    reason = "test assertions use panic-based helpers for clarity; env var mutation is test-only"
)]
mod tests {
    use super::*;

    #[test]
    fn invalid_url_is_rejected_before_any_connection_attempt() {
        let result = RedisProgressCache::new("not-a-redis-url");
        assert!(matches!(result, Err(RedisCacheError::InvalidUrl(_))));
    }

    #[test]
    fn from_env_falls_back_to_loopback_default() {
        // SAFETY: test-only; no other test in this process depends on
        // `JUDGE_CACHE_URL` being set.
        unsafe {
            std::env::remove_var(CACHE_URL_ENV);
        }
        let cache = RedisProgressCache::from_env();
        assert!(cache.is_ok(), "pool construction does not require server reachability");
    }
}
