//! Redis-backed cache and distributed lock.
//!
//! Both wrap a `redis::aio::ConnectionManager`, which multiplexes one
//! reconnecting connection across clones. Redis is optional: the
//! [`CacheBackend`] and [`LockBackend`] enums carry a `Disabled` variant
//! that degrades to cache misses and always-granted locks so a deployment
//! without Redis still works single-process.

use matchday_core::error::AppError;
use matchday_core::traits::{KeyValueCache, NoopCache, NoopLock, SyncLock};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::info;

fn redis_err(e: redis::RedisError) -> AppError {
    AppError::CacheError(e.to_string())
}

/// Opens a managed Redis connection.
pub async fn connect(url: &str) -> Result<ConnectionManager, AppError> {
    let client = redis::Client::open(url).map_err(redis_err)?;
    let conn = ConnectionManager::new(client).await.map_err(redis_err)?;
    info!("connected to redis");
    Ok(conn)
}

// =============================================================================
// Cache
// =============================================================================

/// Key-value cache over Redis strings.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RedisCache")
    }
}

impl KeyValueCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(redis_err)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        match ttl_secs {
            Some(ttl) => {
                let _: () = conn
                    .set_ex(key, value, ttl)
                    .await
                    .map_err(redis_err)?;
            }
            None => {
                let _: () = conn.set(key, value).await.map_err(redis_err)?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// Lock
// =============================================================================

/// Distributed lock over `SET NX EX`.
///
/// The TTL bounds how long a crashed holder can keep a key; release is a
/// plain `DEL`.
#[derive(Clone)]
pub struct RedisLock {
    conn: ConnectionManager,
}

impl RedisLock {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

impl std::fmt::Debug for RedisLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RedisLock")
    }
}

impl SyncLock for RedisLock {
    async fn acquire(&self, key: &str, ttl_secs: u64) -> Result<bool, AppError> {
        let mut conn = self.conn.clone();
        // SET key value NX EX ttl - returns OK when the key was set, nil
        // when it already existed.
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg("locked")
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await
            .map_err(redis_err)?;
        Ok(reply.is_some())
    }

    async fn release(&self, key: &str) -> Result<(), AppError> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await.map_err(redis_err)?;
        Ok(())
    }

    async fn is_held(&self, key: &str) -> Result<bool, AppError> {
        let mut conn = self.conn.clone();
        conn.exists(key).await.map_err(redis_err)
    }
}

// =============================================================================
// Optional backends
// =============================================================================

/// Cache backend selected at startup: Redis when configured, otherwise a
/// no-op that treats every lookup as a miss.
#[derive(Debug, Clone)]
pub enum CacheBackend {
    Redis(RedisCache),
    Disabled,
}

impl KeyValueCache for CacheBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        match self {
            CacheBackend::Redis(cache) => cache.get(key).await,
            CacheBackend::Disabled => NoopCache.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<(), AppError> {
        match self {
            CacheBackend::Redis(cache) => cache.set(key, value, ttl_secs).await,
            CacheBackend::Disabled => NoopCache.set(key, value, ttl_secs).await,
        }
    }
}

/// Lock backend selected at startup. Without Redis, locks are granted
/// unconditionally, which is sound only for single-replica deployments.
#[derive(Debug, Clone)]
pub enum LockBackend {
    Redis(RedisLock),
    Disabled,
}

impl SyncLock for LockBackend {
    async fn acquire(&self, key: &str, ttl_secs: u64) -> Result<bool, AppError> {
        match self {
            LockBackend::Redis(lock) => lock.acquire(key, ttl_secs).await,
            LockBackend::Disabled => NoopLock.acquire(key, ttl_secs).await,
        }
    }

    async fn release(&self, key: &str) -> Result<(), AppError> {
        match self {
            LockBackend::Redis(lock) => lock.release(key).await,
            LockBackend::Disabled => NoopLock.release(key).await,
        }
    }

    async fn is_held(&self, key: &str) -> Result<bool, AppError> {
        match self {
            LockBackend::Redis(lock) => lock.is_held(key).await,
            LockBackend::Disabled => NoopLock.is_held(key).await,
        }
    }
}
