//! Cache backends for per-user task list snapshots.
//!
//! A cache entry holds the JSON-encoded full task list of one user under
//! [`tasks_cache_key`]. Two backends are provided: Redis for deployments and
//! an in-process cache for single-process runs and tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use entities::UserId;
use moka::future::Cache;
use moka::Expiry;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::TaskCache;

/// Lifetime of a cached task list.
pub const TASKS_CACHE_TTL: Duration = Duration::from_secs(60);

const KEY_PREFIX: &str = "tasks:user:";

/// Returns the cache key holding a user's full task list.
pub fn tasks_cache_key(user_id: UserId) -> String {
    format!("{KEY_PREFIX}{user_id}")
}

/// Cache errors. These never reach callers of the repository.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis connection error: {0}")]
    Connection(String),

    #[error("Cache command failed: {0}")]
    Command(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache call timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Minimum delay between two reconnect attempts.
pub const REDIS_RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

const REDIS_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Redis-backed cache.
///
/// Starts disconnected. While no connection is held every read is a miss and
/// every write is skipped; the connection is retried on use, at most once per
/// reconnect interval.
#[derive(Clone)]
pub struct RedisTaskCache {
    conn: Arc<RwLock<Option<ConnectionManager>>>,
    last_attempt: Arc<Mutex<Option<Instant>>>,
    reconnect_attempts: Arc<AtomicU64>,
    reconnect_interval: Duration,
    redis_url: String,
}

impl RedisTaskCache {
    /// Creates a disconnected cache for the given URL.
    pub fn new(redis_url: &str) -> Self {
        Self {
            conn: Arc::new(RwLock::new(None)),
            last_attempt: Arc::new(Mutex::new(None)),
            reconnect_attempts: Arc::new(AtomicU64::new(0)),
            reconnect_interval: REDIS_RECONNECT_INTERVAL,
            redis_url: redis_url.to_string(),
        }
    }

    /// Sets the minimum delay between reconnect attempts.
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Opens the connection manager.
    pub async fn connect(&self) -> CacheResult<()> {
        *self.last_attempt.lock().await = Some(Instant::now());

        let manager = self.open().await?;
        *self.conn.write().await = Some(manager);
        info!("Redis cache connected");
        Ok(())
    }

    /// Check if connected to Redis
    pub async fn is_connected(&self) -> bool {
        self.conn.read().await.is_some()
    }

    /// Number of reconnects tried on use.
    pub fn reconnect_attempts(&self) -> u64 {
        self.reconnect_attempts.load(Ordering::Relaxed)
    }

    async fn open(&self) -> CacheResult<ConnectionManager> {
        let client = redis::Client::open(self.redis_url.as_str())
            .map_err(|e| CacheError::Connection(e.to_string()))?;
        let config = ConnectionManagerConfig::new().set_number_of_retries(1);

        tokio::time::timeout(
            REDIS_CONNECT_TIMEOUT,
            ConnectionManager::new_with_config(client, config),
        )
        .await
        .map_err(|_| CacheError::Timeout(REDIS_CONNECT_TIMEOUT))?
        .map_err(|e| CacheError::Connection(e.to_string()))
    }

    async fn connection(&self) -> Option<ConnectionManager> {
        if let Some(conn) = self.conn.read().await.clone() {
            return Some(conn);
        }
        self.reconnect().await
    }

    async fn reconnect(&self) -> Option<ConnectionManager> {
        // Another caller is already reconnecting.
        let Ok(mut last_attempt) = self.last_attempt.try_lock() else {
            return None;
        };
        if last_attempt.is_some_and(|at| at.elapsed() < self.reconnect_interval) {
            return None;
        }
        *last_attempt = Some(Instant::now());
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);

        match self.open().await {
            Ok(manager) => {
                *self.conn.write().await = Some(manager.clone());
                info!("Redis cache reconnected");
                Some(manager)
            }
            Err(e) => {
                debug!(error = %e, "Redis reconnect failed");
                None
            }
        }
    }
}

impl std::fmt::Debug for RedisTaskCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisTaskCache")
            .field("redis_url", &self.redis_url)
            .finish()
    }
}

#[async_trait]
impl TaskCache for RedisTaskCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let Some(mut conn) = self.connection().await else {
            return Ok(None);
        };

        redis::cmd("GET")
            .arg(key)
            .query_async::<Option<Vec<u8>>>(&mut conn)
            .await
            .map_err(|e| CacheError::Command(e.to_string()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        let Some(mut conn) = self.connection().await else {
            return Ok(());
        };

        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| CacheError::Command(e.to_string()))?;

        debug!(key = %key, "Stored task list in Redis");
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let Some(mut conn) = self.connection().await else {
            return Ok(());
        };

        redis::cmd("DEL")
            .arg(key)
            .query_async::<i64>(&mut conn)
            .await
            .map_err(|e| CacheError::Command(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl<T: TaskCache + ?Sized> TaskCache for Arc<T> {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        (**self).set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        (**self).delete(key).await
    }
}

#[derive(Debug, Clone)]
struct CachedValue {
    bytes: Vec<u8>,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<String, CachedValue> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process cache honoring the TTL of each entry.
#[derive(Clone)]
pub struct MemoryTaskCache {
    cache: Cache<String, CachedValue>,
}

impl MemoryTaskCache {
    /// Default number of user lists kept in memory.
    pub const DEFAULT_CAPACITY: u64 = 10_000;

    /// Creates a cache with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates a cache holding at most `capacity` entries.
    pub fn with_capacity(capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }

    /// Returns true if a live entry exists for `key`.
    pub async fn contains(&self, key: &str) -> bool {
        self.cache.get(key).await.is_some()
    }
}

impl Default for MemoryTaskCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryTaskCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTaskCache")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

#[async_trait]
impl TaskCache for MemoryTaskCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        Ok(self.cache.get(key).await.map(|value| value.bytes))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        self.cache
            .insert(key.to_string(), CachedValue { bytes: value, ttl })
            .await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key() {
        assert_eq!(tasks_cache_key(42), "tasks:user:42");
    }

    #[tokio::test]
    async fn test_disconnected_redis_degrades() {
        let cache = RedisTaskCache::new("redis://127.0.0.1:1");
        assert!(!cache.is_connected().await);

        cache
            .set("tasks:user:1", b"[]".to_vec(), TASKS_CACHE_TTL)
            .await
            .unwrap();
        assert_eq!(cache.get("tasks:user:1").await.unwrap(), None);
        cache.delete("tasks:user:1").await.unwrap();
    }

    #[tokio::test]
    async fn test_disconnected_redis_retries_on_use() {
        let cache =
            RedisTaskCache::new("redis://127.0.0.1:1").with_reconnect_interval(Duration::ZERO);

        assert_eq!(cache.get("tasks:user:1").await.unwrap(), None);
        assert_eq!(cache.get("tasks:user:1").await.unwrap(), None);

        assert_eq!(cache.reconnect_attempts(), 2);
        assert!(!cache.is_connected().await);
    }

    #[tokio::test]
    async fn test_reconnect_attempts_are_rate_limited() {
        let cache = RedisTaskCache::new("redis://127.0.0.1:1");

        cache.get("tasks:user:1").await.unwrap();
        cache
            .set("tasks:user:1", b"[]".to_vec(), TASKS_CACHE_TTL)
            .await
            .unwrap();
        cache.delete("tasks:user:1").await.unwrap();

        assert_eq!(cache.reconnect_attempts(), 1);
    }

    #[tokio::test]
    async fn test_memory_cache_set_get_delete() {
        let cache = MemoryTaskCache::new();

        cache
            .set("tasks:user:1", b"[]".to_vec(), TASKS_CACHE_TTL)
            .await
            .unwrap();
        assert_eq!(cache.get("tasks:user:1").await.unwrap(), Some(b"[]".to_vec()));
        assert!(cache.get("tasks:user:2").await.unwrap().is_none());

        cache.delete("tasks:user:1").await.unwrap();
        assert!(!cache.contains("tasks:user:1").await);
    }

    #[tokio::test]
    async fn test_memory_cache_entry_expires() {
        let cache = MemoryTaskCache::new();

        cache
            .set("tasks:user:9", b"[]".to_vec(), Duration::from_millis(50))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(cache.get("tasks:user:9").await.unwrap().is_none());
    }
}
