// Cache module with fallback when Redis is not available

use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub mod preview;

pub use preview::{PreviewStore, StoredPreview};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("Cache operation failed: {0}")]
    OperationFailed(String),
    #[error("Invalid TTL")]
    InvalidTTL,
}

#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;
    /// Removes the entry and returns its value in one step. Of several
    /// concurrent callers for the same key at most one observes `Some`.
    async fn take(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn clear(&self) -> Result<(), CacheError>;
}

// In-memory cache implementation, process-local
#[derive(Debug, Clone, Default)]
pub struct InMemoryCache {
    store: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(value: String, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|d| Instant::now() + d),
        }
    }

    fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Instant::now() >= expires_at,
            None => false,
        }
    }
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry>> {
        self.store.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry>> {
        self.store
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut store = self.write();
        let before = store.len();
        store.retain(|_, entry| !entry.is_expired());
        before - store.len()
    }

    /// Purges expired entries every `every` on the current runtime. The task
    /// ends once the last handle to this cache is dropped.
    pub fn spawn_sweeper(&self, every: Duration) -> Option<JoinHandle<()>> {
        let runtime = tokio::runtime::Handle::try_current().ok()?;
        let store = Arc::downgrade(&self.store);
        Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                let purged = InMemoryCache { store }.purge_expired();
                if purged > 0 {
                    debug!(purged, "purged expired cache entries");
                }
            }
        }))
    }

    pub fn len(&self) -> usize {
        self.read().values().filter(|e| !e.is_expired()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl CacheBackend for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        {
            let store = self.read();
            match store.get(key) {
                Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
                None => return Ok(None),
                Some(_) => {}
            }
        }
        // expired: evict lazily
        self.write().remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        if matches!(ttl, Some(d) if d.is_zero()) {
            return Err(CacheError::InvalidTTL);
        }
        self.write()
            .insert(key.to_string(), CacheEntry::new(value.to_string(), ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.write().remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self
            .read()
            .get(key)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false))
    }

    async fn take(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entry = self.write().remove(key);
        Ok(entry.filter(|e| !e.is_expired()).map(|e| e.value))
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.write().clear();
        Ok(())
    }
}

/// Redis-backed cache shared by every instance of the service.
///
/// Commands go through one multiplexed [`ConnectionManager`], which
/// reconnects on its own after a dropped connection.
#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
    namespace: String,
}

impl RedisCache {
    pub async fn connect(
        client: redis::Client,
        namespace: impl Into<String>,
    ) -> Result<Self, CacheError> {
        let manager = ConnectionManager::new(client).await?;
        Ok(Self {
            manager,
            namespace: namespace.into(),
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    fn connection(&self) -> ConnectionManager {
        self.manager.clone()
    }
}

#[async_trait::async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection();
        let value: Option<String> = redis::cmd("GET")
            .arg(self.key(key))
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut conn = self.connection();
        let mut cmd = redis::cmd("SET");
        cmd.arg(self.key(key)).arg(value);
        if let Some(ttl) = ttl {
            let millis = ttl.as_millis() as u64;
            if millis == 0 {
                return Err(CacheError::InvalidTTL);
            }
            cmd.arg("PX").arg(millis);
        }
        cmd.query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection();
        redis::cmd("DEL")
            .arg(self.key(key))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.connection();
        let count: i64 = redis::cmd("EXISTS")
            .arg(self.key(key))
            .query_async(&mut conn)
            .await?;
        Ok(count > 0)
    }

    async fn take(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection();
        let value: Option<String> = redis::cmd("GETDEL")
            .arg(self.key(key))
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let mut conn = self.connection();
        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(format!("{}:*", self.namespace))
            .query_async(&mut conn)
            .await?;
        if !keys.is_empty() {
            redis::cmd("DEL")
                .arg(keys)
                .query_async::<_, ()>(&mut conn)
                .await?;
        }
        Ok(())
    }
}

pub struct CacheFactory;

impl CacheFactory {
    /// Builds the configured backend. An unreachable Redis degrades to the
    /// in-memory cache, which only works while requests stick to one instance.
    pub async fn create_cache(config: &crate::config::CacheConfig) -> Arc<dyn CacheBackend> {
        if config.cache_type.eq_ignore_ascii_case("redis") {
            let connected = match redis::Client::open(config.redis_url.as_str()) {
                Ok(client) => RedisCache::connect(client, config.namespace.clone()).await,
                Err(err) => Err(err.into()),
            };
            match connected {
                Ok(cache) => {
                    info!("Using Redis cache backend");
                    return Arc::new(cache);
                }
                Err(err) => {
                    warn!(error = %err, "Redis unavailable, falling back to in-memory cache");
                }
            }
        }
        let cache = InMemoryCache::new();
        cache.spawn_sweeper(Duration::from_secs(config.sweep_interval_secs));
        Arc::new(cache)
    }
}
