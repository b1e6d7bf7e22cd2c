use async_trait::async_trait;
use futures::future::BoxFuture;
use moka::Expiry;
use moka::future::Cache;
use selfcache::{CacheBackend, CacheKey};
use shared::config::Config;
use shared::{Result, TtlSecs};
use std::fmt::Debug;
use std::time::{Duration, Instant};

#[derive(Clone)]
struct CachedEntry {
    payload: Vec<u8>,
    ttl: Duration,
}

/// Each entry expires at write time plus the TTL it was written with
struct PerEntryTtl;

impl Expiry<String, CachedEntry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Moka-based cache backend with per-entry TTL
/// Provides lock-free, concurrent cache with an optional entry bound
pub struct MokaCacheBackend {
    cache: Cache<String, CachedEntry>,
}

impl MokaCacheBackend {
    /// Create a named cache, bounded to `max_entries` when given
    pub fn new(name: &str, max_entries: Option<u64>) -> Self {
        let mut builder = Cache::builder().name(name).expire_after(PerEntryTtl);

        if let Some(capacity) = max_entries {
            builder = builder.max_capacity(capacity);
        }

        Self {
            cache: builder.build(),
        }
    }

    pub fn new_unbounded() -> Self {
        Self::new("selfcache", None)
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.cache_name, config.max_entries)
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Apply pending evictions and expirations now
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }

    async fn insert(&self, key: &CacheKey, payload: Vec<u8>, ttl: TtlSecs) {
        let entry = CachedEntry {
            payload,
            ttl: ttl.as_duration(),
        };
        self.cache.insert(key.to_string(), entry).await;
    }
}

#[async_trait]
impl CacheBackend for MokaCacheBackend {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>> {
        // Expired entries read as absent
        Ok(self.cache.get(key.as_str()).await.map(|entry| entry.payload))
    }

    async fn remember<'a>(
        &'a self,
        key: &'a CacheKey,
        ttl: TtlSecs,
        compute: BoxFuture<'a, Result<Vec<u8>>>,
    ) -> Result<Vec<u8>> {
        if let Some(entry) = self.cache.get(key.as_str()).await {
            tracing::debug!("Cache hit for '{}'", key);
            return Ok(entry.payload);
        }

        // Concurrent misses may each compute. Only the first lands, and an
        // entry written by put while computing is kept over the computed one.
        let computed = CachedEntry {
            payload: compute.await?,
            ttl: ttl.as_duration(),
        };
        let entry = self.cache.entry(key.to_string()).or_insert(computed).await;
        if !entry.is_fresh() {
            tracing::debug!("Kept entry written to '{}' while loading", key);
        }
        Ok(entry.into_value().payload)
    }

    async fn put(&self, key: &CacheKey, payload: Vec<u8>, ttl: TtlSecs) -> Result<()> {
        self.insert(key, payload, ttl).await;
        Ok(())
    }

    async fn forget(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.cache.remove(key.as_str()).await.is_some())
    }
}

impl Debug for MokaCacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaCacheBackend")
            .field("name", &self.cache.name())
            .field("entry_count", &self.cache.entry_count())
            .field("weighted_size", &self.cache.weighted_size())
            .finish()
    }
}
