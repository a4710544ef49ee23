//! # Aegis Cache
//!
//! Two-tier resilient cache fronting the C2 repository layer for hot reads:
//! a bounded in-process map backed by a shared Redis/Valkey-class store.
//!
//! ## Contract
//!
//! - `get`: prefer the distributed tier when the region's circuit breaker
//!   is closed; fall back to the in-process tier on distributed failure,
//!   circuit-open, or miss. A successful distributed hit warms the
//!   in-process tier.
//! - `put`: always populates the in-process tier; the distributed write is
//!   attempted but its failure is non-fatal.
//! - `load_or_compute`: cache-aside with single-flight coalescing — only
//!   one caller per key per process actually runs the loader; the rest
//!   await its result.
//! - Values are never cached as absent — see [`ResilientCache::load_or_compute`].
//!
//! ## Example
//!
//! ```ignore
//! use aegis_cache::{CacheConfig, CacheRegion, ResilientCache};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache: ResilientCache<String, String> = ResilientCache::new(
//!     "redis://127.0.0.1:6379",
//!     CacheConfig::for_region(CacheRegion::Users),
//! ).await?;
//!
//! let value = cache.load_or_compute("user:42".to_string(), || async {
//!     Ok::<_, aegis_cache::CacheError>("Ada Lovelace".to_string())
//! }).await?;
//! # Ok(())
//! # }
//! ```

use aegis_runtime::{CircuitBreaker, Either};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, VecDeque};
use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, Notify, RwLock};

mod config;

pub use config::{CacheConfig, CacheRegion};

/// Errors surfaced by cache operations.
///
/// Distributed-tier failures are deliberately absorbed by
/// [`ResilientCache`] internally (logged, fed to the breaker, and
/// fallen back from) rather than returned here — this type exists for
/// the caller-supplied loader in [`ResilientCache::load_or_compute`].
#[derive(Debug, Error)]
pub enum CacheError {
    /// The loader passed to `load_or_compute` failed.
    #[error("cache loader failed: {0}")]
    LoaderFailed(String),

    /// Value serialization for the distributed tier failed.
    #[error("cache value serialization failed: {0}")]
    Serialization(#[from] Box<bincode::ErrorKind>),
}

struct LocalEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Two-tier cache: bounded in-process map + distributed Redis/Valkey tier,
/// fronted by a per-region circuit breaker.
///
/// One instance serves one [`CacheRegion`]; construct one per region so
/// TTLs and breaker state don't bleed across unrelated data.
pub struct ResilientCache<K, V> {
    region: CacheRegion,
    ttl: Duration,
    operation_timeout: Duration,
    local_max_entries: usize,
    local: RwLock<HashMap<K, LocalEntry<V>>>,
    local_order: Mutex<VecDeque<K>>,
    redis: ConnectionManager,
    breaker: CircuitBreaker,
    inflight: Mutex<HashMap<K, Arc<Notify>>>,
}

impl<K, V> ResilientCache<K, V>
where
    K: Eq + Hash + Clone + Display + Send + Sync + 'static,
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Connect to `redis_url` and build a cache for the region named in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the Redis client or connection manager cannot
    /// be constructed. Connection is otherwise lazy and resilient to
    /// transient outages after this call returns.
    pub async fn new(
        redis_url: &str,
        config: CacheConfig,
    ) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;

        Ok(Self {
            region: config.region,
            ttl: config.ttl,
            operation_timeout: config.operation_timeout,
            local_max_entries: config.local_max_entries,
            local: RwLock::new(HashMap::new()),
            local_order: Mutex::new(VecDeque::new()),
            redis,
            breaker: CircuitBreaker::new()
                .with_failure_threshold(config.failure_threshold as usize)
                .with_timeout(config.breaker_cooldown),
            inflight: Mutex::new(HashMap::new()),
        })
    }

    fn redis_key(&self, key: &K) -> String {
        format!("{}:{key}", self.region.key_prefix())
    }

    /// Look up `key`, preferring the distributed tier.
    pub async fn get(&self, key: &K) -> Option<V> {
        if let Some(value) = self.get_distributed(key).await {
            self.put_local(key.clone(), value.clone()).await;
            return Some(value);
        }
        self.get_local(key).await
    }

    async fn get_distributed(&self, key: &K) -> Option<V> {
        let redis_key = self.redis_key(key);
        let mut conn = self.redis.clone();

        let result = self
            .breaker
            .call(|| async move {
                tokio::time::timeout(self.operation_timeout, async move {
                    conn.get::<_, Option<Vec<u8>>>(&redis_key).await
                })
                .await
                .map_err(|_| redis::RedisError::from(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "cache operation timed out",
                )))?
            })
            .await;

        match result {
            Ok(Some(bytes)) => match bincode::deserialize::<V>(&bytes) {
                Ok(value) => {
                    metrics::counter!("cache.distributed.hit", "region" => self.region.key_prefix()).increment(1);
                    Some(value)
                }
                Err(error) => {
                    tracing::warn!(region = self.region.key_prefix(), %error, "cache value failed to deserialize");
                    None
                }
            },
            Ok(None) => {
                metrics::counter!("cache.distributed.miss", "region" => self.region.key_prefix()).increment(1);
                None
            }
            Err(Either::Left(_breaker_open)) => {
                metrics::counter!("cache.distributed.breaker_open", "region" => self.region.key_prefix()).increment(1);
                None
            }
            Err(Either::Right(error)) => {
                tracing::warn!(region = self.region.key_prefix(), %error, "distributed cache read failed");
                None
            }
        }
    }

    async fn get_local(&self, key: &K) -> Option<V> {
        let local = self.local.read().await;
        local.get(key).and_then(|entry| {
            if entry.expires_at > Instant::now() {
                Some(entry.value.clone())
            } else {
                None
            }
        })
    }

    /// Populate both tiers with `value`. The distributed write is
    /// best-effort: its failure does not prevent the in-process write and
    /// is not returned to the caller.
    pub async fn put(&self, key: K, value: V) {
        self.put_local(key.clone(), value.clone()).await;
        self.put_distributed(&key, &value).await;
    }

    async fn put_local(&self, key: K, value: V) {
        let mut local = self.local.write().await;
        let mut order = self.local_order.lock().await;

        if !local.contains_key(&key) && local.len() >= self.local_max_entries {
            if let Some(evicted) = order.pop_front() {
                local.remove(&evicted);
            }
        }

        if !local.contains_key(&key) {
            order.push_back(key.clone());
        }

        local.insert(
            key,
            LocalEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    async fn put_distributed(&self, key: &K, value: &V) {
        let Ok(bytes) = bincode::serialize(value) else {
            tracing::warn!(region = self.region.key_prefix(), "cache value failed to serialize, skipping distributed write");
            return;
        };
        let redis_key = self.redis_key(key);
        let ttl_secs = self.ttl.as_secs().max(1);
        let mut conn = self.redis.clone();

        let result = self
            .breaker
            .call(|| async move {
                tokio::time::timeout(self.operation_timeout, async move {
                    conn.set_ex::<_, _, ()>(&redis_key, bytes, ttl_secs).await
                })
                .await
                .map_err(|_| redis::RedisError::from(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "cache operation timed out",
                )))?
            })
            .await;

        if let Err(error) = result {
            tracing::warn!(region = self.region.key_prefix(), ?error, "distributed cache write failed, local write still applied");
        }
    }

    /// Cache-aside read with single-flight coalescing: at most one caller
    /// per key per process runs `loader`; concurrent callers for the same
    /// key await that result instead of each running it themselves.
    ///
    /// `loader` must never resolve to "not found" by returning `Ok`
    /// with a sentinel value — model absence as `Err` instead. This cache
    /// never stores a negative/absent result, matching the no-null-caching
    /// invariant.
    ///
    /// # Errors
    ///
    /// Returns whatever error `loader` produces, wrapped as
    /// [`CacheError::LoaderFailed`] if the caller didn't already produce a
    /// `CacheError`.
    pub async fn load_or_compute<F, Fut>(&self, key: K, loader: F) -> Result<V, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<V, CacheError>>,
    {
        if let Some(value) = self.get(&key).await {
            return Ok(value);
        }

        loop {
            let mut inflight = self.inflight.lock().await;
            if let Some(notify) = inflight.get(&key).cloned() {
                drop(inflight);
                notify.notified().await;
                if let Some(value) = self.get(&key).await {
                    return Ok(value);
                }
                // The in-flight load failed for everyone; fall through and
                // try to become the new leader.
                continue;
            }

            let notify = Arc::new(Notify::new());
            inflight.insert(key.clone(), notify.clone());
            drop(inflight);

            let result = loader().await;

            let mut inflight = self.inflight.lock().await;
            inflight.remove(&key);
            drop(inflight);
            notify.notify_waiters();

            return match result {
                Ok(value) => {
                    self.put(key, value.clone()).await;
                    Ok(value)
                }
                Err(error) => Err(error),
            };
        }
    }
}
