//! Result cache abstraction
//!
//! Provides:
//! - The [`ResultCache`] contract (get/set/evict) owned by callers
//! - A Redis implementation with TTL and key prefixing
//! - An in-process implementation with TTL
//! - Typed JSON helpers on top of the string contract

use crate::config::CacheConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Key/value cache for serialised results
#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Stored value, or `None` when absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value under `key` with the cache's default TTL
    async fn set(&self, key: &str, value: String) -> Result<()>;

    /// Drop `key`; returns whether something was removed
    async fn evict(&self, key: &str) -> Result<bool>;

    /// Name used in logs and metrics
    fn name(&self) -> &'static str;
}

/// Read a JSON value from any cache
pub async fn get_json<T: DeserializeOwned>(cache: &dyn ResultCache, key: &str) -> Result<Option<T>> {
    match cache.get(key).await? {
        Some(json) => {
            let parsed = serde_json::from_str(&json).map_err(|e| AppError::CacheError {
                message: format!("Failed to parse cached value: {}", e),
            })?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Write a JSON value to any cache
pub async fn set_json<T: Serialize>(cache: &dyn ResultCache, key: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string(value).map_err(|e| AppError::CacheError {
        message: format!("Failed to serialize value: {}", e),
    })?;
    cache.set(key, json).await
}

// ============================================================================
// Redis
// ============================================================================

/// Redis-backed cache
pub struct RedisCache {
    connection: RwLock<MultiplexedConnection>,
    default_ttl_secs: u64,
    key_prefix: String,
}

impl RedisCache {
    /// Connect to the configured Redis instance
    pub async fn new(config: &CacheConfig) -> Result<Self> {
        let url = config.url.as_deref().ok_or_else(|| AppError::Configuration {
            message: "cache.url is required for the Redis cache".to_string(),
        })?;

        let client = Client::open(url).map_err(|e| AppError::CacheError {
            message: format!("Failed to create Redis client: {}", e),
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Failed to connect to Redis: {}", e),
            })?;

        Ok(Self {
            connection: RwLock::new(connection),
            default_ttl_secs: config.default_ttl_secs,
            key_prefix: config.key_prefix.clone(),
        })
    }

    /// Build a prefixed key
    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }

    /// Ping Redis to check connectivity
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.connection.write().await;
        redis::cmd("PING")
            .query_async::<String>(&mut *conn)
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Redis ping failed: {}", e),
            })?;
        Ok(())
    }
}

#[async_trait]
impl ResultCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let full_key = self.key(key);
        let mut conn = self.connection.write().await;

        let value: Option<String> = conn.get(&full_key).await.map_err(|e| AppError::CacheError {
            message: format!("Failed to get key '{}': {}", full_key, e),
        })?;

        debug!(key = %full_key, hit = value.is_some(), "Cache get");
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let full_key = self.key(key);
        let mut conn = self.connection.write().await;

        conn.set_ex::<_, _, ()>(&full_key, value, self.default_ttl_secs)
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Failed to set key '{}': {}", full_key, e),
            })?;

        debug!(key = %full_key, ttl_secs = self.default_ttl_secs, "Cache set");
        Ok(())
    }

    async fn evict(&self, key: &str) -> Result<bool> {
        let full_key = self.key(key);
        let mut conn = self.connection.write().await;

        let deleted: i32 = conn.del(&full_key).await.map_err(|e| AppError::CacheError {
            message: format!("Failed to delete key '{}': {}", full_key, e),
        })?;

        debug!(key = %full_key, deleted = deleted > 0, "Cache evict");
        Ok(deleted > 0)
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

// ============================================================================
// In-process
// ============================================================================

/// In-process cache with a fixed TTL
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
    ttl: Duration,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(Duration::from_secs(config.default_ttl_secs))
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ResultCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|(_, stored_at)| stored_at.elapsed() < self.ttl)
            .map(|(value, _)| value.clone()))
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.retain(|_, (_, stored_at)| stored_at.elapsed() < self.ttl);
        entries.insert(key.to_string(), (value, Instant::now()));
        Ok(())
    }

    async fn evict(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Cache key builder helpers
pub mod keys {
    /// Build a search result cache key from a filter digest
    pub fn search(filter_hash: &str) -> String {
        format!("search:{}", filter_hash)
    }

    /// Build a paper cache key
    pub fn paper(arxiv_id: &str) -> String {
        format!("paper:{}", arxiv_id)
    }
}
