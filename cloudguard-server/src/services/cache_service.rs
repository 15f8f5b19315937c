use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use time::OffsetDateTime;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: serde_json::Value,
    pub expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl CacheEntry {
    fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|expires_at| now > expires_at)
    }
}

/// In-process TTL cache holding JSON documents.
pub struct CacheService {
    cache: Arc<RwLock<HashMap<String, CacheEntry>>>,
    default_ttl: Option<Duration>,
}

impl CacheService {
    pub fn new(default_ttl: Option<Duration>) -> Self {
        let service = Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            default_ttl,
        };

        service.start_cleanup_task();

        service
    }

    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), serde_json::Error> {
        let now = OffsetDateTime::now_utc();
        let expires_at = ttl
            .or(self.default_ttl)
            .map(|d| now + time::Duration::milliseconds(d.as_millis() as i64));

        let entry = CacheEntry {
            value: serde_json::to_value(value)?,
            expires_at,
            created_at: now,
        };

        self.cache.write().await.insert(key.to_string(), entry);

        Ok(())
    }

    pub async fn get_json(&self, key: &str) -> Option<serde_json::Value> {
        let mut cache = self.cache.write().await;

        match cache.get(key) {
            Some(entry) if entry.is_expired(OffsetDateTime::now_utc()) => {
                cache.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    /// Typed read; an entry of another shape counts as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_json(key)
            .await
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// Returns the cached value, or runs `load` and caches its success.
    /// Failures are not cached.
    pub async fn remember<T, E, F, Fut>(&self, key: &str, ttl: Duration, load: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get(key).await {
            tracing::debug!(key, "cache hit");
            return Ok(value);
        }

        let value = load().await?;
        if let Err(err) = self.set(key, &value, Some(ttl)).await {
            tracing::warn!(key, "failed to cache value: {}", err);
        }

        Ok(value)
    }

    pub async fn delete(&self, key: &str) -> bool {
        self.cache.write().await.remove(key).is_some()
    }

    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    fn start_cleanup_task(&self) {
        let cache: Weak<_> = Arc::downgrade(&self.cache);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));

            loop {
                interval.tick().await;

                let Some(cache) = cache.upgrade() else {
                    break;
                };

                let now = OffsetDateTime::now_utc();
                let mut cache = cache.write().await;
                let before = cache.len();
                cache.retain(|_, entry| !entry.is_expired(now));

                if cache.len() < before {
                    tracing::debug!(
                        evicted = before - cache.len(),
                        "expired cache entries evicted"
                    );
                }
            }
        });
    }
}
