//! Short-TTL memoization for derived responses.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

/// Default lifetime for cached responses.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// How often the background sweeper purges expired entries.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// In-memory TTL cache. Expired entries are removed lazily on access and
/// proactively by [`ResponseCache::spawn_sweeper`], so keys that are set but
/// never re-read do not accumulate.
pub struct ResponseCache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Arc<Mutex<HashMap<K, CacheEntry<V>>>>,
    default_ttl: Duration,
}

impl<K, V> Clone for ResponseCache<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            default_ttl: self.default_ttl,
        }
    }
}

impl<K, V> ResponseCache<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(default_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            default_ttl,
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let mut cache = self.inner.lock().await;
        match cache.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                debug!("Cache HIT");
                Some(entry.value.clone())
            }
            Some(_) => {
                debug!("Cache entry expired");
                cache.remove(key);
                None
            }
            None => {
                debug!("Cache MISS");
                None
            }
        }
    }

    pub async fn put(&self, key: K, value: V) {
        self.put_with_ttl(key, value, self.default_ttl).await;
    }

    pub async fn put_with_ttl(&self, key: K, value: V, ttl: Duration) {
        let mut cache = self.inner.lock().await;
        debug!("Cache PUT");
        cache.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    pub async fn remove(&self, key: &K) {
        let mut cache = self.inner.lock().await;
        cache.remove(key);
    }

    /// Drops every expired entry, independent of access patterns.
    pub async fn purge_expired(&self) {
        let mut cache = self.inner.lock().await;
        let now = Instant::now();
        let before = cache.len();
        cache.retain(|_, entry| entry.expires_at > now);
        let purged = before - cache.len();
        if purged > 0 {
            debug!(purged, "Cache sweep removed expired entries");
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    /// Runs [`Self::purge_expired`] on a fixed interval until dropped.
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick completes immediately
            loop {
                ticker.tick().await;
                cache.purge_expired().await;
            }
        })
    }
}

impl<K, V> Default for ResponseCache<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_cache_get_put() {
        let cache = ResponseCache::<String, i32>::new();

        assert!(cache.get(&"key1".to_string()).await.is_none());

        cache.put("key1".to_string(), 123).await;
        assert_eq!(cache.get(&"key1".to_string()).await, Some(123));

        assert!(cache.get(&"key2".to_string()).await.is_none());
    }

    #[tokio::test]
    async fn test_cache_ttl_expiration_removes_entry() {
        let cache = ResponseCache::<String, i32>::new();

        cache
            .put_with_ttl("key1".to_string(), 123, Duration::from_millis(10))
            .await;
        assert_eq!(cache.get(&"key1".to_string()).await, Some(123));
        assert_eq!(cache.len().await, 1);

        sleep(Duration::from_millis(20)).await;

        // The expired entry is dropped by the failed lookup itself.
        assert!(cache.get(&"key1".to_string()).await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_purge_expired_sweeps_unread_keys() {
        let cache = ResponseCache::<String, i32>::new();

        cache
            .put_with_ttl("stale".to_string(), 1, Duration::from_millis(10))
            .await;
        cache.put("fresh".to_string(), 2).await;
        sleep(Duration::from_millis(20)).await;

        cache.purge_expired().await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get(&"fresh".to_string()).await, Some(2));
    }

    #[tokio::test]
    async fn test_cache_remove() {
        let cache = ResponseCache::<String, i32>::new();

        cache.put("key1".to_string(), 123).await;
        cache.remove(&"key1".to_string()).await;
        assert!(cache.get(&"key1".to_string()).await.is_none());
    }

    #[tokio::test]
    async fn test_sweeper_runs_in_background() {
        let cache = ResponseCache::<String, i32>::new();
        cache
            .put_with_ttl("stale".to_string(), 1, Duration::from_millis(5))
            .await;

        let handle = cache.spawn_sweeper(Duration::from_millis(20));
        sleep(Duration::from_millis(60)).await;

        assert!(cache.is_empty().await);
        handle.abort();
    }
}
