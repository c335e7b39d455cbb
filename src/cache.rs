use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

struct Entry<T> {
    value: Arc<T>,
    loaded_at: Instant,
}

pub struct QueryCache<T> {
    ttl: Duration,
    entries: HashMap<String, Entry<T>>,
}

impl<T> QueryCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// The cached value for `key`, unless it has outlived the TTL.
    pub fn get(&self, key: &str) -> Option<Arc<T>> {
        self.entries
            .get(key)
            .filter(|entry| entry.loaded_at.elapsed() < self.ttl)
            .map(|entry| Arc::clone(&entry.value))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.entries.insert(
            key.into(),
            Entry {
                value: Arc::clone(&value),
                loaded_at: Instant::now(),
            },
        );
        value
    }

    pub fn invalidate(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Returns the fresh cached value or runs `load` and caches its result.
    /// A failed load leaves any stale entry in place and caches nothing.
    pub async fn get_or_try_load<F, Fut, E>(&mut self, key: &str, load: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get(key) {
            debug!(key, "query cache hit");
            return Ok(value);
        }

        let started = Instant::now();
        let value = load().await?;
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "loaded query result into cache"
        );
        Ok(self.insert(key, value))
    }
}

#[cfg(test)]
impl<T> QueryCache<T> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entries_are_returned() {
        let mut cache = QueryCache::new(Duration::from_secs(60));
        cache.insert("q1", vec![1, 2, 3]);

        assert_eq!(cache.get("q1").as_deref(), Some(&vec![1, 2, 3]));
        assert!(cache.get("q2").is_none());
    }

    #[test]
    fn expired_entries_are_ignored() {
        let mut cache = QueryCache::new(Duration::ZERO);
        cache.insert("q1", 7);

        assert!(cache.get("q1").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalidate_removes_one_key() {
        let mut cache = QueryCache::new(Duration::from_secs(60));
        cache.insert("q1", 1);
        cache.insert("q2", 2);

        assert!(cache.invalidate("q1"));
        assert!(!cache.invalidate("q1"));
        assert!(cache.get("q1").is_none());
        assert_eq!(cache.get("q2").as_deref(), Some(&2));

        assert!(cache.invalidate("q2"));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn loads_once_while_fresh() {
        let mut cache = QueryCache::new(Duration::from_secs(60));
        let mut calls = 0;

        for _ in 0..3 {
            let value = cache
                .get_or_try_load("q1", || {
                    calls += 1;
                    async { Ok::<_, String>(42) }
                })
                .await
                .unwrap();
            assert_eq!(*value, 42);
        }

        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn failed_load_is_not_cached() {
        let mut cache: QueryCache<i32> = QueryCache::new(Duration::from_secs(60));

        let result = cache
            .get_or_try_load("q1", || async { Err::<i32, _>("offline".to_string()) })
            .await;
        assert_eq!(result.unwrap_err(), "offline");
        assert!(cache.is_empty());
    }
}
