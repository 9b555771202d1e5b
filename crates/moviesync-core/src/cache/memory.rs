// ── In-memory cache ──
//
// Process-lifetime cache for tests and sessions that should leave
// nothing on disk.

use async_trait::async_trait;
use dashmap::DashMap;

use super::{CacheError, LocalCache};

/// Lock-free in-memory [`LocalCache`].
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, String>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl LocalCache for MemoryCache {
    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.entries.iter().map(|r| r.key().clone()).collect())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.get(key).map(|r| r.value().clone()))
    }

    async fn put(&self, key: &str, value: String) -> Result<(), CacheError> {
        self.entries.insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_overwrites() {
        let cache = MemoryCache::new();
        cache.put("1", "a".into()).await.unwrap();
        cache.put("1", "b".into()).await.unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("1").await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn remove_missing_key_is_ok() {
        let cache = MemoryCache::new();
        cache.remove("nope").await.unwrap();
        assert!(cache.is_empty());
        assert!(cache.get("nope").await.unwrap().is_none());
    }
}
