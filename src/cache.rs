// 🗃️ Cache
// Injected get/put/remove store with per-entry TTL

use crate::error::{FeedError, FeedResult};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Single key under which the serialized feed is stored
pub const CACHE_KEY: &str = "ics_feed_events";

/// Cache - injected key-value store with expiry
///
/// Each operation is atomic for its key; there are no multi-key transactions.
pub trait Cache: Send + Sync {
    /// Stored value, or None when absent or expired
    fn get(&self, key: &str) -> FeedResult<Option<String>>;

    fn put(&self, key: &str, value: &str, ttl: Duration) -> FeedResult<()>;

    fn remove(&self, key: &str) -> FeedResult<()>;
}

/// MemoryCache - in-process cache keyed by `Instant` deadlines
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, (String, Instant)>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> FeedResult<Option<String>> {
        let mut entries = self.lock();

        let expired = match entries.get(key) {
            Some((_, deadline)) => Instant::now() >= *deadline,
            None => return Ok(None),
        };

        if expired {
            entries.remove(key);
            return Ok(None);
        }
        Ok(entries.get(key).map(|(value, _)| value.clone()))
    }

    fn put(&self, key: &str, value: &str, ttl: Duration) -> FeedResult<()> {
        let deadline = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| FeedError::Cache(format!("ttl out of range: {}s", ttl.as_secs())))?;
        self.lock()
            .insert(key.to_string(), (value.to_string(), deadline));
        Ok(())
    }

    fn remove(&self, key: &str) -> FeedResult<()> {
        self.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_then_get() {
        let cache = MemoryCache::new();
        cache.put(CACHE_KEY, "[]", Duration::from_secs(60)).unwrap();
        assert_eq!(cache.get(CACHE_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_expired_entry_is_absent() {
        let cache = MemoryCache::new();
        cache.put(CACHE_KEY, "[]", Duration::ZERO).unwrap();
        assert_eq!(cache.get(CACHE_KEY).unwrap(), None);
    }

    #[test]
    fn test_oversized_ttl_is_error_not_panic() {
        let cache = MemoryCache::new();
        let result = cache.put(CACHE_KEY, "[]", Duration::from_secs(u64::MAX));

        assert!(matches!(result, Err(FeedError::Cache(_))));
        assert_eq!(cache.get(CACHE_KEY).unwrap(), None);
    }

    #[test]
    fn test_remove() {
        let cache = MemoryCache::new();
        cache.put(CACHE_KEY, "[]", Duration::from_secs(60)).unwrap();
        cache.remove(CACHE_KEY).unwrap();
        assert_eq!(cache.get(CACHE_KEY).unwrap(), None);

        // Removing a missing key is fine
        cache.remove("missing").unwrap();
    }
}
