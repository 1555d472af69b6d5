//! In-memory cache implementation.
//!
//! Used when no cache directory is configured. Entries live for the lifetime
//! of the process; buckets with the same name share storage.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use crate::{Cache, CacheBucket, expiry_from_ttl, is_expired};

type Entries = Arc<RwLock<HashMap<String, MemoryEntry>>>;

struct MemoryEntry {
    expires_at: u64,
    data: Arc<[u8]>,
}

/// Process-resident [`Cache`].
#[derive(Default)]
pub struct MemoryCache {
    buckets: Mutex<HashMap<String, Entries>>,
}

impl MemoryCache {
    /// Create an empty in-memory cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cache for MemoryCache {
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket> {
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        let entries = buckets.entry(name.to_owned()).or_default();
        Box::new(MemoryCacheBucket {
            entries: Arc::clone(entries),
        })
    }
}

struct MemoryCacheBucket {
    entries: Entries,
}

impl CacheBucket for MemoryCacheBucket {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(key)?;
        if is_expired(entry.expires_at) {
            return None;
        }
        Some(entry.data.to_vec())
    }

    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) {
        let entry = MemoryEntry {
            expires_at: expiry_from_ttl(ttl),
            data: Arc::from(value),
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), entry);
    }

    fn remove(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_bucket_set_and_get() {
        let cache = MemoryCache::new();
        let bucket = cache.bucket("indicators");

        bucket.set("page-7", b"<div></div>", None);
        assert_eq!(bucket.get("page-7"), Some(b"<div></div>".to_vec()));
    }

    #[test]
    fn test_memory_buckets_with_same_name_share_entries() {
        let cache = MemoryCache::new();
        let first = cache.bucket("indicators");
        let second = cache.bucket("indicators");

        first.set("sitemap", b"shared", None);
        assert_eq!(second.get("sitemap"), Some(b"shared".to_vec()));
    }

    #[test]
    fn test_memory_buckets_are_isolated() {
        let cache = MemoryCache::new();
        let indicators = cache.bucket("indicators");
        let publications = cache.bucket("publications");

        indicators.set("sitemap", b"a", None);
        assert_eq!(publications.get("sitemap"), None);

        publications.set("sitemap", b"b", None);
        indicators.clear();
        assert_eq!(indicators.get("sitemap"), None);
        assert_eq!(publications.get("sitemap"), Some(b"b".to_vec()));
    }

    #[test]
    fn test_memory_bucket_remove_and_expiry() {
        let cache = MemoryCache::new();
        let bucket = cache.bucket("indicators");

        bucket.set("page-1", b"one", None);
        bucket.set("page-2", b"two", Some(Duration::ZERO));
        assert_eq!(bucket.get("page-2"), None);

        bucket.remove("page-1");
        assert_eq!(bucket.get("page-1"), None);
    }
}
