//! Cache abstraction layer for wpmirror.
//!
//! This crate provides generic caching traits that decouple the mirror engine
//! from the underlying storage mechanism. Two traits form the storage API:
//!
//! - [`Cache`]: Factory for named cache buckets (one per route binding)
//! - [`CacheBucket`]: Key-value store with optional per-entry expiry
//!
//! On top of a bucket, [`CacheStore`] provides the load-or-compute contract
//! used by the engine, with single-flight computation per key.
//!
//! # Implementations
//!
//! - [`MemoryCache`]: Process-resident implementation
//! - [`FileCache`]: File-based implementation with version validation
//!
//! # Example
//!
//! ```
//! use wpmirror_cache::{Cache, CacheStore, MemoryCache};
//!
//! let cache = MemoryCache::new();
//! let store = CacheStore::new(cache.bucket("indicators"), None);
//!
//! let value: Result<Vec<u8>, std::convert::Infallible> =
//!     store.load_or_compute("content-/logo.png", || Ok(b"png".to_vec()));
//! assert_eq!(value.unwrap(), b"png");
//! assert!(store.get("content-/logo.png").is_some());
//! ```

mod file;
mod memory;
mod store;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub use file::FileCache;
pub use memory::MemoryCache;
pub use store::CacheStore;

/// A named partition within a [`Cache`].
///
/// Each bucket stores key-value pairs. An entry may carry an expiry; expired
/// entries behave exactly like missing ones.
pub trait CacheBucket: Send + Sync {
    /// Retrieve a cached value.
    ///
    /// Returns `None` on cache miss or when the entry has expired.
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Store a value in the cache.
    ///
    /// Overwrites any existing entry for the same key. Readers observe either
    /// the previous value or the new one, never a partial write.
    ///
    /// # Arguments
    ///
    /// * `key` - Cache key (e.g., `page-42`)
    /// * `value` - Raw bytes to cache
    /// * `ttl` - Lifetime of the entry (`None` never expires)
    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>);

    /// Remove a single entry. Missing keys are ignored.
    fn remove(&self, key: &str);

    /// Remove every entry of this bucket.
    fn clear(&self);
}

/// Factory for named cache [`CacheBucket`]s.
///
/// A `Cache` produces buckets that are logically isolated from each other.
/// The file-based cache stores each bucket in a separate subdirectory.
pub trait Cache: Send + Sync {
    /// Open or create a named bucket.
    ///
    /// Calling `bucket` multiple times with the same name returns handles that
    /// share the same underlying storage.
    ///
    /// # Arguments
    ///
    /// * `name` - Bucket name (the route segment of a binding)
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket>;
}

/// Absolute expiry (Unix seconds) for an entry stored now. `0` means never.
pub(crate) fn expiry_from_ttl(ttl: Option<Duration>) -> u64 {
    match ttl {
        Some(ttl) => unix_now().saturating_add(ttl.as_secs()).max(1),
        None => 0,
    }
}

/// Whether an entry with the given absolute expiry is no longer valid.
pub(crate) fn is_expired(expires_at: u64) -> bool {
    expires_at != 0 && expires_at <= unix_now()
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_never_for_missing_ttl() {
        assert_eq!(expiry_from_ttl(None), 0);
        assert!(!is_expired(0));
    }

    #[test]
    fn test_expiry_in_future_is_valid() {
        let expires_at = expiry_from_ttl(Some(Duration::from_secs(3600)));
        assert!(expires_at > unix_now());
        assert!(!is_expired(expires_at));
    }

    #[test]
    fn test_expiry_in_past_is_expired() {
        assert!(is_expired(1));
        assert!(is_expired(unix_now()));
    }
}
