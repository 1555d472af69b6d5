//! Load-or-compute store on top of a [`CacheBucket`].
//!
//! [`CacheStore`] is the only cache API the mirror engine uses. It adds three
//! things to a raw bucket:
//!
//! - a configured TTL applied to every stored entry,
//! - typed JSON access for structured values (sitemap, rendered pages),
//! - single-flight computation: concurrent callers asking for the same missing
//!   key compute it once, the others block until the value is stored.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::CacheBucket;

/// Keyed cache with load-or-compute semantics.
pub struct CacheStore {
    bucket: Box<dyn CacheBucket>,
    ttl: Option<Duration>,
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CacheStore {
    /// Wrap a bucket. `ttl` applies to every entry stored through this store.
    #[must_use]
    pub fn new(bucket: Box<dyn CacheBucket>, ttl: Option<Duration>) -> Self {
        Self {
            bucket,
            ttl,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Raw lookup without computing.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.bucket.get(key)
    }

    /// Return the cached bytes for `key`, or compute, store and return them.
    ///
    /// A failed computation stores nothing and returns the error.
    pub fn load_or_compute<E>(
        &self,
        key: &str,
        compute: impl FnOnce() -> Result<Vec<u8>, E>,
    ) -> Result<Vec<u8>, E> {
        self.load_or_compute_with(
            key,
            |bytes| Some(bytes.to_vec()),
            || compute().map(|bytes| (bytes.clone(), bytes)),
        )
    }

    /// Typed variant of [`load_or_compute`](Self::load_or_compute) storing
    /// values as JSON.
    ///
    /// An entry that no longer deserializes into `T` is treated as a miss and
    /// recomputed.
    pub fn load_or_compute_json<T, E>(
        &self,
        key: &str,
        compute: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<serde_json::Error>,
    {
        self.load_or_compute_with(
            key,
            |bytes| serde_json::from_slice(bytes).ok(),
            || {
                let value = compute()?;
                let bytes = serde_json::to_vec(&value)?;
                Ok((value, bytes))
            },
        )
    }

    /// Evict a single entry.
    pub fn remove(&self, key: &str) {
        tracing::debug!(key, "cache remove");
        self.bucket.remove(key);
    }

    /// Evict every entry of this store's namespace.
    pub fn clean_all(&self) {
        tracing::debug!("cache clean");
        self.bucket.clear();
    }

    fn load_or_compute_with<T, E>(
        &self,
        key: &str,
        decode: impl Fn(&[u8]) -> Option<T>,
        compute: impl FnOnce() -> Result<(T, Vec<u8>), E>,
    ) -> Result<T, E> {
        if let Some(value) = self.bucket.get(key).and_then(|bytes| decode(&bytes)) {
            tracing::debug!(key, "cache hit");
            return Ok(value);
        }

        let lock = self.key_lock(key);
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            // Another caller may have stored the value while we waited
            match self.bucket.get(key).and_then(|bytes| decode(&bytes)) {
                Some(value) => {
                    tracing::debug!(key, "cache hit after wait");
                    Ok(value)
                }
                None => {
                    tracing::debug!(key, "cache miss");
                    compute().map(|(value, bytes)| {
                        self.bucket.set(key, &bytes, self.ttl);
                        value
                    })
                }
            }
        };
        self.release_key_lock(key, lock);
        result
    }

    fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(in_flight.entry(key.to_owned()).or_default())
    }

    /// Drop this caller's handle, removing the map entry when nobody else holds one.
    ///
    /// Handles are cloned and dropped only while the map is locked, so the last
    /// caller always observes a count of two (the map and itself).
    fn release_key_lock(&self, key: &str, lock: Arc<Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if Arc::strong_count(&lock) == 2 {
            in_flight.remove(key);
        }
        drop(lock);
    }
}
