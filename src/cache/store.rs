//! Cache store adapter.
//!
//! A byte-oriented key/value abstraction with exact and prefix deletion.
//! The in-process backend is a bounded LRU; see `redis_store.rs` for the
//! network backend. `BoundedCacheStore` wraps either one with the operation
//! timeout.

use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use thiserror::Error;
use tracing::debug;

use super::keys::{DISCOUNT_SUFFIX, SEPARATOR};
use super::lock::mutex_lock;

const SOURCE: &str = "cache::store";

pub(crate) const METRIC_CACHE_EVICTIONS: &str = "menu_cache_evictions_total";
pub(crate) const METRIC_CACHE_BACKEND_ERRORS: &str = "menu_cache_backend_errors_total";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache operation `{op}` timed out")]
    Timeout { op: &'static str },
    #[error("cache payload could not be encoded or decoded: {0}")]
    Codec(String),
}

impl CacheError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::Unavailable(err.to_string())
    }

    /// Label used on the backend error counter.
    pub fn kind(&self) -> &'static str {
        match self {
            CacheError::Unavailable(_) => "unavailable",
            CacheError::Timeout { .. } => "timeout",
            CacheError::Codec(_) => "codec",
        }
    }
}

/// Key/value byte store used as the caching backend.
///
/// Deleting an absent key is a no-op. `delete_prefix` must be safe to run
/// concurrently with unrelated operations but is not atomic with them.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;

    async fn set(&self, key: &str, value: Bytes) -> Result<(), CacheError>;

    /// Returns the number of keys that existed and were removed.
    async fn delete(&self, keys: &[String]) -> Result<usize, CacheError>;

    /// Removes every key starting with `prefix`; returns how many were removed.
    async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError>;

    async fn flush(&self) -> Result<(), CacheError>;
}

/// In-process LRU backend.
///
/// Discount values have no other home, so `{dish_id}/discount` keys live in
/// a separate map outside the eviction pool. Only deletes and flushes
/// remove them.
pub struct MemoryCacheStore {
    entries: Mutex<LruCache<String, Bytes>>,
    pinned: Mutex<HashMap<String, Bytes>>,
}

fn is_pinned(key: &str) -> bool {
    key.strip_suffix(DISCOUNT_SUFFIX)
        .and_then(|rest| rest.strip_suffix(SEPARATOR))
        .is_some_and(|dish_id| !dish_id.is_empty() && !dish_id.contains(SEPARATOR))
}

impl MemoryCacheStore {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            pinned: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.entries, SOURCE, "len").len()
            + mutex_lock(&self.pinned, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the stored keys: LRU entries most recently used first,
    /// then pinned entries.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = mutex_lock(&self.entries, SOURCE, "keys")
            .iter()
            .map(|(key, _)| key.clone())
            .collect();
        keys.extend(mutex_lock(&self.pinned, SOURCE, "keys").keys().cloned());
        keys
    }

    pub fn contains(&self, key: &str) -> bool {
        if is_pinned(key) {
            mutex_lock(&self.pinned, SOURCE, "contains").contains_key(key)
        } else {
            mutex_lock(&self.entries, SOURCE, "contains").contains(key)
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        if is_pinned(key) {
            return Ok(mutex_lock(&self.pinned, SOURCE, "get").get(key).cloned());
        }
        Ok(mutex_lock(&self.entries, SOURCE, "get").get(key).cloned())
    }

    async fn set(&self, key: &str, value: Bytes) -> Result<(), CacheError> {
        if is_pinned(key) {
            mutex_lock(&self.pinned, SOURCE, "set").insert(key.to_string(), value);
            return Ok(());
        }
        let evicted = mutex_lock(&self.entries, SOURCE, "set").push(key.to_string(), value);
        if let Some((evicted_key, _)) = evicted
            && evicted_key != key
        {
            debug!(key = %evicted_key, "Cache entry evicted");
            counter!(METRIC_CACHE_EVICTIONS).increment(1);
        }
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<usize, CacheError> {
        let mut entries = mutex_lock(&self.entries, SOURCE, "delete");
        let mut pinned = mutex_lock(&self.pinned, SOURCE, "delete");
        Ok(keys
            .iter()
            .filter(|key| {
                if is_pinned(key) {
                    pinned.remove(key.as_str()).is_some()
                } else {
                    entries.pop(key.as_str()).is_some()
                }
            })
            .count())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError> {
        let mut entries = mutex_lock(&self.entries, SOURCE, "delete_prefix");
        let matching: Vec<String> = entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &matching {
            entries.pop(key.as_str());
        }

        let mut pinned = mutex_lock(&self.pinned, SOURCE, "delete_prefix");
        let before = pinned.len();
        pinned.retain(|key, _| !key.starts_with(prefix));
        Ok(matching.len() + before - pinned.len())
    }

    async fn flush(&self) -> Result<(), CacheError> {
        mutex_lock(&self.entries, SOURCE, "flush").clear();
        mutex_lock(&self.pinned, SOURCE, "flush").clear();
        Ok(())
    }
}

/// Applies the configured per-operation deadline to an inner store.
pub struct BoundedCacheStore {
    inner: Arc<dyn CacheStore>,
    timeout: Duration,
}

impl BoundedCacheStore {
    pub fn new(inner: Arc<dyn CacheStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = Result<T, CacheError>> + Send,
    ) -> Result<T, CacheError> {
        let result = match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout { op }),
        };
        if let Err(err) = &result {
            counter!(METRIC_CACHE_BACKEND_ERRORS, "op" => op, "kind" => err.kind()).increment(1);
        }
        result
    }
}

#[async_trait]
impl CacheStore for BoundedCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        self.bounded("get", self.inner.get(key)).await
    }

    async fn set(&self, key: &str, value: Bytes) -> Result<(), CacheError> {
        self.bounded("set", self.inner.set(key, value)).await
    }

    async fn delete(&self, keys: &[String]) -> Result<usize, CacheError> {
        if keys.is_empty() {
            return Ok(0);
        }
        self.bounded("delete", self.inner.delete(keys)).await
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError> {
        self.bounded("delete_prefix", self.inner.delete_prefix(prefix))
            .await
    }

    async fn flush(&self) -> Result<(), CacheError> {
        self.bounded("flush", self.inner.flush()).await
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    fn store(capacity: usize) -> MemoryCacheStore {
        MemoryCacheStore::new(NonZeroUsize::new(capacity).expect("non-zero capacity"))
    }

    fn keys(items: &[&str]) -> Vec<String> {
        items.iter().map(|k| (*k).to_string()).collect()
    }

    #[tokio::test]
    async fn get_set_roundtrip() {
        let store = store(8);
        assert!(store.get("m1").await.expect("get").is_none());

        store
            .set("m1", Bytes::from_static(b"payload"))
            .await
            .expect("set");
        assert_eq!(
            store.get("m1").await.expect("get"),
            Some(Bytes::from_static(b"payload"))
        );
    }

    #[tokio::test]
    async fn deleting_absent_keys_is_a_noop() {
        let store = store(8);
        store.set("a", Bytes::new()).await.expect("set");

        let removed = store.delete(&keys(&["a", "missing"])).await.expect("delete");
        assert_eq!(removed, 1);
        assert_eq!(store.delete(&keys(&["a"])).await.expect("delete"), 0);
    }

    #[tokio::test]
    async fn delete_prefix_leaves_siblings() {
        let store = store(16);
        for key in ["m1", "m1/s1", "m1/s1/d1", "m1/submenus", "m10", "m10/s1", "all_menus"] {
            store.set(key, Bytes::new()).await.expect("set");
        }

        let removed = store.delete_prefix("m1/").await.expect("delete_prefix");
        assert_eq!(removed, 3);
        assert!(store.contains("m1"));
        assert!(store.contains("m10"));
        assert!(store.contains("m10/s1"));
        assert!(store.contains("all_menus"));
    }

    #[tokio::test]
    async fn lru_evicts_least_recently_used() {
        let store = store(2);
        store.set("a", Bytes::new()).await.expect("set");
        store.set("b", Bytes::new()).await.expect("set");
        store.get("a").await.expect("get");
        store.set("c", Bytes::new()).await.expect("set");

        assert!(store.contains("a"));
        assert!(!store.contains("b"));
        assert!(store.contains("c"));
    }

    #[tokio::test]
    async fn flush_clears_everything() {
        let store = store(4);
        store.set("a", Bytes::new()).await.expect("set");
        store.set("d1/discount", Bytes::new()).await.expect("set");
        store.flush().await.expect("flush");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn discounts_are_never_evicted() {
        let store = store(2);
        store
            .set("d1/discount", Bytes::from_static(b"50"))
            .await
            .expect("set");
        for key in ["a", "b", "c", "d"] {
            store.set(key, Bytes::new()).await.expect("set");
        }

        assert_eq!(
            store.get("d1/discount").await.expect("get"),
            Some(Bytes::from_static(b"50"))
        );
        assert_eq!(store.len(), 3);

        let removed = store
            .delete(&keys(&["d1/discount", "d"]))
            .await
            .expect("delete");
        assert_eq!(removed, 2);
        assert!(!store.contains("d1/discount"));
    }

    #[test]
    fn only_dish_discount_keys_are_pinned() {
        assert!(is_pinned("d1/discount"));
        assert!(!is_pinned("m1/s1/d1"));
        assert!(!is_pinned("m1/discount/x"));
        assert!(!is_pinned("m1/s1/discount"));
        assert!(!is_pinned("/discount"));
    }

    #[tokio::test]
    async fn memory_store_recovers_from_poisoned_lock() {
        let store = store(4);
        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store.entries.lock().expect("lock should be acquired");
            panic!("poison cache lock");
        }));

        store.set("a", Bytes::new()).await.expect("set");
        assert_eq!(store.len(), 1);
    }

    struct StalledStore;

    #[async_trait]
    impl CacheStore for StalledStore {
        async fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheError> {
            std::future::pending().await
        }

        async fn set(&self, _key: &str, _value: Bytes) -> Result<(), CacheError> {
            std::future::pending().await
        }

        async fn delete(&self, _keys: &[String]) -> Result<usize, CacheError> {
            std::future::pending().await
        }

        async fn delete_prefix(&self, _prefix: &str) -> Result<usize, CacheError> {
            std::future::pending().await
        }

        async fn flush(&self) -> Result<(), CacheError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn bounded_store_turns_stalls_into_timeouts() {
        let store = BoundedCacheStore::new(Arc::new(StalledStore), Duration::from_millis(10));

        assert!(matches!(
            store.get("m1").await,
            Err(CacheError::Timeout { op: "get" })
        ));
        assert!(matches!(
            store.delete_prefix("m1/").await,
            Err(CacheError::Timeout { op: "delete_prefix" })
        ));
        assert_eq!(store.delete(&[]).await.expect("empty delete"), 0);
    }
}
