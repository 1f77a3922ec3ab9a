//! Read-through helper shared by the catalog services.
//!
//! Lookups never fail: backend errors, timeouts and undecodable payloads
//! all count as misses. Populating is best effort and may run after the
//! caller has already returned.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, warn};

use super::codec::{self, CachedValue, FromCached};
use super::config::CacheConfig;
use super::keys::CacheKey;
use super::store::{CacheError, CacheStore};

pub(crate) const METRIC_CACHE_HITS: &str = "menu_cache_hits_total";
pub(crate) const METRIC_CACHE_MISSES: &str = "menu_cache_misses_total";

#[derive(Clone)]
pub struct CacheAside {
    store: Option<Arc<dyn CacheStore>>,
    background_populate: bool,
}

impl CacheAside {
    pub fn new(store: Arc<dyn CacheStore>, config: &CacheConfig) -> Self {
        Self {
            store: config.is_enabled().then_some(store),
            background_populate: config.background_populate,
        }
    }

    /// Helper that bypasses the cache entirely.
    pub fn disabled() -> Self {
        Self {
            store: None,
            background_populate: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub async fn lookup<T: FromCached>(&self, key: &CacheKey) -> Option<T> {
        let store = self.store.as_ref()?;
        let rendered = key.render();

        let bytes = match store.get(&rendered).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                counter!(METRIC_CACHE_MISSES, "kind" => key.kind()).increment(1);
                return None;
            }
            Err(err) => {
                warn!(key = %rendered, error = %err, "Cache read failed; using store of record");
                counter!(METRIC_CACHE_MISSES, "kind" => key.kind()).increment(1);
                return None;
            }
        };

        let decoded = codec::decode(&bytes)
            .ok()
            .and_then(|value| T::from_cached(value));
        match decoded {
            Some(value) => {
                counter!(METRIC_CACHE_HITS, "kind" => key.kind()).increment(1);
                Some(value)
            }
            None => {
                warn!(key = %rendered, "Cached payload unreadable; treating as miss");
                counter!(METRIC_CACHE_MISSES, "kind" => key.kind()).increment(1);
                None
            }
        }
    }

    /// Store a freshly fetched value, inline or in a spawned task.
    pub async fn populate(&self, key: &CacheKey, value: CachedValue) {
        let Some(store) = &self.store else {
            return;
        };
        let rendered = key.render();
        let bytes = match codec::encode(&value) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(key = %rendered, error = %err, "Cache populate skipped");
                return;
            }
        };

        if self.background_populate {
            let store = Arc::clone(store);
            tokio::spawn(async move {
                if let Err(err) = store.set(&rendered, bytes).await {
                    warn!(key = %rendered, error = %err, "Background cache populate failed");
                }
            });
        } else if let Err(err) = store.set(&rendered, bytes).await {
            warn!(key = %rendered, error = %err, "Cache populate failed");
        } else {
            debug!(key = %rendered, kind = value.kind(), "Cache populated");
        }
    }

    /// Write a value whose only home is the cache; errors are surfaced.
    pub async fn put(&self, key: &CacheKey, value: &CachedValue) -> Result<(), CacheError> {
        let store = self.require()?;
        store.set(&key.render(), codec::encode(value)?).await
    }

    /// Remove keys whose only home is the cache; errors are surfaced.
    pub async fn remove(&self, keys: &[CacheKey]) -> Result<usize, CacheError> {
        let store = self.require()?;
        let rendered: Vec<String> = keys.iter().map(CacheKey::render).collect();
        store.delete(&rendered).await
    }

    fn require(&self) -> Result<&Arc<dyn CacheStore>, CacheError> {
        self.store
            .as_ref()
            .ok_or_else(|| CacheError::Unavailable("cache is disabled".to_string()))
    }
}
