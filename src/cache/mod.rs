//! Cache-aside layer for the menu catalog.
//!
//! Reads go through `CacheAside`; writes publish a `Mutation` through the
//! `CacheTrigger`, whose consumer computes the fan-out with
//! `InvalidationPlan` and applies it to the `CacheStore`.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! backend = "memory"   # or "redis"
//! redis_url = "redis://127.0.0.1:6379/0"
//! operation_timeout_ms = 250
//! # ... see config.rs for all options
//! ```

mod aside;
mod codec;
pub(crate) mod config;
mod consumer;
mod dead_letter;
mod events;
mod keys;
mod lock;
mod planner;
mod redis_store;
mod store;
mod trigger;

pub use aside::CacheAside;
pub use codec::{CachedList, CachedValue, FromCached, decode, encode};
pub use config::{CacheBackend, CacheConfig};
pub use consumer::InvalidationConsumer;
pub use dead_letter::{DeadLetter, DeadLetterLog};
pub use events::{Epoch, InvalidationEvent, InvalidationQueue, Mutation, MutationKind};
pub use keys::{CacheKey, KeyPrefix, SEPARATOR};
pub use planner::InvalidationPlan;
pub use redis_store::RedisCacheStore;
pub use store::{BoundedCacheStore, CacheError, CacheStore, MemoryCacheStore};
pub use trigger::CacheTrigger;

pub(crate) mod metric_names {
    pub(crate) use super::aside::{METRIC_CACHE_HITS, METRIC_CACHE_MISSES};
    pub(crate) use super::consumer::{
        METRIC_CACHE_CONSUME_MS, METRIC_INVALIDATION_RETRIES, METRIC_KEYS_INVALIDATED,
    };
    pub(crate) use super::dead_letter::METRIC_DEAD_LETTERS;
    pub(crate) use super::events::{METRIC_QUEUE_LENGTH, METRIC_QUEUE_OVERFLOWS};
    pub(crate) use super::store::{METRIC_CACHE_BACKEND_ERRORS, METRIC_CACHE_EVICTIONS};
}
