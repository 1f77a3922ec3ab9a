//! Applies queued invalidations to the cache store.
//!
//! A failed batch is put back on the queue with its attempt counter bumped;
//! events that reach `max_attempts` go to the dead-letter log instead.
//!
//! Batches are consumed one at a time. A writer that finds the queue empty
//! after waiting its turn knows its own event has been applied or parked.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::config::CacheConfig;
use super::dead_letter::DeadLetterLog;
use super::events::{InvalidationEvent, InvalidationQueue};
use super::planner::InvalidationPlan;
use super::store::{CacheError, CacheStore};

pub(crate) const METRIC_CACHE_CONSUME_MS: &str = "menu_cache_consume_ms";
pub(crate) const METRIC_INVALIDATION_RETRIES: &str = "menu_cache_invalidation_retries_total";
pub(crate) const METRIC_KEYS_INVALIDATED: &str = "menu_cache_keys_invalidated_total";

pub struct InvalidationConsumer {
    config: CacheConfig,
    store: Arc<dyn CacheStore>,
    queue: Arc<InvalidationQueue>,
    dead_letters: Arc<DeadLetterLog>,
    /// Held from drain until the batch is applied or requeued.
    batch: Mutex<()>,
}

impl InvalidationConsumer {
    pub fn new(
        config: CacheConfig,
        store: Arc<dyn CacheStore>,
        queue: Arc<InvalidationQueue>,
        dead_letters: Arc<DeadLetterLog>,
    ) -> Self {
        Self {
            config,
            store,
            queue,
            dead_letters,
            batch: Mutex::new(()),
        }
    }

    /// Consume one batch of pending events.
    ///
    /// Returns true if any events were processed, whether or not the
    /// backend accepted them.
    #[instrument(skip(self))]
    pub async fn consume(&self) -> bool {
        let _batch = self.batch.lock().await;
        let started_at = Instant::now();
        let events = self.queue.drain(self.config.consume_batch_limit);
        if events.is_empty() {
            return false;
        }

        let event_count = events.len();
        let event_ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();
        let plan = InvalidationPlan::from_events(&events);

        info!(
            event_count,
            event_ids = ?event_ids,
            plan = %plan,
            "Invalidation consumption starting"
        );

        let outcome = match self.apply(&plan).await {
            Ok(removed) => {
                info!(event_count, removed, "Invalidation consumption complete");
                counter!(METRIC_KEYS_INVALIDATED).increment(removed as u64);
                "applied"
            }
            Err(err) => {
                self.handle_failure(events, &err);
                "failed"
            }
        };

        histogram!(METRIC_CACHE_CONSUME_MS, "outcome" => outcome)
            .record(started_at.elapsed().as_secs_f64() * 1000.0);

        true
    }

    /// Keep consuming until the queue is empty or a batch fails.
    ///
    /// Also waits out a batch another task has already drained, so events
    /// published before the call are settled when it returns.
    pub async fn consume_pending(&self) {
        loop {
            let before = self.queue.len();
            if !self.consume().await || self.queue.len() >= before {
                break;
            }
        }
    }

    /// Execute a plan against the store. Returns the number of removed entries.
    pub async fn apply(&self, plan: &InvalidationPlan) -> Result<usize, CacheError> {
        if plan.flush {
            self.store.flush().await?;
            info!("Cache flushed");
            return Ok(0);
        }

        let mut removed = self.store.delete(&plan.exact_keys()).await?;
        for prefix in &plan.prefixes {
            removed += self.store.delete_prefix(&prefix.render()).await?;
        }
        Ok(removed)
    }

    fn handle_failure(&self, events: Vec<InvalidationEvent>, err: &CacheError) {
        let max_attempts = self.config.max_attempts_non_zero();
        let mut retry = Vec::with_capacity(events.len());
        for mut event in events {
            event.attempts += 1;
            if event.attempts >= max_attempts {
                self.dead_letters.record(event, err.to_string());
            } else {
                retry.push(event);
            }
        }

        warn!(
            error = %err,
            retrying = retry.len(),
            "Invalidation batch failed"
        );
        counter!(METRIC_INVALIDATION_RETRIES).increment(retry.len() as u64);
        self.queue.requeue(retry);
    }

    /// Move every dead letter back onto the queue with a fresh attempt budget.
    pub fn redrive_dead_letters(&self) -> usize {
        let letters = self.dead_letters.take_all();
        let count = letters.len();
        if count > 0 {
            info!(count, "Redriving dead-lettered invalidations");
            self.queue.requeue(
                letters
                    .into_iter()
                    .map(|letter| InvalidationEvent {
                        attempts: 0,
                        ..letter.event
                    })
                    .collect(),
            );
        }
        count
    }

    pub fn queue(&self) -> &Arc<InvalidationQueue> {
        &self.queue
    }

    pub fn dead_letters(&self) -> &Arc<DeadLetterLog> {
        &self.dead_letters
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;

    use super::*;
    use crate::cache::events::{Mutation, MutationKind};
    use crate::cache::store::MemoryCacheStore;
    use crate::domain::types::{MenuId, SubmenuId};

    /// Memory store whose writes fail while `down` is set.
    struct FlakyStore {
        inner: MemoryCacheStore,
        down: AtomicBool,
    }

    impl FlakyStore {
        fn check(&self) -> Result<(), CacheError> {
            if self.down.load(Ordering::SeqCst) {
                Err(CacheError::Unavailable("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl CacheStore for FlakyStore {
        async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: Bytes) -> Result<(), CacheError> {
            self.inner.set(key, value).await
        }

        async fn delete(&self, keys: &[String]) -> Result<usize, CacheError> {
            self.check()?;
            self.inner.delete(keys).await
        }

        async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError> {
            self.check()?;
            self.inner.delete_prefix(prefix).await
        }

        async fn flush(&self) -> Result<(), CacheError> {
            self.check()?;
            self.inner.flush().await
        }
    }

    fn flaky() -> Arc<FlakyStore> {
        Arc::new(FlakyStore {
            inner: MemoryCacheStore::new(std::num::NonZeroUsize::new(64).expect("capacity")),
            down: AtomicBool::new(false),
        })
    }

    fn consumer_with(store: Arc<dyn CacheStore>, config: CacheConfig) -> InvalidationConsumer {
        let queue = Arc::new(InvalidationQueue::new(config.queue_limit));
        let dead_letters = Arc::new(DeadLetterLog::new(config.dead_letter_capacity));
        InvalidationConsumer::new(config, store, queue, dead_letters)
    }

    fn submenu_delete() -> Mutation {
        Mutation::Submenu {
            kind: MutationKind::Delete,
            menu_id: MenuId::from("m1"),
            submenu_id: SubmenuId::from("s1"),
        }
    }

    async fn seed(store: &dyn CacheStore, keys: &[&str]) {
        for key in keys {
            store.set(key, Bytes::from_static(b"{}")).await.expect("seed");
        }
    }

    #[tokio::test]
    async fn consume_empty_queue_returns_false() {
        let consumer = consumer_with(flaky(), CacheConfig::default());
        assert!(!consumer.consume().await);
    }

    #[tokio::test]
    async fn consume_applies_keys_and_namespaces() {
        let store = flaky();
        seed(
            store.as_ref(),
            &[
                "m1",
                "m1/s1",
                "m1/s1/d1",
                "m1/s1/dishes",
                "m1/submenus",
                "m1/s2",
                "all_menus",
                "all_menus_whole",
                "m10/s1",
            ],
        )
        .await;
        let consumer = consumer_with(store.clone(), CacheConfig::default());

        consumer.queue().publish(submenu_delete());
        assert!(consumer.consume().await);

        let remaining: std::collections::BTreeSet<String> =
            store.inner.keys().into_iter().collect();
        let expected: std::collections::BTreeSet<String> =
            ["m1/s2", "m10/s1"].iter().map(|k| k.to_string()).collect();
        assert_eq!(remaining, expected);
        assert!(consumer.queue().is_empty());
    }

    #[tokio::test]
    async fn consume_respects_batch_limit() {
        let config = CacheConfig {
            consume_batch_limit: 2,
            ..Default::default()
        };
        let consumer = consumer_with(flaky(), config);
        for _ in 0..5 {
            consumer.queue().publish(submenu_delete());
        }

        consumer.consume().await;
        assert_eq!(consumer.queue().len(), 3);

        consumer.consume_pending().await;
        assert!(consumer.queue().is_empty());
    }

    #[tokio::test]
    async fn failures_retry_then_dead_letter() {
        let store = flaky();
        store.down.store(true, Ordering::SeqCst);
        let config = CacheConfig {
            max_attempts: 2,
            ..Default::default()
        };
        let consumer = consumer_with(store.clone(), config);

        consumer.queue().publish(submenu_delete());

        assert!(consumer.consume().await);
        assert_eq!(consumer.queue().len(), 1);
        assert!(consumer.dead_letters().is_empty());

        assert!(consumer.consume().await);
        assert!(consumer.queue().is_empty());
        assert_eq!(consumer.dead_letters().len(), 1);

        store.down.store(false, Ordering::SeqCst);
        seed(store.as_ref(), &["m1/s1/d1"]).await;
        assert_eq!(consumer.redrive_dead_letters(), 1);
        assert!(consumer.consume().await);
        assert!(!store.inner.contains("m1/s1/d1"));
        assert!(consumer.dead_letters().is_empty());
    }

    #[tokio::test]
    async fn applying_the_same_plan_twice_is_harmless() {
        let store = flaky();
        seed(store.as_ref(), &["m1", "m1/s1", "all_menus"]).await;
        let consumer = consumer_with(store.clone(), CacheConfig::default());
        let plan = InvalidationPlan::for_mutation(&submenu_delete());

        let first = consumer.apply(&plan).await.expect("first apply");
        let second = consumer.apply(&plan).await.expect("second apply");
        assert_eq!(first, 3);
        assert_eq!(second, 0);
        assert!(store.inner.is_empty());
    }

    /// Memory store whose deletes park until released.
    struct GatedStore {
        inner: MemoryCacheStore,
        entered: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    #[async_trait]
    impl CacheStore for GatedStore {
        async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: Bytes) -> Result<(), CacheError> {
            self.inner.set(key, value).await
        }

        async fn delete(&self, keys: &[String]) -> Result<usize, CacheError> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.delete(keys).await
        }

        async fn delete_prefix(&self, prefix: &str) -> Result<usize, CacheError> {
            self.inner.delete_prefix(prefix).await
        }

        async fn flush(&self) -> Result<(), CacheError> {
            self.inner.flush().await
        }
    }

    #[tokio::test]
    async fn consume_pending_waits_for_a_batch_drained_elsewhere() {
        let store = Arc::new(GatedStore {
            inner: MemoryCacheStore::new(std::num::NonZeroUsize::new(8).expect("capacity")),
            entered: tokio::sync::Notify::new(),
            release: tokio::sync::Notify::new(),
        });
        seed(store.as_ref(), &["m1/s1"]).await;
        let consumer = Arc::new(consumer_with(store.clone(), CacheConfig::default()));
        consumer.queue().publish(submenu_delete());

        // Another task drains the event and stalls inside the delete.
        let background = tokio::spawn({
            let consumer = consumer.clone();
            async move { consumer.consume().await }
        });
        store.entered.notified().await;
        assert!(consumer.queue().is_empty());

        let writer = tokio::spawn({
            let consumer = consumer.clone();
            async move { consumer.consume_pending().await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!writer.is_finished());

        store.release.notify_one();
        writer.await.expect("writer task");
        assert!(!store.inner.contains("m1/s1"));
        assert!(background.await.expect("background task"));
    }

    #[tokio::test]
    async fn flush_clears_store() {
        let store = flaky();
        seed(store.as_ref(), &["m1", "x/discount"]).await;
        let consumer = consumer_with(store.clone(), CacheConfig::default());

        consumer.queue().publish(Mutation::Flush);
        consumer.consume().await;
        assert!(store.inner.is_empty());
    }
}
