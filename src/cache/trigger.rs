//! Cache trigger service.
//!
//! Write paths call into this after the store commit. Events are always
//! published to the queue; with inline invalidation enabled the consumer
//! runs before the write returns, otherwise the background loop picks them
//! up.

use std::sync::Arc;

use tracing::debug;

use crate::domain::types::{DishId, MenuId, SubmenuId};

use super::config::CacheConfig;
use super::consumer::InvalidationConsumer;
use super::events::{InvalidationQueue, Mutation, MutationKind};

pub struct CacheTrigger {
    config: CacheConfig,
    queue: Arc<InvalidationQueue>,
    consumer: Arc<InvalidationConsumer>,
}

impl CacheTrigger {
    pub fn new(
        config: CacheConfig,
        queue: Arc<InvalidationQueue>,
        consumer: Arc<InvalidationConsumer>,
    ) -> Self {
        Self {
            config,
            queue,
            consumer,
        }
    }

    /// Publish a mutation and optionally consume immediately.
    pub async fn trigger(&self, mutation: Mutation, consume_now: bool) {
        if !self.config.is_enabled() {
            debug!(mutation = ?mutation, "Cache trigger skipped: cache disabled");
            return;
        }

        self.queue.publish(mutation);

        if consume_now {
            self.consumer.consume_pending().await;
        }
    }

    pub async fn menu_changed(&self, kind: MutationKind, menu_id: &MenuId) {
        self.trigger(
            Mutation::Menu {
                kind,
                menu_id: menu_id.clone(),
            },
            self.config.invalidate_inline,
        )
        .await;
    }

    pub async fn submenu_changed(
        &self,
        kind: MutationKind,
        menu_id: &MenuId,
        submenu_id: &SubmenuId,
    ) {
        self.trigger(
            Mutation::Submenu {
                kind,
                menu_id: menu_id.clone(),
                submenu_id: submenu_id.clone(),
            },
            self.config.invalidate_inline,
        )
        .await;
    }

    pub async fn dish_changed(
        &self,
        kind: MutationKind,
        menu_id: &MenuId,
        submenu_id: &SubmenuId,
        dish_id: &DishId,
    ) {
        self.trigger(
            Mutation::Dish {
                kind,
                menu_id: menu_id.clone(),
                submenu_id: submenu_id.clone(),
                dish_id: dish_id.clone(),
            },
            self.config.invalidate_inline,
        )
        .await;
    }

    /// Drop the whole cache, always inline.
    pub async fn flush(&self) {
        self.trigger(Mutation::Flush, true).await;
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<InvalidationQueue> {
        &self.queue
    }

    pub fn consumer(&self) -> &Arc<InvalidationConsumer> {
        &self.consumer
    }
}
