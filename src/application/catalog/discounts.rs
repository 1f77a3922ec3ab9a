//! Dish discounts.
//!
//! A discount lives only in the cache under `{dish_id}/discount`. Cached dish
//! payloads keep the list price; the discount is applied on every read, so
//! changing it needs no fan-out. The memory backend keeps discount keys out
//! of LRU eviction; a Redis backend must run without an eviction policy
//! (`maxmemory-policy noeviction`). A flush drops every discount, and
//! creating a dish clears any discount left under its id.

use futures::future::join_all;

use crate::cache::{CacheAside, CacheKey, CachedValue};
use crate::domain::entities::DishRecord;
use crate::domain::types::{Discount, DishId};

use super::error::CatalogError;

#[derive(Clone)]
pub struct Discounts {
    cache: CacheAside,
}

impl Discounts {
    pub fn new(cache: CacheAside) -> Self {
        Self { cache }
    }

    /// Current discount, or `None` when unset or the cache is unreachable.
    pub async fn lookup(&self, dish_id: &DishId) -> Option<Discount> {
        self.cache
            .lookup::<Discount>(&CacheKey::Discount(dish_id.clone()))
            .await
            .filter(|discount| !discount.is_zero())
    }

    pub async fn apply(&self, dish: &mut DishRecord) {
        if let Some(discount) = self.lookup(&dish.id).await {
            dish.price = dish.price.discounted(discount);
        }
    }

    /// Apply discounts to many dishes, looking them up concurrently.
    pub async fn apply_all<'a>(&self, dishes: impl IntoIterator<Item = &'a mut DishRecord>) {
        if !self.cache.is_enabled() {
            return;
        }
        let mut dishes: Vec<&'a mut DishRecord> = dishes.into_iter().collect();
        let found = join_all(dishes.iter().map(|dish| self.lookup(&dish.id))).await;
        for (dish, discount) in dishes.iter_mut().zip(found) {
            if let Some(discount) = discount {
                dish.price = dish.price.discounted(discount);
            }
        }
    }

    pub async fn set(&self, dish_id: &DishId, discount: Discount) -> Result<(), CatalogError> {
        self.cache
            .put(
                &CacheKey::Discount(dish_id.clone()),
                &CachedValue::Discount(discount),
            )
            .await
            .map_err(CatalogError::DiscountUnavailable)
    }

    pub async fn clear(&self, dish_id: &DishId) -> Result<(), CatalogError> {
        self.cache
            .remove(&[CacheKey::Discount(dish_id.clone())])
            .await
            .map(|_| ())
            .map_err(CatalogError::DiscountUnavailable)
    }
}
