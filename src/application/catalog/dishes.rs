use std::sync::Arc;

use crate::application::repos::{CreateDishParams, DishesRepo, DishesWriteRepo, UpdateDishParams};
use crate::cache::{CacheAside, CacheKey, CacheTrigger, FromCached, MutationKind};
use crate::domain::entities::DishRecord;
use crate::domain::error::EntityLevel;
use crate::domain::types::{Discount, DishId, MenuId, Price, SubmenuId};

use super::ancestry::Ancestry;
use super::discounts::Discounts;
use super::ensure_valid_id;
use super::error::CatalogError;

#[derive(Debug, Clone)]
pub struct CreateDishCommand {
    pub id: Option<DishId>,
    pub title: String,
    pub description: String,
    pub price: Price,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateDishCommand {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Price>,
}

#[derive(Clone)]
pub struct DishService {
    ancestry: Ancestry,
    reader: Arc<dyn DishesRepo>,
    writer: Arc<dyn DishesWriteRepo>,
    cache: CacheAside,
    discounts: Discounts,
    cache_trigger: Option<Arc<CacheTrigger>>,
}

impl DishService {
    pub fn new(
        ancestry: Ancestry,
        reader: Arc<dyn DishesRepo>,
        writer: Arc<dyn DishesWriteRepo>,
        cache: CacheAside,
    ) -> Self {
        Self {
            ancestry,
            reader,
            writer,
            discounts: Discounts::new(cache.clone()),
            cache,
            cache_trigger: None,
        }
    }

    pub fn with_cache_trigger(mut self, trigger: Arc<CacheTrigger>) -> Self {
        self.cache_trigger = Some(trigger);
        self
    }

    pub fn with_cache_trigger_opt(mut self, trigger: Option<Arc<CacheTrigger>>) -> Self {
        self.cache_trigger = trigger;
        self
    }

    /// Dish with its discount applied to the price.
    pub async fn get(
        &self,
        menu_id: &MenuId,
        submenu_id: &SubmenuId,
        dish_id: &DishId,
    ) -> Result<DishRecord, CatalogError> {
        let mut dish = self.load(menu_id, submenu_id, dish_id).await?;
        self.discounts.apply(&mut dish).await;
        Ok(dish)
    }

    async fn load(
        &self,
        menu_id: &MenuId,
        submenu_id: &SubmenuId,
        dish_id: &DishId,
    ) -> Result<DishRecord, CatalogError> {
        let key = CacheKey::Dish(menu_id.clone(), submenu_id.clone(), dish_id.clone());
        if let Some(hit) = self.cache.lookup::<DishRecord>(&key).await {
            return Ok(hit);
        }

        let dish = self.ancestry.dish(menu_id, submenu_id, dish_id).await?;
        self.cache.populate(&key, dish.clone().into_cached()).await;
        Ok(dish)
    }

    pub async fn list(
        &self,
        menu_id: &MenuId,
        submenu_id: &SubmenuId,
    ) -> Result<Vec<DishRecord>, CatalogError> {
        let key = CacheKey::DishList(menu_id.clone(), submenu_id.clone());
        let mut dishes = match self.cache.lookup::<Vec<DishRecord>>(&key).await {
            Some(hit) => hit,
            None => {
                self.ancestry.submenu(menu_id, submenu_id).await?;
                let dishes = self.reader.list_dishes(submenu_id).await?;
                self.cache.populate(&key, dishes.clone().into_cached()).await;
                dishes
            }
        };
        self.discounts.apply_all(dishes.iter_mut()).await;
        Ok(dishes)
    }

    pub async fn create(
        &self,
        menu_id: &MenuId,
        submenu_id: &SubmenuId,
        command: CreateDishCommand,
    ) -> Result<DishRecord, CatalogError> {
        let id = match command.id {
            Some(id) => {
                ensure_valid_id(id.as_str(), "dish id")?;
                id
            }
            None => DishId::generate(),
        };
        self.ancestry.submenu(menu_id, submenu_id).await?;

        let record = self
            .writer
            .create_dish(CreateDishParams {
                id,
                submenu_id: submenu_id.clone(),
                title: command.title,
                description: command.description,
                price: command.price,
            })
            .await?;

        if let Some(trigger) = &self.cache_trigger {
            trigger
                .dish_changed(MutationKind::Create, menu_id, submenu_id, &record.id)
                .await;
        }

        Ok(record)
    }

    pub async fn update(
        &self,
        menu_id: &MenuId,
        submenu_id: &SubmenuId,
        dish_id: &DishId,
        command: UpdateDishCommand,
    ) -> Result<DishRecord, CatalogError> {
        let current = self.ancestry.dish(menu_id, submenu_id, dish_id).await?;

        let mut record = self
            .writer
            .update_dish(UpdateDishParams {
                id: current.id,
                submenu_id: submenu_id.clone(),
                title: command.title.unwrap_or(current.title),
                description: command.description.unwrap_or(current.description),
                price: command.price.unwrap_or(current.price),
            })
            .await?
            .ok_or_else(|| CatalogError::not_found(EntityLevel::Dish))?;

        if let Some(trigger) = &self.cache_trigger {
            trigger
                .dish_changed(MutationKind::Update, menu_id, submenu_id, &record.id)
                .await;
        }

        self.discounts.apply(&mut record).await;
        Ok(record)
    }

    pub async fn delete(
        &self,
        menu_id: &MenuId,
        submenu_id: &SubmenuId,
        dish_id: &DishId,
    ) -> Result<(), CatalogError> {
        self.ancestry.submenu(menu_id, submenu_id).await?;
        if !self.writer.delete_dish(submenu_id, dish_id).await? {
            return Err(CatalogError::not_found(EntityLevel::Dish));
        }

        if let Some(trigger) = &self.cache_trigger {
            trigger
                .dish_changed(MutationKind::Delete, menu_id, submenu_id, dish_id)
                .await;
        }
        Ok(())
    }

    /// Record a discount for an existing dish and return the discounted dish.
    pub async fn set_discount(
        &self,
        menu_id: &MenuId,
        submenu_id: &SubmenuId,
        dish_id: &DishId,
        discount: Discount,
    ) -> Result<DishRecord, CatalogError> {
        let mut dish = self.ancestry.dish(menu_id, submenu_id, dish_id).await?;
        self.discounts.set(dish_id, discount).await?;
        dish.price = dish.price.discounted(discount);
        Ok(dish)
    }

    pub async fn clear_discount(
        &self,
        menu_id: &MenuId,
        submenu_id: &SubmenuId,
        dish_id: &DishId,
    ) -> Result<DishRecord, CatalogError> {
        let dish = self.ancestry.dish(menu_id, submenu_id, dish_id).await?;
        self.discounts.clear(dish_id).await?;
        Ok(dish)
    }
}
