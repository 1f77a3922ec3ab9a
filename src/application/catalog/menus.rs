use std::sync::Arc;

use tracing::debug;

use crate::application::repos::{CreateMenuParams, MenusRepo, MenusWriteRepo, UpdateMenuParams};
use crate::cache::{CacheAside, CacheKey, CacheTrigger, FromCached, MutationKind};
use crate::domain::entities::{MenuAggregate, WholeTree};
use crate::domain::error::EntityLevel;
use crate::domain::types::MenuId;

use super::discounts::Discounts;
use super::ensure_valid_id;
use super::error::CatalogError;

#[derive(Debug, Clone)]
pub struct CreateMenuCommand {
    /// Caller-chosen id; generated when absent.
    pub id: Option<MenuId>,
    pub title: String,
    pub description: String,
}

/// Partial update; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct UpdateMenuCommand {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct MenuService {
    reader: Arc<dyn MenusRepo>,
    writer: Arc<dyn MenusWriteRepo>,
    cache: CacheAside,
    discounts: Discounts,
    cache_trigger: Option<Arc<CacheTrigger>>,
}

impl MenuService {
    pub fn new(
        reader: Arc<dyn MenusRepo>,
        writer: Arc<dyn MenusWriteRepo>,
        cache: CacheAside,
    ) -> Self {
        Self {
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

    pub async fn get(&self, menu_id: &MenuId) -> Result<MenuAggregate, CatalogError> {
        let key = CacheKey::Menu(menu_id.clone());
        if let Some(hit) = self.cache.lookup::<MenuAggregate>(&key).await {
            return Ok(hit);
        }

        let aggregate = self
            .reader
            .find_menu_aggregate(menu_id)
            .await?
            .ok_or_else(|| CatalogError::not_found(EntityLevel::Menu))?;
        self.cache.populate(&key, aggregate.clone().into_cached()).await;
        Ok(aggregate)
    }

    pub async fn list(&self) -> Result<Vec<MenuAggregate>, CatalogError> {
        let key = CacheKey::AllMenus;
        if let Some(hit) = self.cache.lookup::<Vec<MenuAggregate>>(&key).await {
            return Ok(hit);
        }

        let menus = self.reader.list_menu_aggregates().await?;
        self.cache.populate(&key, menus.clone().into_cached()).await;
        Ok(menus)
    }

    /// Every menu with its submenus and dishes, discounts applied.
    pub async fn whole_tree(&self) -> Result<WholeTree, CatalogError> {
        let key = CacheKey::WholeTree;
        let mut tree = match self.cache.lookup::<WholeTree>(&key).await {
            Some(hit) => hit,
            None => {
                let tree = self.reader.load_whole_tree().await?;
                self.cache.populate(&key, tree.clone().into_cached()).await;
                tree
            }
        };
        self.discounts.apply_all(tree.dishes_mut()).await;
        Ok(tree)
    }

    /// Populate the list and tree views ahead of the first request.
    pub async fn warm(&self) -> Result<(), CatalogError> {
        let menus = self.list().await?;
        let tree = self.whole_tree().await?;
        debug!(
            menus = menus.len(),
            tree_menus = tree.menus.len(),
            "Catalog views warmed"
        );
        Ok(())
    }

    pub async fn create(&self, command: CreateMenuCommand) -> Result<MenuAggregate, CatalogError> {
        let id = match command.id {
            Some(id) => {
                ensure_valid_id(id.as_str(), "menu id")?;
                id
            }
            None => MenuId::generate(),
        };

        let record = self
            .writer
            .create_menu(CreateMenuParams {
                id,
                title: command.title,
                description: command.description,
            })
            .await?;

        if let Some(trigger) = &self.cache_trigger {
            trigger.menu_changed(MutationKind::Create, &record.id).await;
        }

        Ok(MenuAggregate::empty(record))
    }

    pub async fn update(
        &self,
        menu_id: &MenuId,
        command: UpdateMenuCommand,
    ) -> Result<MenuAggregate, CatalogError> {
        let current = self
            .reader
            .find_menu(menu_id)
            .await?
            .ok_or_else(|| CatalogError::not_found(EntityLevel::Menu))?;

        let record = self
            .writer
            .update_menu(UpdateMenuParams {
                id: current.id,
                title: command.title.unwrap_or(current.title),
                description: command.description.unwrap_or(current.description),
            })
            .await?
            .ok_or_else(|| CatalogError::not_found(EntityLevel::Menu))?;

        if let Some(trigger) = &self.cache_trigger {
            trigger.menu_changed(MutationKind::Update, &record.id).await;
        }

        // Counts come from the store; the cached aggregate was just invalidated.
        self.reader
            .find_menu_aggregate(&record.id)
            .await?
            .ok_or_else(|| CatalogError::not_found(EntityLevel::Menu))
    }

    /// Delete a menu together with its submenus and dishes.
    pub async fn delete(&self, menu_id: &MenuId) -> Result<(), CatalogError> {
        if !self.writer.delete_menu(menu_id).await? {
            return Err(CatalogError::not_found(EntityLevel::Menu));
        }

        if let Some(trigger) = &self.cache_trigger {
            trigger.menu_changed(MutationKind::Delete, menu_id).await;
        }
        Ok(())
    }
}
