use std::sync::Arc;

use crate::application::repos::{
    CreateSubmenuParams, SubmenusRepo, SubmenusWriteRepo, UpdateSubmenuParams,
};
use crate::cache::{CacheAside, CacheKey, CacheTrigger, FromCached, MutationKind};
use crate::domain::entities::SubmenuAggregate;
use crate::domain::error::EntityLevel;
use crate::domain::types::{MenuId, SubmenuId};

use super::ancestry::Ancestry;
use super::ensure_valid_id;
use super::error::CatalogError;

#[derive(Debug, Clone)]
pub struct CreateSubmenuCommand {
    pub id: Option<SubmenuId>,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateSubmenuCommand {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct SubmenuService {
    ancestry: Ancestry,
    reader: Arc<dyn SubmenusRepo>,
    writer: Arc<dyn SubmenusWriteRepo>,
    cache: CacheAside,
    cache_trigger: Option<Arc<CacheTrigger>>,
}

impl SubmenuService {
    pub fn new(
        ancestry: Ancestry,
        reader: Arc<dyn SubmenusRepo>,
        writer: Arc<dyn SubmenusWriteRepo>,
        cache: CacheAside,
    ) -> Self {
        Self {
            ancestry,
            reader,
            writer,
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

    pub async fn get(
        &self,
        menu_id: &MenuId,
        submenu_id: &SubmenuId,
    ) -> Result<SubmenuAggregate, CatalogError> {
        let key = CacheKey::Submenu(menu_id.clone(), submenu_id.clone());
        if let Some(hit) = self.cache.lookup::<SubmenuAggregate>(&key).await {
            return Ok(hit);
        }

        self.ancestry.menu(menu_id).await?;
        let aggregate = self
            .reader
            .find_submenu_aggregate(menu_id, submenu_id)
            .await?
            .ok_or_else(|| CatalogError::not_found(EntityLevel::Submenu))?;
        self.cache.populate(&key, aggregate.clone().into_cached()).await;
        Ok(aggregate)
    }

    pub async fn list(&self, menu_id: &MenuId) -> Result<Vec<SubmenuAggregate>, CatalogError> {
        let key = CacheKey::SubmenuList(menu_id.clone());
        if let Some(hit) = self.cache.lookup::<Vec<SubmenuAggregate>>(&key).await {
            return Ok(hit);
        }

        self.ancestry.menu(menu_id).await?;
        let submenus = self.reader.list_submenu_aggregates(menu_id).await?;
        self.cache.populate(&key, submenus.clone().into_cached()).await;
        Ok(submenus)
    }

    pub async fn create(
        &self,
        menu_id: &MenuId,
        command: CreateSubmenuCommand,
    ) -> Result<SubmenuAggregate, CatalogError> {
        let id = match command.id {
            Some(id) => {
                ensure_valid_id(id.as_str(), "submenu id")?;
                id
            }
            None => SubmenuId::generate(),
        };
        self.ancestry.menu(menu_id).await?;

        let record = self
            .writer
            .create_submenu(CreateSubmenuParams {
                id,
                menu_id: menu_id.clone(),
                title: command.title,
                description: command.description,
            })
            .await?;

        if let Some(trigger) = &self.cache_trigger {
            trigger
                .submenu_changed(MutationKind::Create, menu_id, &record.id)
                .await;
        }

        Ok(SubmenuAggregate::empty(record))
    }

    pub async fn update(
        &self,
        menu_id: &MenuId,
        submenu_id: &SubmenuId,
        command: UpdateSubmenuCommand,
    ) -> Result<SubmenuAggregate, CatalogError> {
        let current = self.ancestry.submenu(menu_id, submenu_id).await?;

        let record = self
            .writer
            .update_submenu(UpdateSubmenuParams {
                id: current.id,
                menu_id: current.menu_id,
                title: command.title.unwrap_or(current.title),
                description: command.description.unwrap_or(current.description),
            })
            .await?
            .ok_or_else(|| CatalogError::not_found(EntityLevel::Submenu))?;

        if let Some(trigger) = &self.cache_trigger {
            trigger
                .submenu_changed(MutationKind::Update, menu_id, &record.id)
                .await;
        }

        self.reader
            .find_submenu_aggregate(menu_id, &record.id)
            .await?
            .ok_or_else(|| CatalogError::not_found(EntityLevel::Submenu))
    }

    /// Delete a submenu together with its dishes.
    pub async fn delete(&self, menu_id: &MenuId, submenu_id: &SubmenuId) -> Result<(), CatalogError> {
        self.ancestry.menu(menu_id).await?;
        if !self.writer.delete_submenu(menu_id, submenu_id).await? {
            return Err(CatalogError::not_found(EntityLevel::Submenu));
        }

        if let Some(trigger) = &self.cache_trigger {
            trigger
                .submenu_changed(MutationKind::Delete, menu_id, submenu_id)
                .await;
        }
        Ok(())
    }
}
