//! Repository traits describing the store of record.
//!
//! Reads and writes are split per entity the same way the persistence
//! adapters implement them. Lookups below the menu level are always scoped
//! to the parent chain, so a submenu id paired with the wrong menu id is
//! reported as absent.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{
    DishRecord, MenuAggregate, MenuRecord, SubmenuAggregate, SubmenuRecord, WholeTree,
};
use crate::domain::types::{DishId, MenuId, Price, SubmenuId};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreateMenuParams {
    pub id: MenuId,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct UpdateMenuParams {
    pub id: MenuId,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct CreateSubmenuParams {
    pub id: SubmenuId,
    pub menu_id: MenuId,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct UpdateSubmenuParams {
    pub id: SubmenuId,
    pub menu_id: MenuId,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct CreateDishParams {
    pub id: DishId,
    pub submenu_id: SubmenuId,
    pub title: String,
    pub description: String,
    pub price: Price,
}

#[derive(Debug, Clone)]
pub struct UpdateDishParams {
    pub id: DishId,
    pub submenu_id: SubmenuId,
    pub title: String,
    pub description: String,
    pub price: Price,
}

#[async_trait]
pub trait MenusRepo: Send + Sync {
    async fn find_menu(&self, id: &MenuId) -> Result<Option<MenuRecord>, RepoError>;

    /// Menu plus distinct submenu and dish counts in one round trip.
    async fn find_menu_aggregate(&self, id: &MenuId) -> Result<Option<MenuAggregate>, RepoError>;

    async fn list_menu_aggregates(&self) -> Result<Vec<MenuAggregate>, RepoError>;

    async fn load_whole_tree(&self) -> Result<WholeTree, RepoError>;
}

#[async_trait]
pub trait MenusWriteRepo: Send + Sync {
    async fn create_menu(&self, params: CreateMenuParams) -> Result<MenuRecord, RepoError>;

    /// Returns `None` when the menu does not exist.
    async fn update_menu(&self, params: UpdateMenuParams)
    -> Result<Option<MenuRecord>, RepoError>;

    /// Deletes the menu and, by cascade, its submenus and dishes.
    /// Returns `false` when nothing was deleted.
    async fn delete_menu(&self, id: &MenuId) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait SubmenusRepo: Send + Sync {
    async fn find_submenu(
        &self,
        menu_id: &MenuId,
        id: &SubmenuId,
    ) -> Result<Option<SubmenuRecord>, RepoError>;

    async fn find_submenu_aggregate(
        &self,
        menu_id: &MenuId,
        id: &SubmenuId,
    ) -> Result<Option<SubmenuAggregate>, RepoError>;

    async fn list_submenu_aggregates(
        &self,
        menu_id: &MenuId,
    ) -> Result<Vec<SubmenuAggregate>, RepoError>;
}

#[async_trait]
pub trait SubmenusWriteRepo: Send + Sync {
    async fn create_submenu(
        &self,
        params: CreateSubmenuParams,
    ) -> Result<SubmenuRecord, RepoError>;

    async fn update_submenu(
        &self,
        params: UpdateSubmenuParams,
    ) -> Result<Option<SubmenuRecord>, RepoError>;

    /// Deletes the submenu and, by cascade, its dishes.
    async fn delete_submenu(&self, menu_id: &MenuId, id: &SubmenuId) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait DishesRepo: Send + Sync {
    async fn find_dish(
        &self,
        submenu_id: &SubmenuId,
        id: &DishId,
    ) -> Result<Option<DishRecord>, RepoError>;

    async fn list_dishes(&self, submenu_id: &SubmenuId) -> Result<Vec<DishRecord>, RepoError>;
}

#[async_trait]
pub trait DishesWriteRepo: Send + Sync {
    async fn create_dish(&self, params: CreateDishParams) -> Result<DishRecord, RepoError>;

    async fn update_dish(&self, params: UpdateDishParams)
    -> Result<Option<DishRecord>, RepoError>;

    async fn delete_dish(&self, submenu_id: &SubmenuId, id: &DishId) -> Result<bool, RepoError>;
}

/// Liveness probe against the store of record.
#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
