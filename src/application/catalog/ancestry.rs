use std::sync::Arc;

use crate::application::repos::{DishesRepo, MenusRepo, SubmenusRepo};
use crate::domain::entities::{DishRecord, MenuRecord, SubmenuRecord};
use crate::domain::error::EntityLevel;
use crate::domain::types::{DishId, MenuId, SubmenuId};

use super::error::CatalogError;

/// Resolves an id chain against the store of record, top level first, so
/// the first missing level is the one reported.
#[derive(Clone)]
pub struct Ancestry {
    menus: Arc<dyn MenusRepo>,
    submenus: Arc<dyn SubmenusRepo>,
    dishes: Arc<dyn DishesRepo>,
}

impl Ancestry {
    pub fn new(
        menus: Arc<dyn MenusRepo>,
        submenus: Arc<dyn SubmenusRepo>,
        dishes: Arc<dyn DishesRepo>,
    ) -> Self {
        Self {
            menus,
            submenus,
            dishes,
        }
    }

    pub async fn menu(&self, menu_id: &MenuId) -> Result<MenuRecord, CatalogError> {
        self.menus
            .find_menu(menu_id)
            .await?
            .ok_or_else(|| CatalogError::not_found(EntityLevel::Menu))
    }

    pub async fn submenu(
        &self,
        menu_id: &MenuId,
        submenu_id: &SubmenuId,
    ) -> Result<SubmenuRecord, CatalogError> {
        self.menu(menu_id).await?;
        self.submenus
            .find_submenu(menu_id, submenu_id)
            .await?
            .ok_or_else(|| CatalogError::not_found(EntityLevel::Submenu))
    }

    pub async fn dish(
        &self,
        menu_id: &MenuId,
        submenu_id: &SubmenuId,
        dish_id: &DishId,
    ) -> Result<DishRecord, CatalogError> {
        self.submenu(menu_id, submenu_id).await?;
        self.dishes
            .find_dish(submenu_id, dish_id)
            .await?
            .ok_or_else(|| CatalogError::not_found(EntityLevel::Dish))
    }
}
