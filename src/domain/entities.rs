//! Catalog records as stored, and the derived views served to callers.

use serde::{Deserialize, Serialize};

use crate::domain::types::{DishId, MenuId, Price, SubmenuId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuRecord {
    pub id: MenuId,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmenuRecord {
    pub id: SubmenuId,
    pub menu_id: MenuId,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DishRecord {
    pub id: DishId,
    pub title: String,
    pub description: String,
    pub price: Price,
}

/// A menu together with its distinct descendant counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuAggregate {
    pub id: MenuId,
    pub title: String,
    pub description: String,
    pub submenus_count: u64,
    pub dishes_count: u64,
}

impl MenuAggregate {
    /// Aggregate view of a menu that has just been created and owns nothing yet.
    pub fn empty(record: MenuRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            submenus_count: 0,
            dishes_count: 0,
        }
    }
}

/// A submenu together with its dish count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmenuAggregate {
    pub id: SubmenuId,
    pub title: String,
    pub description: String,
    pub dishes_count: u64,
}

impl SubmenuAggregate {
    pub fn empty(record: SubmenuRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            dishes_count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmenuTree {
    pub id: SubmenuId,
    pub title: String,
    pub description: String,
    pub dishes: Vec<DishRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuTree {
    pub id: MenuId,
    pub title: String,
    pub description: String,
    pub submenus: Vec<SubmenuTree>,
}

/// Every menu with its submenus and their dishes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WholeTree {
    pub menus: Vec<MenuTree>,
}

impl WholeTree {
    pub fn dishes_mut(&mut self) -> impl Iterator<Item = &mut DishRecord> {
        self.menus
            .iter_mut()
            .flat_map(|menu| menu.submenus.iter_mut())
            .flat_map(|submenu| submenu.dishes.iter_mut())
    }
}
