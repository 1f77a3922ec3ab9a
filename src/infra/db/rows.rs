use crate::application::repos::RepoError;
use crate::domain::entities::{
    DishRecord, MenuAggregate, MenuRecord, SubmenuAggregate, SubmenuRecord,
};
use crate::domain::types::{DishId, MenuId, Price, SubmenuId};

#[derive(sqlx::FromRow)]
pub(crate) struct MenuRow {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: String,
}

impl From<MenuRow> for MenuRecord {
    fn from(row: MenuRow) -> Self {
        Self {
            id: MenuId::new(row.id),
            title: row.title,
            description: row.description,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct MenuAggregateRow {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) submenus_count: i64,
    pub(crate) dishes_count: i64,
}

impl TryFrom<MenuAggregateRow> for MenuAggregate {
    type Error = RepoError;

    fn try_from(row: MenuAggregateRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: MenuId::new(row.id),
            title: row.title,
            description: row.description,
            submenus_count: convert_count(row.submenus_count)?,
            dishes_count: convert_count(row.dishes_count)?,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct SubmenuRow {
    pub(crate) id: String,
    pub(crate) menu_id: String,
    pub(crate) title: String,
    pub(crate) description: String,
}

impl From<SubmenuRow> for SubmenuRecord {
    fn from(row: SubmenuRow) -> Self {
        Self {
            id: SubmenuId::new(row.id),
            menu_id: MenuId::new(row.menu_id),
            title: row.title,
            description: row.description,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct SubmenuAggregateRow {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) dishes_count: i64,
}

impl TryFrom<SubmenuAggregateRow> for SubmenuAggregate {
    type Error = RepoError;

    fn try_from(row: SubmenuAggregateRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: SubmenuId::new(row.id),
            title: row.title,
            description: row.description,
            dishes_count: convert_count(row.dishes_count)?,
        })
    }
}

/// Prices are selected as `price::TEXT` and parsed back into hundredths.
#[derive(sqlx::FromRow)]
pub(crate) struct DishRow {
    pub(crate) id: String,
    pub(crate) submenu_id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) price: String,
}

impl TryFrom<DishRow> for DishRecord {
    type Error = RepoError;

    fn try_from(row: DishRow) -> Result<Self, Self::Error> {
        let price: Price = row.price.parse().map_err(|err| RepoError::Integrity {
            message: format!("dish `{}` has an unreadable price: {err}", row.id),
        })?;
        Ok(Self {
            id: DishId::new(row.id),
            title: row.title,
            description: row.description,
            price,
        })
    }
}

pub(crate) fn convert_count(value: i64) -> Result<u64, RepoError> {
    value
        .try_into()
        .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
}
