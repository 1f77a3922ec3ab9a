use std::collections::HashMap;

use async_trait::async_trait;

use crate::application::repos::{
    CreateMenuParams, MenusRepo, MenusWriteRepo, RepoError, UpdateMenuParams,
};
use crate::domain::entities::{
    DishRecord, MenuAggregate, MenuRecord, MenuTree, SubmenuRecord, SubmenuTree, WholeTree,
};
use crate::domain::types::MenuId;

use super::rows::{DishRow, MenuAggregateRow, MenuRow, SubmenuRow};
use super::{DISH_COLUMNS, PostgresRepositories, map_sqlx_error};

const MENU_AGGREGATE_SELECT: &str = r#"
    SELECT
        m.id,
        m.title,
        m.description,
        COUNT(DISTINCT s.id) AS submenus_count,
        COUNT(DISTINCT d.id) AS dishes_count
    FROM menus m
    LEFT JOIN submenus s ON s.menu_id = m.id
    LEFT JOIN dishes d ON d.submenu_id = s.id
"#;

#[async_trait]
impl MenusRepo for PostgresRepositories {
    async fn find_menu(&self, id: &MenuId) -> Result<Option<MenuRecord>, RepoError> {
        let row = sqlx::query_as::<_, MenuRow>(
            r#"
            SELECT id, title, description
            FROM menus
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(MenuRecord::from))
    }

    async fn find_menu_aggregate(
        &self,
        id: &MenuId,
    ) -> Result<Option<MenuAggregate>, RepoError> {
        let sql = format!("{MENU_AGGREGATE_SELECT} WHERE m.id = $1 GROUP BY m.id");
        let row = sqlx::query_as::<_, MenuAggregateRow>(&sql)
            .bind(id.as_str())
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(MenuAggregate::try_from).transpose()
    }

    async fn list_menu_aggregates(&self) -> Result<Vec<MenuAggregate>, RepoError> {
        let sql = format!("{MENU_AGGREGATE_SELECT} GROUP BY m.id ORDER BY m.title, m.id");
        let rows = sqlx::query_as::<_, MenuAggregateRow>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(MenuAggregate::try_from).collect()
    }

    async fn load_whole_tree(&self) -> Result<WholeTree, RepoError> {
        let menus = sqlx::query_as::<_, MenuRow>(
            r#"
            SELECT id, title, description
            FROM menus
            ORDER BY title, id
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let submenus = sqlx::query_as::<_, SubmenuRow>(
            r#"
            SELECT id, menu_id, title, description
            FROM submenus
            ORDER BY title, id
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let dishes_sql = format!("SELECT {DISH_COLUMNS} FROM dishes d ORDER BY d.title, d.id");
        let dishes = sqlx::query_as::<_, DishRow>(&dishes_sql)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let mut dishes_by_submenu: HashMap<String, Vec<DishRecord>> = HashMap::new();
        for row in dishes {
            let submenu_id = row.submenu_id.clone();
            dishes_by_submenu
                .entry(submenu_id)
                .or_default()
                .push(DishRecord::try_from(row)?);
        }

        let mut submenus_by_menu: HashMap<String, Vec<SubmenuTree>> = HashMap::new();
        for row in submenus {
            let dishes = dishes_by_submenu.remove(&row.id).unwrap_or_default();
            let menu_id = row.menu_id.clone();
            let record = SubmenuRecord::from(row);
            submenus_by_menu.entry(menu_id).or_default().push(SubmenuTree {
                id: record.id,
                title: record.title,
                description: record.description,
                dishes,
            });
        }

        let menus = menus
            .into_iter()
            .map(|row| {
                let submenus = submenus_by_menu.remove(&row.id).unwrap_or_default();
                let record = MenuRecord::from(row);
                MenuTree {
                    id: record.id,
                    title: record.title,
                    description: record.description,
                    submenus,
                }
            })
            .collect();

        Ok(WholeTree { menus })
    }
}

#[async_trait]
impl MenusWriteRepo for PostgresRepositories {
    async fn create_menu(&self, params: CreateMenuParams) -> Result<MenuRecord, RepoError> {
        let row = sqlx::query_as::<_, MenuRow>(
            r#"
            INSERT INTO menus (id, title, description)
            VALUES ($1, $2, $3)
            RETURNING id, title, description
            "#,
        )
        .bind(params.id.as_str())
        .bind(&params.title)
        .bind(&params.description)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(MenuRecord::from(row))
    }

    async fn update_menu(
        &self,
        params: UpdateMenuParams,
    ) -> Result<Option<MenuRecord>, RepoError> {
        let row = sqlx::query_as::<_, MenuRow>(
            r#"
            UPDATE menus
            SET title = $2, description = $3
            WHERE id = $1
            RETURNING id, title, description
            "#,
        )
        .bind(params.id.as_str())
        .bind(&params.title)
        .bind(&params.description)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(MenuRecord::from))
    }

    async fn delete_menu(&self, id: &MenuId) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM menus WHERE id = $1")
            .bind(id.as_str())
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
