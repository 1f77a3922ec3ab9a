use async_trait::async_trait;

use crate::application::repos::{
    CreateSubmenuParams, RepoError, SubmenusRepo, SubmenusWriteRepo, UpdateSubmenuParams,
};
use crate::domain::entities::{SubmenuAggregate, SubmenuRecord};
use crate::domain::types::{MenuId, SubmenuId};

use super::rows::{SubmenuAggregateRow, SubmenuRow};
use super::{PostgresRepositories, map_sqlx_error};

const SUBMENU_AGGREGATE_SELECT: &str = r#"
    SELECT
        s.id,
        s.title,
        s.description,
        COUNT(d.id) AS dishes_count
    FROM submenus s
    LEFT JOIN dishes d ON d.submenu_id = s.id
"#;

#[async_trait]
impl SubmenusRepo for PostgresRepositories {
    async fn find_submenu(
        &self,
        menu_id: &MenuId,
        id: &SubmenuId,
    ) -> Result<Option<SubmenuRecord>, RepoError> {
        let row = sqlx::query_as::<_, SubmenuRow>(
            r#"
            SELECT id, menu_id, title, description
            FROM submenus
            WHERE menu_id = $1 AND id = $2
            "#,
        )
        .bind(menu_id.as_str())
        .bind(id.as_str())
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(SubmenuRecord::from))
    }

    async fn find_submenu_aggregate(
        &self,
        menu_id: &MenuId,
        id: &SubmenuId,
    ) -> Result<Option<SubmenuAggregate>, RepoError> {
        let sql = format!(
            "{SUBMENU_AGGREGATE_SELECT} WHERE s.menu_id = $1 AND s.id = $2 GROUP BY s.id"
        );
        let row = sqlx::query_as::<_, SubmenuAggregateRow>(&sql)
            .bind(menu_id.as_str())
            .bind(id.as_str())
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(SubmenuAggregate::try_from).transpose()
    }

    async fn list_submenu_aggregates(
        &self,
        menu_id: &MenuId,
    ) -> Result<Vec<SubmenuAggregate>, RepoError> {
        let sql = format!(
            "{SUBMENU_AGGREGATE_SELECT} WHERE s.menu_id = $1 GROUP BY s.id ORDER BY s.title, s.id"
        );
        let rows = sqlx::query_as::<_, SubmenuAggregateRow>(&sql)
            .bind(menu_id.as_str())
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(SubmenuAggregate::try_from).collect()
    }
}

#[async_trait]
impl SubmenusWriteRepo for PostgresRepositories {
    async fn create_submenu(
        &self,
        params: CreateSubmenuParams,
    ) -> Result<SubmenuRecord, RepoError> {
        let row = sqlx::query_as::<_, SubmenuRow>(
            r#"
            INSERT INTO submenus (id, menu_id, title, description)
            VALUES ($1, $2, $3, $4)
            RETURNING id, menu_id, title, description
            "#,
        )
        .bind(params.id.as_str())
        .bind(params.menu_id.as_str())
        .bind(&params.title)
        .bind(&params.description)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(SubmenuRecord::from(row))
    }

    async fn update_submenu(
        &self,
        params: UpdateSubmenuParams,
    ) -> Result<Option<SubmenuRecord>, RepoError> {
        let row = sqlx::query_as::<_, SubmenuRow>(
            r#"
            UPDATE submenus
            SET title = $3, description = $4
            WHERE menu_id = $1 AND id = $2
            RETURNING id, menu_id, title, description
            "#,
        )
        .bind(params.menu_id.as_str())
        .bind(params.id.as_str())
        .bind(&params.title)
        .bind(&params.description)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(SubmenuRecord::from))
    }

    async fn delete_submenu(&self, menu_id: &MenuId, id: &SubmenuId) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM submenus WHERE menu_id = $1 AND id = $2")
            .bind(menu_id.as_str())
            .bind(id.as_str())
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
