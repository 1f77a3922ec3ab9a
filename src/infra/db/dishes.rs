use async_trait::async_trait;

use crate::application::repos::{
    CreateDishParams, DishesRepo, DishesWriteRepo, RepoError, UpdateDishParams,
};
use crate::domain::entities::DishRecord;
use crate::domain::types::{DishId, SubmenuId};

use super::rows::DishRow;
use super::{DISH_COLUMNS, PostgresRepositories, map_sqlx_error};

/// Same columns as [`DISH_COLUMNS`] for statements without a table alias.
const RETURNING_DISH: &str = "RETURNING id, submenu_id, title, description, price::TEXT AS price";

#[async_trait]
impl DishesRepo for PostgresRepositories {
    async fn find_dish(
        &self,
        submenu_id: &SubmenuId,
        id: &DishId,
    ) -> Result<Option<DishRecord>, RepoError> {
        let sql = format!(
            "SELECT {DISH_COLUMNS} FROM dishes d WHERE d.submenu_id = $1 AND d.id = $2"
        );
        let row = sqlx::query_as::<_, DishRow>(&sql)
            .bind(submenu_id.as_str())
            .bind(id.as_str())
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(DishRecord::try_from).transpose()
    }

    async fn list_dishes(&self, submenu_id: &SubmenuId) -> Result<Vec<DishRecord>, RepoError> {
        let sql = format!(
            "SELECT {DISH_COLUMNS} FROM dishes d WHERE d.submenu_id = $1 ORDER BY d.title, d.id"
        );
        let rows = sqlx::query_as::<_, DishRow>(&sql)
            .bind(submenu_id.as_str())
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(DishRecord::try_from).collect()
    }
}

#[async_trait]
impl DishesWriteRepo for PostgresRepositories {
    async fn create_dish(&self, params: CreateDishParams) -> Result<DishRecord, RepoError> {
        let sql = format!(
            "INSERT INTO dishes (id, submenu_id, title, description, price) \
             VALUES ($1, $2, $3, $4, CAST($5 AS NUMERIC(32, 2))) {RETURNING_DISH}"
        );
        let row = sqlx::query_as::<_, DishRow>(&sql)
            .bind(params.id.as_str())
            .bind(params.submenu_id.as_str())
            .bind(&params.title)
            .bind(&params.description)
            .bind(params.price.to_string())
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        DishRecord::try_from(row)
    }

    async fn update_dish(
        &self,
        params: UpdateDishParams,
    ) -> Result<Option<DishRecord>, RepoError> {
        let sql = format!(
            "UPDATE dishes SET title = $3, description = $4, price = CAST($5 AS NUMERIC(32, 2)) \
             WHERE submenu_id = $1 AND id = $2 {RETURNING_DISH}"
        );
        let row = sqlx::query_as::<_, DishRow>(&sql)
            .bind(params.submenu_id.as_str())
            .bind(params.id.as_str())
            .bind(&params.title)
            .bind(&params.description)
            .bind(params.price.to_string())
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(DishRecord::try_from).transpose()
    }

    async fn delete_dish(&self, submenu_id: &SubmenuId, id: &DishId) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM dishes WHERE submenu_id = $1 AND id = $2")
            .bind(submenu_id.as_str())
            .bind(id.as_str())
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
