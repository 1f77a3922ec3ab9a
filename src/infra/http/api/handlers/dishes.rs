//! Dish and discount handlers

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::domain::types::{DishId, MenuId, SubmenuId};
use crate::infra::http::api::error::{ApiError, catalog_to_api};
use crate::infra::http::api::models::{
    DeleteResponse, DiscountRequest, DishCreateRequest, DishUpdateRequest,
};
use crate::infra::http::api::state::ApiState;

fn dish_path(menu_id: String, submenu_id: String, dish_id: String) -> (MenuId, SubmenuId, DishId) {
    (
        MenuId::new(menu_id),
        SubmenuId::new(submenu_id),
        DishId::new(dish_id),
    )
}

pub async fn list_dishes(
    State(state): State<ApiState>,
    Path((menu_id, submenu_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let dishes = state
        .dishes
        .list(&MenuId::new(menu_id), &SubmenuId::new(submenu_id))
        .await
        .map_err(catalog_to_api)?;
    Ok(Json(dishes))
}

pub async fn get_dish(
    State(state): State<ApiState>,
    Path((menu_id, submenu_id, dish_id)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let (menu_id, submenu_id, dish_id) = dish_path(menu_id, submenu_id, dish_id);
    let dish = state
        .dishes
        .get(&menu_id, &submenu_id, &dish_id)
        .await
        .map_err(catalog_to_api)?;
    Ok(Json(dish))
}

pub async fn create_dish(
    State(state): State<ApiState>,
    Path((menu_id, submenu_id)): Path<(String, String)>,
    Json(payload): Json<DishCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let dish = state
        .dishes
        .create(
            &MenuId::new(menu_id),
            &SubmenuId::new(submenu_id),
            payload.into(),
        )
        .await
        .map_err(catalog_to_api)?;
    Ok((StatusCode::CREATED, Json(dish)))
}

pub async fn update_dish(
    State(state): State<ApiState>,
    Path((menu_id, submenu_id, dish_id)): Path<(String, String, String)>,
    Json(payload): Json<DishUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (menu_id, submenu_id, dish_id) = dish_path(menu_id, submenu_id, dish_id);
    let dish = state
        .dishes
        .update(&menu_id, &submenu_id, &dish_id, payload.into())
        .await
        .map_err(catalog_to_api)?;
    Ok(Json(dish))
}

pub async fn delete_dish(
    State(state): State<ApiState>,
    Path((menu_id, submenu_id, dish_id)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let (menu_id, submenu_id, dish_id) = dish_path(menu_id, submenu_id, dish_id);
    state
        .dishes
        .delete(&menu_id, &submenu_id, &dish_id)
        .await
        .map_err(catalog_to_api)?;
    Ok(Json(DeleteResponse::deleted("dish")))
}

pub async fn set_discount(
    State(state): State<ApiState>,
    Path((menu_id, submenu_id, dish_id)): Path<(String, String, String)>,
    Json(payload): Json<DiscountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let discount = payload.parse().map_err(ApiError::bad_request)?;
    let (menu_id, submenu_id, dish_id) = dish_path(menu_id, submenu_id, dish_id);
    let dish = state
        .dishes
        .set_discount(&menu_id, &submenu_id, &dish_id, discount)
        .await
        .map_err(catalog_to_api)?;
    Ok(Json(dish))
}

pub async fn clear_discount(
    State(state): State<ApiState>,
    Path((menu_id, submenu_id, dish_id)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let (menu_id, submenu_id, dish_id) = dish_path(menu_id, submenu_id, dish_id);
    let dish = state
        .dishes
        .clear_discount(&menu_id, &submenu_id, &dish_id)
        .await
        .map_err(catalog_to_api)?;
    Ok(Json(dish))
}
