//! Menu handlers

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::domain::types::MenuId;
use crate::infra::http::api::error::{ApiError, catalog_to_api};
use crate::infra::http::api::models::{DeleteResponse, MenuCreateRequest, MenuUpdateRequest};
use crate::infra::http::api::state::ApiState;

pub async fn list_menus(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let menus = state.menus.list().await.map_err(catalog_to_api)?;
    Ok(Json(menus))
}

pub async fn whole_tree(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let tree = state.menus.whole_tree().await.map_err(catalog_to_api)?;
    Ok(Json(tree))
}

pub async fn get_menu(
    State(state): State<ApiState>,
    Path(menu_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let menu = state
        .menus
        .get(&MenuId::new(menu_id))
        .await
        .map_err(catalog_to_api)?;
    Ok(Json(menu))
}

pub async fn create_menu(
    State(state): State<ApiState>,
    Json(payload): Json<MenuCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let menu = state
        .menus
        .create(payload.into())
        .await
        .map_err(catalog_to_api)?;
    Ok((StatusCode::CREATED, Json(menu)))
}

pub async fn update_menu(
    State(state): State<ApiState>,
    Path(menu_id): Path<String>,
    Json(payload): Json<MenuUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let menu = state
        .menus
        .update(&MenuId::new(menu_id), payload.into())
        .await
        .map_err(catalog_to_api)?;
    Ok(Json(menu))
}

pub async fn delete_menu(
    State(state): State<ApiState>,
    Path(menu_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .menus
        .delete(&MenuId::new(menu_id))
        .await
        .map_err(catalog_to_api)?;
    Ok(Json(DeleteResponse::deleted("menu")))
}
