use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::domain::types::{MenuId, SubmenuId};
use crate::infra::http::api::error::{ApiError, catalog_to_api};
use crate::infra::http::api::models::{
    DeleteResponse, SubmenuCreateRequest, SubmenuUpdateRequest,
};
use crate::infra::http::api::state::ApiState;

pub async fn list_submenus(
    State(state): State<ApiState>,
    Path(menu_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let submenus = state
        .submenus
        .list(&MenuId::new(menu_id))
        .await
        .map_err(catalog_to_api)?;
    Ok(Json(submenus))
}

pub async fn get_submenu(
    State(state): State<ApiState>,
    Path((menu_id, submenu_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let submenu = state
        .submenus
        .get(&MenuId::new(menu_id), &SubmenuId::new(submenu_id))
        .await
        .map_err(catalog_to_api)?;
    Ok(Json(submenu))
}

pub async fn create_submenu(
    State(state): State<ApiState>,
    Path(menu_id): Path<String>,
    Json(payload): Json<SubmenuCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let submenu = state
        .submenus
        .create(&MenuId::new(menu_id), payload.into())
        .await
        .map_err(catalog_to_api)?;
    Ok((StatusCode::CREATED, Json(submenu)))
}

pub async fn update_submenu(
    State(state): State<ApiState>,
    Path((menu_id, submenu_id)): Path<(String, String)>,
    Json(payload): Json<SubmenuUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let submenu = state
        .submenus
        .update(
            &MenuId::new(menu_id),
            &SubmenuId::new(submenu_id),
            payload.into(),
        )
        .await
        .map_err(catalog_to_api)?;
    Ok(Json(submenu))
}

pub async fn delete_submenu(
    State(state): State<ApiState>,
    Path((menu_id, submenu_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .submenus
        .delete(&MenuId::new(menu_id), &SubmenuId::new(submenu_id))
        .await
        .map_err(catalog_to_api)?;
    Ok(Json(DeleteResponse::deleted("submenu")))
}
