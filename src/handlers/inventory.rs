// src/handlers/inventory.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::inventory::{InventoryItem, InventoryItemUpdate, NewInventoryItem},
};

pub async fn list_items(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<InventoryItem>>, AppError> {
    Ok(Json(app_state.inventory_repo.list().await?))
}

pub async fn get_item(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<InventoryItem>, AppError> {
    Ok(Json(app_state.inventory_repo.get(&id).await?))
}

pub async fn create_item(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Json(payload): Json<NewInventoryItem>,
) -> Result<(StatusCode, Json<InventoryItem>), AppError> {
    let item = app_state.inventory_repo.create(payload).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_item(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
    Json(payload): Json<InventoryItemUpdate>,
) -> Result<Json<InventoryItem>, AppError> {
    Ok(Json(app_state.inventory_repo.update(&id, payload).await?))
}

pub async fn delete_item(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    app_state.inventory_repo.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
