// src/handlers/users.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::RequireAdmin,
    models::auth::{PublicUser, UserUpdate},
};

pub async fn list_users(
    State(app_state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<PublicUser>>, AppError> {
    let users = app_state.user_repo.list().await?;
    Ok(Json(users.iter().map(PublicUser::from).collect()))
}

pub async fn get_user(
    State(app_state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<PublicUser>, AppError> {
    let user = app_state.user_repo.get(&id).await?;
    Ok(Json(PublicUser::from(&user)))
}

pub async fn update_user(
    State(app_state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
    Json(payload): Json<UserUpdate>,
) -> Result<Json<PublicUser>, AppError> {
    let user = app_state.user_repo.update(&id, payload).await?;
    Ok(Json(PublicUser::from(&user)))
}

pub async fn delete_user(
    State(app_state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if admin.id == id {
        return Err(AppError::validation("Um administrador não pode excluir a própria conta."));
    }
    app_state.user_repo.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
