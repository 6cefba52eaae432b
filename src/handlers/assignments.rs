// src/handlers/assignments.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::assignment::{Assignment, AssignmentUpdate, NewAssignment},
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentFilter {
    pub employee_id: Option<String>,
}

pub async fn list_assignments(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Query(filter): Query<AssignmentFilter>,
) -> Result<Json<Vec<Assignment>>, AppError> {
    let assignments = match filter.employee_id {
        Some(employee_id) => app_state.assignment_repo.list_for_employee(&employee_id).await?,
        None => app_state.assignment_repo.list().await?,
    };
    Ok(Json(assignments))
}

pub async fn get_assignment(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<Assignment>, AppError> {
    Ok(Json(app_state.assignment_repo.get(&id).await?))
}

pub async fn create_assignment(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Json(payload): Json<NewAssignment>,
) -> Result<(StatusCode, Json<Assignment>), AppError> {
    let assignment = app_state.assignment_repo.create(payload).await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

pub async fn update_assignment(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
    Json(payload): Json<AssignmentUpdate>,
) -> Result<Json<Assignment>, AppError> {
    Ok(Json(app_state.assignment_repo.update(&id, payload).await?))
}

pub async fn delete_assignment(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    app_state.assignment_repo.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
