// src/handlers/employees.rs

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::Response,
    Json,
};
use serde::Deserialize;

use crate::{
    common::error::AppError,
    config::AppState,
    db::{integrity::DeletePolicy, DeleteReport, UploadOutcome},
    handlers::{attachment, read_files},
    middleware::auth::AuthenticatedUser,
    models::{
        assignment::Assignment,
        employee::{Employee, EmployeeUpdate, NewEmployee},
    },
};

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub policy: DeletePolicy,
}

pub async fn list_employees(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<Employee>>, AppError> {
    Ok(Json(app_state.employee_repo.list().await?))
}

pub async fn get_employee(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<Employee>, AppError> {
    Ok(Json(app_state.employee_repo.get(&id).await?))
}

pub async fn create_employee(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Json(payload): Json<NewEmployee>,
) -> Result<(StatusCode, Json<Employee>), AppError> {
    let employee = app_state.employee_repo.create(payload).await?;
    Ok((StatusCode::CREATED, Json(employee)))
}

pub async fn update_employee(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
    Json(payload): Json<EmployeeUpdate>,
) -> Result<Json<Employee>, AppError> {
    Ok(Json(app_state.employee_repo.update(&id, payload).await?))
}

// `?policy=cascade` exclui os zimmets junto; o padrão bloqueia
pub async fn delete_employee(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<DeleteReport>, AppError> {
    Ok(Json(app_state.employee_repo.delete(&id, query.policy).await?))
}

pub async fn list_employee_assignments(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<Assignment>>, AppError> {
    app_state.employee_repo.get(&id).await?;
    Ok(Json(app_state.assignment_repo.list_for_employee(&id).await?))
}

// ---
// Documentos
// ---

pub async fn upload_documents(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Vec<UploadOutcome>>, AppError> {
    let files = read_files(multipart).await?;
    if files.is_empty() {
        return Err(AppError::validation("Nenhum arquivo enviado."));
    }
    Ok(Json(app_state.employee_repo.attach_documents(&id, files).await?))
}

pub async fn download_document(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path((id, name)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let bytes = app_state.employee_repo.read_document(&id, &name).await?;
    Ok(attachment(bytes, &name, "application/octet-stream"))
}

pub async fn delete_document(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path((id, name)): Path<(String, String)>,
) -> Result<Json<Employee>, AppError> {
    Ok(Json(app_state.employee_repo.remove_document(&id, &name).await?))
}
