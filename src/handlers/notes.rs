// src/handlers/notes.rs

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Response,
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    db::{DeleteReport, UploadOutcome},
    handlers::{attachment, read_files},
    middleware::auth::AuthenticatedUser,
    models::note::{NewNote, Note, NoteUpdate},
};

pub async fn list_notes(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<Note>>, AppError> {
    Ok(Json(app_state.note_repo.list().await?))
}

pub async fn get_note(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<Note>, AppError> {
    Ok(Json(app_state.note_repo.get(&id).await?))
}

// O autor vem da sessão, nunca do payload
pub async fn create_note(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<NewNote>,
) -> Result<(StatusCode, Json<Note>), AppError> {
    let note = app_state.note_repo.create(payload, &user.id).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn update_note(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
    Json(payload): Json<NoteUpdate>,
) -> Result<Json<Note>, AppError> {
    Ok(Json(app_state.note_repo.update(&id, payload).await?))
}

pub async fn delete_note(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteReport>, AppError> {
    Ok(Json(app_state.note_repo.delete(&id).await?))
}

// ---
// Anexos
// ---

pub async fn upload_files(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Vec<UploadOutcome>>, AppError> {
    let files = read_files(multipart).await?;
    if files.is_empty() {
        return Err(AppError::validation("Nenhum arquivo enviado."));
    }
    Ok(Json(app_state.note_repo.attach_files(&id, files).await?))
}

pub async fn download_file(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path((id, name)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let bytes = app_state.note_repo.read_file(&id, &name).await?;
    Ok(attachment(bytes, &name, "application/octet-stream"))
}

pub async fn delete_file(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path((id, name)): Path<(String, String)>,
) -> Result<Json<Note>, AppError> {
    Ok(Json(app_state.note_repo.remove_file(&id, &name).await?))
}
