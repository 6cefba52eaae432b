// src/handlers/rate_cards.rs

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Response,
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    db::{rate_card_repo::ImportOutcome, DeleteReport},
    handlers::{attachment, read_single_file},
    middleware::auth::AuthenticatedUser,
    models::rate_card::{NewRateCard, RateCard, RateCardUpdate},
    services::{
        spreadsheet_import,
        spreadsheet_service::{self, TEMPLATE_FILENAME, XLSX_CONTENT_TYPE},
    },
};

pub async fn list_rate_cards(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<RateCard>>, AppError> {
    Ok(Json(app_state.rate_card_repo.list().await?))
}

pub async fn get_rate_card(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<RateCard>, AppError> {
    Ok(Json(app_state.rate_card_repo.get(&id).await?))
}

pub async fn create_rate_card(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Json(payload): Json<NewRateCard>,
) -> Result<(StatusCode, Json<RateCard>), AppError> {
    let card = app_state.rate_card_repo.create(payload).await?;
    Ok((StatusCode::CREATED, Json(card)))
}

pub async fn update_rate_card(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
    Json(payload): Json<RateCardUpdate>,
) -> Result<Json<RateCard>, AppError> {
    Ok(Json(app_state.rate_card_repo.update(&id, payload).await?))
}

pub async fn delete_rate_card(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteReport>, AppError> {
    Ok(Json(app_state.rate_card_repo.delete(&id).await?))
}

// ---
// Planilhas
// ---

pub async fn export_rate_card(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let card = app_state.rate_card_repo.get(&id).await?;
    let bytes = spreadsheet_service::export_rate_card(&card)?;
    let filename = spreadsheet_service::export_filename(&card.customer_name);
    Ok(attachment(bytes, &filename, XLSX_CONTENT_TYPE))
}

pub async fn download_template(_user: AuthenticatedUser) -> Result<Response, AppError> {
    let bytes = spreadsheet_service::template()?;
    Ok(attachment(bytes, TEMPLATE_FILENAME, XLSX_CONTENT_TYPE))
}

/// Lê a planilha e devolve o rascunho sem gravar nada.
pub async fn preview_import(
    _user: AuthenticatedUser,
    multipart: Multipart,
) -> Result<Json<NewRateCard>, AppError> {
    let file = read_single_file(multipart).await?;
    Ok(Json(spreadsheet_import::parse_preview(&file.bytes)?))
}

pub async fn upload_import(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    multipart: Multipart,
) -> Result<Json<Vec<ImportOutcome>>, AppError> {
    let file = read_single_file(multipart).await?;
    let outcomes = app_state
        .rate_card_repo
        .import_upload(&file.bytes, &file.name)
        .await?;
    Ok(Json(outcomes))
}

pub async fn download_source(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let (source, bytes) = app_state.rate_card_repo.read_source(&id).await?;
    Ok(attachment(bytes, &source.name, XLSX_CONTENT_TYPE))
}
