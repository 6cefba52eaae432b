// src/handlers/documents.rs

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use serde::Deserialize;

use crate::{
    common::error::AppError,
    config::AppState,
    handlers::attachment,
    middleware::auth::AuthenticatedUser,
    services::document_service::{DocumentRenderer, ExportTemplate, RenderedDocument},
};

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub template: ExportTemplate,
}

// Fontes + layout são trabalho bloqueante: roda fora do runtime
async fn render<F>(renderer: Arc<dyn DocumentRenderer>, f: F) -> Result<RenderedDocument, AppError>
where
    F: FnOnce(&dyn DocumentRenderer) -> Result<RenderedDocument, AppError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(renderer.as_ref()))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de renderização: {}", e))?
}

pub async fn export_note_pdf(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, AppError> {
    let note = app_state.note_repo.get(&id).await?;
    let doc = render(app_state.renderer.clone(), move |r| {
        r.render_note(&note, query.template)
    })
    .await?;
    Ok(attachment(doc.bytes, &doc.filename, doc.content_type))
}

pub async fn export_rate_card_pdf(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, AppError> {
    let card = app_state.rate_card_repo.get(&id).await?;
    let doc = render(app_state.renderer.clone(), move |r| {
        r.render_rate_card(&card, query.template)
    })
    .await?;
    Ok(attachment(doc.bytes, &doc.filename, doc.content_type))
}
