// src/handlers/proposals.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::proposal::{NewProposal, Proposal, ProposalStatus, ProposalUpdate},
};

#[derive(Debug, Deserialize)]
pub struct StatusPayload {
    pub status: ProposalStatus,
}

pub async fn list_proposals(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Json<Vec<Proposal>>, AppError> {
    Ok(Json(app_state.proposal_repo.list().await?))
}

pub async fn get_proposal(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<Proposal>, AppError> {
    Ok(Json(app_state.proposal_repo.get(&id).await?))
}

pub async fn create_proposal(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Json(payload): Json<NewProposal>,
) -> Result<(StatusCode, Json<Proposal>), AppError> {
    let proposal = app_state.proposal_repo.create(payload).await?;
    Ok((StatusCode::CREATED, Json(proposal)))
}

pub async fn update_proposal(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
    Json(payload): Json<ProposalUpdate>,
) -> Result<Json<Proposal>, AppError> {
    Ok(Json(app_state.proposal_repo.update(&id, payload).await?))
}

pub async fn set_proposal_status(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
    Json(payload): Json<StatusPayload>,
) -> Result<Json<Proposal>, AppError> {
    Ok(Json(app_state.proposal_repo.set_status(&id, payload.status).await?))
}

pub async fn delete_proposal(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    app_state.proposal_repo.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
