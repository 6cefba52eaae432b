// src/handlers/auth.rs

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, rbac::RequireAdmin},
    models::auth::{
        AuthResponse, ChangePasswordPayload, ForgotPasswordPayload, LoginUserPayload, PublicUser,
        RegisterUserPayload, ResetPasswordPayload,
    },
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordResponse {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<String>,
}

// Handler de login
pub async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginUserPayload>,
) -> Result<Json<AuthResponse>, AppError> {
    let response = app_state.auth_service.login(payload).await?;
    Ok(Json(response))
}

// Só administradores cadastram novos usuários
pub async fn register(
    State(app_state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(payload): Json<RegisterUserPayload>,
) -> Result<(StatusCode, Json<PublicUser>), AppError> {
    let user = app_state.auth_service.register(payload).await?;
    Ok((StatusCode::CREATED, Json(PublicUser::from(&user))))
}

// Handler da rota protegida /me
pub async fn get_me(AuthenticatedUser(user): AuthenticatedUser) -> Json<PublicUser> {
    Json(PublicUser::from(&user))
}

/// Resposta idêntica para e-mails conhecidos e desconhecidos.
pub async fn forgot_password(
    State(app_state): State<AppState>,
    Json(payload): Json<ForgotPasswordPayload>,
) -> Result<(StatusCode, Json<ForgotPasswordResponse>), AppError> {
    payload.validate()?;
    let issued = app_state
        .auth_service
        .request_password_reset(&payload.email)
        .await?;

    let reset_token = issued
        .filter(|_| app_state.config.expose_reset_tokens)
        .map(|t| t.token);

    Ok((
        StatusCode::ACCEPTED,
        Json(ForgotPasswordResponse {
            message: "Se o e-mail estiver cadastrado, um link de redefinição foi gerado.",
            reset_token,
        }),
    ))
}

pub async fn reset_password(
    State(app_state): State<AppState>,
    Json(payload): Json<ResetPasswordPayload>,
) -> Result<StatusCode, AppError> {
    app_state.auth_service.reset_password(payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn change_password(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<ChangePasswordPayload>,
) -> Result<StatusCode, AppError> {
    app_state
        .auth_service
        .change_password(&user.id, payload)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
