// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    common::error::AppError,
    middleware::auth::AuthenticatedUser,
    models::auth::{Role, User},
};

/// Guardião de rotas administrativas. Roda depois do `auth_guard`, que já
/// recarregou o usuário do store; o papel do token nunca é usado.
pub struct RequireAdmin(pub User);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(user) = AuthenticatedUser::from_request_parts(parts, state).await?;

        if user.role != Role::Admin {
            tracing::warn!(user_id = %user.id, "Acesso administrativo negado");
            return Err(AppError::Forbidden);
        }
        Ok(RequireAdmin(user))
    }
}
