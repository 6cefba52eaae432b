// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind as JwtErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{ResetTokenRepository, UserRepository},
    models::auth::{
        AuthResponse, ChangePasswordPayload, Claims, LoginUserPayload, NewUserRecord, PublicUser,
        RegisterUserPayload, ResetPasswordPayload, ResetToken, Role, User,
    },
};

/// Fator de custo do bcrypt (fixo).
pub const BCRYPT_COST: u32 = 10;

/// Validade de um token de redefinição de senha.
pub const RESET_TOKEN_TTL_HOURS: i64 = 24;

// O hash roda num thread separado: bcrypt é CPU-bound de propósito
async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password, BCRYPT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
    Ok(hashed)
}

// A comparação é feita pelo próprio bcrypt (tempo constante)
async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let password_hash = password_hash.to_owned();
    let valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;
    Ok(valid)
}

#[derive(Clone)]
pub struct AuthService {
    users: UserRepository,
    reset_tokens: ResetTokenRepository,
    jwt_secret: String,
    session_ttl: Duration,
}

impl AuthService {
    pub fn new(
        users: UserRepository,
        reset_tokens: ResetTokenRepository,
        jwt_secret: String,
        session_ttl: Duration,
    ) -> Self {
        Self {
            users,
            reset_tokens,
            jwt_secret,
            session_ttl,
        }
    }

    pub async fn register(&self, payload: RegisterUserPayload) -> Result<User, AppError> {
        payload.validate()?;
        let password_hash = hash_password(&payload.password).await?;

        self.users
            .create(NewUserRecord {
                email: payload.email,
                name: payload.name,
                password_hash,
                role: payload.role,
            })
            .await
    }

    /// E-mail desconhecido e senha errada dão o mesmo erro.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AppError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }
        Ok(user)
    }

    pub async fn login(&self, payload: LoginUserPayload) -> Result<AuthResponse, AppError> {
        payload.validate()?;
        let user = self.authenticate(&payload.email, &payload.password).await?;
        let token = self.issue_session(&user)?;
        tracing::info!(user_id = %user.id, "Login efetuado");

        Ok(AuthResponse {
            token,
            user: PublicUser::from(&user),
        })
    }

    pub fn issue_session(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + self.session_ttl;

        let claims = Claims {
            sub: user.id.clone(),
            role: user.role,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }

    /// Decodifica o JWT e recarrega o usuário. O papel devolvido é o da
    /// coleção, nunca o do token.
    pub async fn validate_session(&self, token: &str) -> Result<User, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| match e.kind() {
            JwtErrorKind::ExpiredSignature => AppError::ExpiredToken,
            _ => AppError::InvalidToken,
        })?;

        match self.users.get(&token_data.claims.sub).await {
            Ok(user) => Ok(user),
            Err(AppError::NotFound { .. }) => Err(AppError::InvalidToken),
            Err(e) => Err(e),
        }
    }

    pub async fn change_password(
        &self,
        user_id: &str,
        payload: ChangePasswordPayload,
    ) -> Result<(), AppError> {
        payload.validate()?;
        let user = self.users.get(user_id).await?;

        if !verify_password(&payload.current_password, &user.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }

        let password_hash = hash_password(&payload.new_password).await?;
        self.users.set_password_hash(user_id, password_hash).await?;
        tracing::info!(user_id, "Senha alterada");
        Ok(())
    }

    /// Emite um token só para e-mails cadastrados; os demais são ignorados
    /// em silêncio para não revelar quem tem conta.
    pub async fn request_password_reset(&self, email: &str) -> Result<Option<ResetToken>, AppError> {
        let Some(user) = self.users.find_by_email(email).await? else {
            tracing::debug!("Pedido de redefinição para e-mail desconhecido");
            return Ok(None);
        };

        let token = self
            .reset_tokens
            .issue(&user.email, Duration::hours(RESET_TOKEN_TTL_HOURS))
            .await?;
        Ok(Some(token))
    }

    pub async fn reset_password(&self, payload: ResetPasswordPayload) -> Result<(), AppError> {
        payload.validate()?;
        // Hash antes de travar as coleções
        let password_hash = hash_password(&payload.password).await?;
        let user_id = self.reset_tokens.redeem(&payload.token, password_hash).await?;
        tracing::info!(user_id = %user_id, "Senha redefinida por token");
        Ok(())
    }

    /// Garante que o administrador configurado exista. Não altera um
    /// usuário já existente com o mesmo e-mail.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<(), AppError> {
        if self.users.find_by_email(email).await?.is_some() {
            return Ok(());
        }

        let user = self
            .register(RegisterUserPayload {
                email: email.to_string(),
                name: "Administrador".to_string(),
                password: password.to_string(),
                role: Role::Admin,
            })
            .await?;
        tracing::info!(user_id = %user.id, "Administrador inicial criado");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CollectionStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn service(tmp: &TempDir) -> AuthService {
        let store = Arc::new(CollectionStore::new(tmp.path(), std::time::Duration::from_secs(2)));
        AuthService::new(
            UserRepository::new(store.clone()),
            ResetTokenRepository::new(store),
            "segredo-de-teste".to_string(),
            Duration::hours(1),
        )
    }

    fn payload(email: &str, password: &str) -> RegisterUserPayload {
        RegisterUserPayload {
            email: email.into(),
            name: "Ayşe".into(),
            password: password.into(),
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn hash_nao_guarda_a_senha_em_claro() {
        let tmp = TempDir::new().unwrap();
        let auth = service(&tmp);

        let user = auth.register(payload("ayse@x.com", "segredo1")).await.unwrap();
        assert_ne!(user.password_hash, "segredo1");
        assert!(user.password_hash.starts_with("$2"));
        assert!(user.password_hash.contains("$10$"));
    }

    #[tokio::test]
    async fn login_com_senha_errada_ou_email_desconhecido() {
        let tmp = TempDir::new().unwrap();
        let auth = service(&tmp);
        auth.register(payload("ayse@x.com", "segredo1")).await.unwrap();

        assert!(auth.authenticate("AYSE@x.com", "segredo1").await.is_ok());
        let err = auth.authenticate("ayse@x.com", "errada!").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
        let err = auth.authenticate("outra@x.com", "segredo1").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn sessao_rele_o_papel_da_colecao() {
        let tmp = TempDir::new().unwrap();
        let auth = service(&tmp);
        let user = auth.register(payload("ayse@x.com", "segredo1")).await.unwrap();
        let token = auth.issue_session(&user).unwrap();

        auth.users
            .update(
                &user.id,
                crate::models::auth::UserUpdate {
                    role: Some(Role::Admin),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let current = auth.validate_session(&token).await.unwrap();
        assert_eq!(current.role, Role::Admin);

        let err = auth.validate_session("lixo").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }

    #[tokio::test]
    async fn token_de_redefinicao_e_de_uso_unico() {
        let tmp = TempDir::new().unwrap();
        let auth = service(&tmp);
        auth.register(payload("ayse@x.com", "segredo1")).await.unwrap();

        let token = auth
            .request_password_reset("ayse@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(token.token.len(), 64);

        let reset = |t: &str| ResetPasswordPayload {
            token: t.to_string(),
            password: "novasenha".into(),
        };
        auth.reset_password(reset(&token.token)).await.unwrap();
        let err = auth.reset_password(reset(&token.token)).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));

        assert!(auth.authenticate("ayse@x.com", "novasenha").await.is_ok());
    }

    #[tokio::test]
    async fn email_desconhecido_nao_gera_token() {
        let tmp = TempDir::new().unwrap();
        let auth = service(&tmp);
        assert!(auth.request_password_reset("ninguem@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn troca_de_senha_exige_a_atual() {
        let tmp = TempDir::new().unwrap();
        let auth = service(&tmp);
        let user = auth.register(payload("ayse@x.com", "segredo1")).await.unwrap();

        let err = auth
            .change_password(
                &user.id,
                ChangePasswordPayload {
                    current_password: "errada".into(),
                    new_password: "outrasenha".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));

        auth.change_password(
            &user.id,
            ChangePasswordPayload {
                current_password: "segredo1".into(),
                new_password: "outrasenha".into(),
            },
        )
        .await
        .unwrap();
        assert!(auth.authenticate("ayse@x.com", "outrasenha").await.is_ok());
    }
}
